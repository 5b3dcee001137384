use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use draftdesk_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries = effective_values(&config)
        .into_iter()
        .map(|(key, value)| ConfigEntry {
            key,
            value,
            source: field_source(
                key,
                flag_override(options, key),
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        })
        .collect::<Vec<_>>();

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    lines.extend(entries.iter().map(render_line));

    CommandResult::success_with_data("config", lines.join("\n"), &entries)
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    let embedding = &config.embedding;
    let api_key = embedding
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    vec![
        ("database.url", config.database.url.clone()),
        ("database.max_connections", config.database.max_connections.to_string()),
        ("database.timeout_secs", config.database.timeout_secs.to_string()),
        ("embedding.provider", format!("{:?}", embedding.provider).to_lowercase()),
        ("embedding.model", embedding.model.clone()),
        ("embedding.base_url", embedding.base_url.clone().unwrap_or_else(|| "<unset>".into())),
        ("embedding.api_key", api_key),
        ("embedding.dimensions", embedding.dimensions.to_string()),
        ("embedding.timeout_secs", embedding.timeout_secs.to_string()),
        ("embedding.max_retries", embedding.max_retries.to_string()),
        ("embedding.batch_size", embedding.batch_size.to_string()),
        ("retrieval.chunk_max_chars", config.retrieval.chunk_max_chars.to_string()),
        ("retrieval.chunk_overlap_chars", config.retrieval.chunk_overlap_chars.to_string()),
        ("retrieval.default_k", config.retrieval.default_k.to_string()),
        ("retrieval.max_k", config.retrieval.max_k.to_string()),
        ("extraction.max_input_bytes", config.extraction.max_input_bytes.to_string()),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format).to_lowercase()),
    ]
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("draftdesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/draftdesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn flag_override(options: &LoadOptions, key_path: &str) -> bool {
    let overrides = &options.overrides;
    match key_path {
        "database.url" => overrides.database_url.is_some(),
        "logging.level" => overrides.log_level.is_some(),
        "embedding.provider" => overrides.embedding_provider.is_some(),
        "embedding.model" => overrides.embedding_model.is_some(),
        "embedding.base_url" => overrides.embedding_base_url.is_some(),
        "embedding.api_key" => overrides.embedding_api_key.is_some(),
        _ => false,
    }
}

fn env_keys(key_path: &str) -> Vec<String> {
    let primary = format!("DRAFTDESK_{}", key_path.replace('.', "_").to_ascii_uppercase());
    match key_path {
        "logging.level" => vec![primary, "DRAFTDESK_LOG_LEVEL".to_string()],
        "logging.format" => vec![primary, "DRAFTDESK_LOG_FORMAT".to_string()],
        _ => vec![primary],
    }
}

fn field_source(
    key_path: &str,
    from_flag: bool,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if from_flag {
        return "flag".to_string();
    }

    if let Some(env_key) = env_keys(key_path).into_iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(entry: &ConfigEntry) -> String {
    format!("- {} = {} (source: {})", entry.key, entry.value, entry.source)
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

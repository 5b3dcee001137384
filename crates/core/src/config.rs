use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub extraction: ExtractionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub dimensions: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub batch_size: usize,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub default_k: usize,
    pub max_k: usize,
}

#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    pub max_input_bytes: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    Hashing,
    Ollama,
    OpenAi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub embedding_provider: Option<EmbeddingProvider>,
    pub embedding_model: Option<String>,
    pub embedding_base_url: Option<String>,
    pub embedding_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_HASHING_MODEL: &str = "feature-hash-v1";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://draftdesk.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::Hashing,
                model: DEFAULT_HASHING_MODEL.to_string(),
                base_url: None,
                api_key: None,
                dimensions: 384,
                timeout_secs: 30,
                max_retries: 2,
                batch_size: 32,
            },
            retrieval: RetrievalConfig {
                chunk_max_chars: 800,
                chunk_overlap_chars: 100,
                default_k: 4,
                max_k: 20,
            },
            extraction: ExtractionConfig { max_input_bytes: 64 * 1024 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "ollama" => Ok(Self::Ollama),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            other => Err(ConfigError::Validation(format!(
                "unsupported embedding provider `{other}` (expected hashing|ollama|openai)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("draftdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(embedding) = patch.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(base_url) = embedding.base_url {
                self.embedding.base_url = Some(base_url);
            }
            if let Some(embedding_api_key_value) = embedding.api_key {
                self.embedding.api_key = Some(secret_value(embedding_api_key_value));
            }
            if let Some(dimensions) = embedding.dimensions {
                self.embedding.dimensions = dimensions;
            }
            if let Some(timeout_secs) = embedding.timeout_secs {
                self.embedding.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = embedding.max_retries {
                self.embedding.max_retries = max_retries;
            }
            if let Some(batch_size) = embedding.batch_size {
                self.embedding.batch_size = batch_size;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(chunk_max_chars) = retrieval.chunk_max_chars {
                self.retrieval.chunk_max_chars = chunk_max_chars;
            }
            if let Some(chunk_overlap_chars) = retrieval.chunk_overlap_chars {
                self.retrieval.chunk_overlap_chars = chunk_overlap_chars;
            }
            if let Some(default_k) = retrieval.default_k {
                self.retrieval.default_k = default_k;
            }
            if let Some(max_k) = retrieval.max_k {
                self.retrieval.max_k = max_k;
            }
        }

        if let Some(extraction) = patch.extraction {
            if let Some(max_input_bytes) = extraction.max_input_bytes {
                self.extraction.max_input_bytes = max_input_bytes;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DRAFTDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("DRAFTDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("DRAFTDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("DRAFTDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("DRAFTDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DRAFTDESK_EMBEDDING_PROVIDER") {
            self.embedding.provider = value.parse()?;
        }
        if let Some(value) = read_env("DRAFTDESK_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        if let Some(value) = read_env("DRAFTDESK_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(value);
        }
        if let Some(value) = read_env("DRAFTDESK_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("DRAFTDESK_EMBEDDING_DIMENSIONS") {
            self.embedding.dimensions = parse_usize("DRAFTDESK_EMBEDDING_DIMENSIONS", &value)?;
        }
        if let Some(value) = read_env("DRAFTDESK_EMBEDDING_TIMEOUT_SECS") {
            self.embedding.timeout_secs = parse_u64("DRAFTDESK_EMBEDDING_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DRAFTDESK_EMBEDDING_MAX_RETRIES") {
            self.embedding.max_retries = parse_u32("DRAFTDESK_EMBEDDING_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("DRAFTDESK_EMBEDDING_BATCH_SIZE") {
            self.embedding.batch_size = parse_usize("DRAFTDESK_EMBEDDING_BATCH_SIZE", &value)?;
        }

        if let Some(value) = read_env("DRAFTDESK_RETRIEVAL_CHUNK_MAX_CHARS") {
            self.retrieval.chunk_max_chars =
                parse_usize("DRAFTDESK_RETRIEVAL_CHUNK_MAX_CHARS", &value)?;
        }
        if let Some(value) = read_env("DRAFTDESK_RETRIEVAL_CHUNK_OVERLAP_CHARS") {
            self.retrieval.chunk_overlap_chars =
                parse_usize("DRAFTDESK_RETRIEVAL_CHUNK_OVERLAP_CHARS", &value)?;
        }
        if let Some(value) = read_env("DRAFTDESK_RETRIEVAL_DEFAULT_K") {
            self.retrieval.default_k = parse_usize("DRAFTDESK_RETRIEVAL_DEFAULT_K", &value)?;
        }
        if let Some(value) = read_env("DRAFTDESK_RETRIEVAL_MAX_K") {
            self.retrieval.max_k = parse_usize("DRAFTDESK_RETRIEVAL_MAX_K", &value)?;
        }

        if let Some(value) = read_env("DRAFTDESK_EXTRACTION_MAX_INPUT_BYTES") {
            self.extraction.max_input_bytes =
                parse_usize("DRAFTDESK_EXTRACTION_MAX_INPUT_BYTES", &value)?;
        }

        let log_level =
            read_env("DRAFTDESK_LOGGING_LEVEL").or_else(|| read_env("DRAFTDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DRAFTDESK_LOGGING_FORMAT").or_else(|| read_env("DRAFTDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(base_url) = overrides.embedding_base_url {
            self.embedding.base_url = Some(base_url);
        }
        if let Some(api_key) = overrides.embedding_api_key {
            self.embedding.api_key = Some(secret_value(api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_embedding(&self.embedding)?;
        validate_retrieval(&self.retrieval)?;
        validate_extraction(&self.extraction)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("draftdesk.toml"), PathBuf::from("config/draftdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_embedding(embedding: &EmbeddingConfig) -> Result<(), ConfigError> {
    if embedding.model.trim().is_empty() {
        return Err(ConfigError::Validation("embedding.model must not be empty".to_string()));
    }

    if embedding.dimensions < 8 || embedding.dimensions > 8192 {
        return Err(ConfigError::Validation(
            "embedding.dimensions must be in range 8..=8192".to_string(),
        ));
    }

    if embedding.timeout_secs == 0 || embedding.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "embedding.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if embedding.batch_size == 0 {
        return Err(ConfigError::Validation(
            "embedding.batch_size must be greater than zero".to_string(),
        ));
    }

    if let Some(base_url) = &embedding.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "embedding.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    match embedding.provider {
        EmbeddingProvider::Hashing => {}
        EmbeddingProvider::OpenAi => {
            let missing = embedding
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "embedding.api_key is required for the openai provider".to_string(),
                ));
            }
        }
        EmbeddingProvider::Ollama => {
            let missing =
                embedding.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "embedding.base_url is required for the ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if retrieval.chunk_max_chars < 100 {
        return Err(ConfigError::Validation(
            "retrieval.chunk_max_chars must be at least 100".to_string(),
        ));
    }

    if retrieval.chunk_overlap_chars >= retrieval.chunk_max_chars {
        return Err(ConfigError::Validation(
            "retrieval.chunk_overlap_chars must be smaller than retrieval.chunk_max_chars"
                .to_string(),
        ));
    }

    if retrieval.default_k == 0 || retrieval.max_k == 0 {
        return Err(ConfigError::Validation(
            "retrieval.default_k and retrieval.max_k must be greater than zero".to_string(),
        ));
    }

    if retrieval.default_k > retrieval.max_k {
        return Err(ConfigError::Validation(
            "retrieval.default_k must not exceed retrieval.max_k".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction(extraction: &ExtractionConfig) -> Result<(), ConfigError> {
    if extraction.max_input_bytes == 0 {
        return Err(ConfigError::Validation(
            "extraction.max_input_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    embedding: Option<EmbeddingPatch>,
    retrieval: Option<RetrievalPatch>,
    extraction: Option<ExtractionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    provider: Option<EmbeddingProvider>,
    model: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    dimensions: Option<usize>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    chunk_max_chars: Option<usize>,
    chunk_overlap_chars: Option<usize>,
    default_k: Option<usize>,
    max_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractionPatch {
    max_input_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

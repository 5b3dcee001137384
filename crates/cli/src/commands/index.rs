use std::fs;
use std::path::Path;

use draftdesk_core::config::LoadOptions;
use draftdesk_mcp::IndexReport;

use crate::commands::{open_application, prepare, CommandResult, Failure};

/// Indexes a plain-text file. The source name defaults to the file name.
pub fn run(options: &LoadOptions, path: &Path, source: Option<&str>) -> CommandResult {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) => {
            return CommandResult::failure(
                "index",
                "input_read",
                format!("could not read `{}`: {error}", path.display()),
                2,
            );
        }
    };
    let source = match source.map(str::to_string).or_else(|| default_source(path)) {
        Some(source) => source,
        None => {
            return CommandResult::failure(
                "index",
                "input_parse",
                format!("cannot derive a source name from `{}`; pass --source", path.display()),
                2,
            );
        }
    };

    let (config, runtime) = match prepare("index", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let app = open_application(config).await?;
        let report = app
            .document_index()
            .index_document(&source, &text)
            .await
            .map_err(|error| ("index", error.to_string(), 3u8))?;
        app.db_pool.close().await;
        Ok::<IndexReport, Failure>(report)
    });

    match result {
        Ok(report) => {
            let message = format!(
                "indexed `{}` into {} chunks with `{}`",
                report.source, report.chunks_indexed, report.model
            );
            CommandResult::success_with_data("index", message, &report)
        }
        Err(failure) => CommandResult::from_failure("index", failure),
    }
}

fn default_source(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::default_source;

    #[test]
    fn source_defaults_to_file_name() {
        let source = default_source(Path::new("data/hr_policy.txt"));
        assert_eq!(source.as_deref(), Some("hr_policy.txt"));
        assert_eq!(default_source(Path::new("..")), None);
    }
}

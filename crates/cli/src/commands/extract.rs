use std::fs;
use std::io::{self, Read};
use std::path::Path;

use draftdesk_core::config::LoadOptions;
use draftdesk_core::errors::ApplicationError;
use draftdesk_mcp::{ExtractionResponse, McpError};

use crate::commands::{open_application, prepare, CommandResult, Failure};

/// Extracts draft fields from `file`, or from stdin when no file is given.
pub fn run(options: &LoadOptions, file: Option<&Path>, resolve_recipient: bool) -> CommandResult {
    let text = match read_input(file) {
        Ok(text) => text,
        Err(error) => {
            return CommandResult::failure(
                "extract",
                "input_read",
                format!("could not read input: {error}"),
                2,
            );
        }
    };

    let (config, runtime) = match prepare("extract", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let app = open_application(config).await?;
        let pool = app.db_pool.clone();
        let extracted = app
            .into_server()
            .extract(&text, resolve_recipient)
            .await
            .map_err(extraction_failure)?;
        pool.close().await;
        Ok::<ExtractionResponse, Failure>(extracted)
    });

    match result {
        Ok(extracted) => {
            let message = if extracted.email.is_complete() {
                "all email fields extracted".to_string()
            } else {
                let missing = extracted
                    .email
                    .missing
                    .iter()
                    .map(|field| field.as_str())
                    .collect::<Vec<_>>();
                format!("missing email fields: {}", missing.join(", "))
            };
            CommandResult::success_with_data("extract", message, &extracted)
        }
        Err(failure) => CommandResult::from_failure("extract", failure),
    }
}

fn read_input(file: Option<&Path>) -> io::Result<String> {
    match file {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// Directory failures while resolving the recipient are database errors;
/// everything else is a problem with the draft itself.
fn extraction_failure(error: McpError) -> Failure {
    match error {
        McpError::Database(_) | McpError::Application(ApplicationError::Persistence(_)) => {
            ("db_query", error.to_string(), 4)
        }
        other => ("extraction", other.to_string(), 2),
    }
}

#[cfg(test)]
mod tests {
    use draftdesk_core::errors::ApplicationError;
    use draftdesk_core::extraction::ExtractionError;
    use draftdesk_db::RepositoryError;
    use draftdesk_mcp::McpError;

    use super::extraction_failure;

    #[test]
    fn directory_failures_map_to_database_exit_code() {
        let error = McpError::from(RepositoryError::Database(sqlx::Error::PoolClosed));
        let (class, message, code) = extraction_failure(error);
        assert_eq!((class, code), ("db_query", 4));
        assert!(message.contains("database error"));

        let persistence = McpError::from(ApplicationError::Persistence("locked".into()));
        assert_eq!(extraction_failure(persistence).2, 4);
    }

    #[test]
    fn draft_failures_map_to_input_exit_code() {
        let error = McpError::from(ApplicationError::from(ExtractionError::EmptyInput));
        let (class, _, code) = extraction_failure(error);
        assert_eq!((class, code), ("extraction", 2));
    }
}

use draftdesk_core::config::LoadOptions;
use draftdesk_core::directory::LookupOutcome;

use crate::commands::{open_application, prepare, CommandResult, Failure};

pub fn run(options: &LoadOptions, name: &str) -> CommandResult {
    let (config, runtime) = match prepare("lookup", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let app = open_application(config).await?;
        let outcome = app
            .directory()
            .lookup(name)
            .await
            .map_err(|error| ("db_query", error.to_string(), 4u8))?;
        app.db_pool.close().await;
        Ok::<LookupOutcome, Failure>(outcome)
    });

    match result {
        Ok(outcome) => {
            let message = match &outcome {
                LookupOutcome::Found(found) => {
                    format!("{} <{}>", found.contact.name, found.contact.email)
                }
                LookupOutcome::NotFound { query } => format!("no contact matches `{query}`"),
            };
            CommandResult::success_with_data("lookup", message, &outcome)
        }
        Err(failure) => CommandResult::from_failure("lookup", failure),
    }
}

use draftdesk_core::config::LoadOptions;
use draftdesk_mcp::SearchReport;

use crate::commands::{open_application, prepare, CommandResult, Failure};

pub fn run(options: &LoadOptions, query: &str, k: Option<usize>) -> CommandResult {
    let (config, runtime) = match prepare("search", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let app = open_application(config).await?;
        let report = app
            .document_index()
            .search(query, k)
            .await
            .map_err(|error| ("search", error.to_string(), 3u8))?;
        app.db_pool.close().await;
        Ok::<SearchReport, Failure>(report)
    });

    match result {
        Ok(report) => {
            let message = match report.hits.first() {
                Some(top) => {
                    format!("{} hit(s); best match from `{}`", report.hits.len(), top.source)
                }
                None => "no matching snippets".to_string(),
            };
            CommandResult::success_with_data("search", message, &report)
        }
        Err(failure) => CommandResult::from_failure("search", failure),
    }
}

use draftdesk_core::config::LoadOptions;
use draftdesk_db::SourceSummary;
use serde::Serialize;

use crate::commands::{open_application, prepare, CommandResult, Failure};

#[derive(Debug, Serialize)]
struct RemovalOutput {
    source: String,
    chunks_removed: u64,
}

/// Lists indexed sources, or drops the chunks of `remove` when given.
pub fn run(options: &LoadOptions, remove: Option<&str>) -> CommandResult {
    let (config, runtime) = match prepare("sources", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    if let Some(source) = remove {
        let result = runtime.block_on(async {
            let app = open_application(config).await?;
            let chunks_removed = app
                .document_index()
                .remove_document(source)
                .await
                .map_err(|error| ("index", error.to_string(), 3u8))?;
            app.db_pool.close().await;
            Ok::<u64, Failure>(chunks_removed)
        });

        return match result {
            Ok(0) => CommandResult::success_with_data(
                "sources",
                format!("nothing indexed under `{}`", source.trim()),
                &RemovalOutput { source: source.trim().to_string(), chunks_removed: 0 },
            ),
            Ok(chunks_removed) => CommandResult::success_with_data(
                "sources",
                format!("removed {chunks_removed} chunks of `{}`", source.trim()),
                &RemovalOutput { source: source.trim().to_string(), chunks_removed },
            ),
            Err(failure) => CommandResult::from_failure("sources", failure),
        };
    }

    let result = runtime.block_on(async {
        let app = open_application(config).await?;
        let sources = app
            .document_index()
            .sources()
            .await
            .map_err(|error| ("index", error.to_string(), 3u8))?;
        app.db_pool.close().await;
        Ok::<Vec<SourceSummary>, Failure>(sources)
    });

    match result {
        Ok(sources) => {
            CommandResult::success_with_data("sources", summary_message(&sources), &sources)
        }
        Err(failure) => CommandResult::from_failure("sources", failure),
    }
}

fn summary_message(sources: &[SourceSummary]) -> String {
    if sources.is_empty() {
        return "no documents indexed".to_string();
    }

    let mut lines = vec![format!("{} indexed source(s):", sources.len())];
    lines.extend(sources.iter().map(|summary| {
        format!(
            "- {} ({} chunks, `{}`, {})",
            summary.source,
            summary.chunks,
            summary.model,
            summary.indexed_at.to_rfc3339()
        )
    }));
    lines.join("\n")
}

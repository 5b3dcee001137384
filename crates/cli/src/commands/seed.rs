use draftdesk_core::config::LoadOptions;
use draftdesk_db::SampleDirectory;
use draftdesk_mcp::IndexReport;
use serde::Serialize;

use crate::commands::{open_application, prepare, CommandResult, Failure};

#[derive(Debug, Serialize)]
struct SeedOutput {
    contacts: Vec<&'static str>,
    policy: IndexReport,
}

/// Loads the sample directory and indexes the sample policy document, or
/// removes both when `clean` is set.
pub fn run(options: &LoadOptions, clean: bool) -> CommandResult {
    let (config, runtime) = match prepare("seed", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    if clean {
        let result = runtime.block_on(async {
            let app = open_application(config).await?;
            SampleDirectory::clean(&app.db_pool)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            app.db_pool.close().await;
            Ok::<(), Failure>(())
        });
        return match result {
            Ok(()) => CommandResult::success("seed", "sample directory and policy removed"),
            Err(failure) => CommandResult::from_failure("seed", failure),
        };
    }

    let result = runtime.block_on(async {
        let app = open_application(config).await?;

        let seed_result = SampleDirectory::load(&app.db_pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = SampleDirectory::verify(&app.db_pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        if !verification.all_present {
            return Err(("seed_verification", verification_message(&verification.checks), 6u8));
        }

        let policy = app
            .document_index()
            .index_document(SampleDirectory::POLICY_SOURCE, SampleDirectory::POLICY_TEXT)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        app.db_pool.close().await;
        Ok::<SeedOutput, Failure>(SeedOutput { contacts: seed_result.contacts_seeded, policy })
    });

    match result {
        Ok(output) => {
            let message = format!(
                "sample directory loaded ({} contacts); indexed `{}` into {} chunks with `{}`",
                output.contacts.len(),
                output.policy.source,
                output.policy.chunks_indexed,
                output.policy.model
            );
            CommandResult::success_with_data("seed", message, &output)
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for contacts: {}", failed_checks.join(", "))
    }
}

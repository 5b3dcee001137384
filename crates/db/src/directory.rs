use std::sync::Arc;

use tracing::debug;

use draftdesk_core::directory::LookupOutcome;

use crate::repositories::{ContactRepository, RepositoryError};

/// Repository-backed recipient lookup.
#[derive(Clone)]
pub struct DirectoryService {
    contacts: Arc<dyn ContactRepository>,
}

impl DirectoryService {
    pub fn new(contacts: Arc<dyn ContactRepository>) -> Self {
        Self { contacts }
    }

    pub fn repository(&self) -> &Arc<dyn ContactRepository> {
        &self.contacts
    }

    pub async fn lookup(&self, query: &str) -> Result<LookupOutcome, RepositoryError> {
        let candidates = self.contacts.find_candidates(query).await?;
        let candidate_count = candidates.len();
        let outcome = LookupOutcome::from_candidates(query, candidates);

        debug!(
            event_name = "directory.lookup",
            query = %query.trim(),
            candidates = candidate_count,
            found = outcome.contact().is_some(),
            "directory lookup finished"
        );
        Ok(outcome)
    }
}

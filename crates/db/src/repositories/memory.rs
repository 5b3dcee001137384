use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use draftdesk_core::directory::normalize_name;
use draftdesk_core::domain::chunk::StoredChunk;
use draftdesk_core::domain::contact::Contact;

use super::{ChunkRepository, ContactRepository, RepositoryError, SourceSummary};

#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<BTreeMap<String, Contact>>,
}

impl InMemoryContactRepository {
    pub fn with_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        let contacts = contacts
            .into_iter()
            .map(|contact| (normalize_name(&contact.name), contact))
            .collect::<BTreeMap<_, _>>();
        Self { contacts: RwLock::new(contacts) }
    }
}

#[async_trait::async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn find_candidates(&self, fragment: &str) -> Result<Vec<Contact>, RepositoryError> {
        let fragment = normalize_name(fragment);
        if fragment.is_empty() {
            return Ok(Vec::new());
        }

        let contacts = self.contacts.read().await;
        Ok(contacts
            .iter()
            .filter(|(key, contact)| {
                key.contains(&fragment) || contact.email.to_lowercase().contains(&fragment)
            })
            .map(|(_, contact)| contact.clone())
            .collect())
    }

    async fn list(&self) -> Result<Vec<Contact>, RepositoryError> {
        let contacts = self.contacts.read().await;
        Ok(contacts.values().cloned().collect())
    }

    async fn save(&self, contact: Contact) -> Result<(), RepositoryError> {
        let mut contacts = self.contacts.write().await;
        let key = normalize_name(&contact.name);
        match contacts.get_mut(&key) {
            Some(existing) => existing.email = contact.email,
            None => {
                contacts.insert(key, contact);
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let contacts = self.contacts.read().await;
        Ok(contacts.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryChunkRepository {
    sources: RwLock<BTreeMap<String, IndexedSource>>,
}

struct IndexedSource {
    chunks: Vec<StoredChunk>,
    indexed_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl ChunkRepository for InMemoryChunkRepository {
    async fn replace_source(
        &self,
        source: &str,
        chunks: Vec<StoredChunk>,
    ) -> Result<u64, RepositoryError> {
        if let Some(foreign) = chunks.iter().find(|stored| stored.chunk.source != source) {
            return Err(RepositoryError::Decode(format!(
                "chunk `{}` does not belong to source `{source}`",
                foreign.chunk.id
            )));
        }

        let mut sources = self.sources.write().await;
        let inserted = chunks.len() as u64;
        if chunks.is_empty() {
            sources.remove(source);
        } else {
            sources.insert(source.to_string(), IndexedSource { chunks, indexed_at: Utc::now() });
        }
        Ok(inserted)
    }

    async fn list_for_model(
        &self,
        model: &str,
        dimensions: usize,
    ) -> Result<Vec<StoredChunk>, RepositoryError> {
        let sources = self.sources.read().await;
        Ok(sources
            .values()
            .flat_map(|indexed| &indexed.chunks)
            .filter(|stored| stored.model == model && stored.embedding.len() == dimensions)
            .cloned()
            .collect())
    }

    async fn list_sources(&self) -> Result<Vec<SourceSummary>, RepositoryError> {
        let sources = self.sources.read().await;
        Ok(sources
            .iter()
            .map(|(source, indexed)| SourceSummary {
                source: source.clone(),
                chunks: indexed.chunks.len() as u64,
                model: indexed
                    .chunks
                    .iter()
                    .map(|stored| stored.model.as_str())
                    .max()
                    .unwrap_or_default()
                    .to_string(),
                indexed_at: indexed.indexed_at,
            })
            .collect())
    }

    async fn delete_source(&self, source: &str) -> Result<u64, RepositoryError> {
        let mut sources = self.sources.write().await;
        Ok(sources.remove(source).map(|indexed| indexed.chunks.len() as u64).unwrap_or(0))
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let sources = self.sources.read().await;
        Ok(sources.values().map(|indexed| indexed.chunks.len() as u64).sum())
    }

    async fn count_sources(&self) -> Result<u64, RepositoryError> {
        let sources = self.sources.read().await;
        Ok(sources.len() as u64)
    }
}

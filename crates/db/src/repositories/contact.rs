use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use draftdesk_core::directory::normalize_name;
use draftdesk_core::domain::contact::Contact;

use super::{ContactRepository, RepositoryError};
use crate::DbPool;

pub struct SqlContactRepository {
    pool: DbPool,
}

impl SqlContactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for SqlContactRepository {
    async fn find_candidates(&self, fragment: &str) -> Result<Vec<Contact>, RepositoryError> {
        let fragment = normalize_name(fragment);
        if fragment.is_empty() {
            return Ok(Vec::new());
        }

        // SQLite folds case for ASCII only, so matching happens here.
        let contacts = self.list().await?;
        Ok(contacts
            .into_iter()
            .filter(|contact| {
                normalize_name(&contact.name).contains(&fragment)
                    || contact.email.to_lowercase().contains(&fragment)
            })
            .collect())
    }

    async fn list(&self) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query("SELECT name, email FROM contacts ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(contact_from_row).collect()
    }

    async fn save(&self, contact: Contact) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO contacts (name, email) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET
                 email = excluded.email,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        )
        .bind(&contact.name)
        .bind(&contact.email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contacts").fetch_one(&self.pool).await?;
        u64::try_from(count).map_err(|_| RepositoryError::Decode(format!("negative count {count}")))
    }
}

fn contact_from_row(row: &SqliteRow) -> Result<Contact, RepositoryError> {
    let name: String = row.try_get("name")?;
    let email: String = row.try_get("email")?;
    Contact::new(name, email).map_err(|error| RepositoryError::Decode(error.to_string()))
}

use sqlx::Executor;

use draftdesk_core::domain::contact::Contact;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical sample directory. Kept in step with the SQL fixture and the
/// JSON contract under `config/fixtures/`.
const SAMPLE_CONTACTS: &[(&str, &str)] = &[
    ("Ashu", "ashu.kumar@oracle.com"),
    ("Ashutosh Rao", "ashutosh.rao@example.com"),
    ("Priya Nair", "priya.nair@example.com"),
    ("Daniel Ashford", "dan.ashford@example.com"),
    ("Maria Gonzalez", "maria.gonzalez@example.com"),
    ("HR Team", "hr@example.com"),
];

/// Sample directory plus the sample policy document.
pub struct SampleDirectory;

impl SampleDirectory {
    /// SQL fixture content for the sample directory.
    pub const SQL: &str = include_str!("../../../config/fixtures/sample_directory.sql");

    pub const POLICY_SOURCE: &str = "hr_policy.txt";
    pub const POLICY_TEXT: &str = include_str!("../../../data/hr_policy.txt");

    pub fn contacts() -> Vec<Contact> {
        SAMPLE_CONTACTS
            .iter()
            .map(|(name, email)| Contact { name: (*name).to_string(), email: (*email).to_string() })
            .collect()
    }

    /// Upserts the sample directory. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            contacts_seeded: SAMPLE_CONTACTS.iter().map(|(name, _)| *name).collect(),
        })
    }

    /// Checks that every sample contact exists with its expected address.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for (name, email) in SAMPLE_CONTACTS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM contacts WHERE name = ?1 AND email = ?2)",
            )
            .bind(name)
            .bind(email)
            .fetch_one(pool)
            .await?;
            checks.push((*name, present == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the sample contacts and the sample policy chunks.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        for (name, _) in SAMPLE_CONTACTS {
            sqlx::query("DELETE FROM contacts WHERE name = ?1").bind(name).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM document_chunks WHERE source = ?1")
            .bind(Self::POLICY_SOURCE)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub contacts_seeded: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_and_policy_are_present() {
        assert!(SampleDirectory::SQL.contains("ashu.kumar@oracle.com"));
        assert!(SampleDirectory::POLICY_TEXT.contains("Annual Leave"));
    }

    #[test]
    fn sample_contacts_pass_validation() {
        for contact in SampleDirectory::contacts() {
            let validated = Contact::new(&contact.name, &contact.email).expect("valid contact");
            assert_eq!(validated, contact);
        }
    }

    #[tokio::test]
    async fn seed_is_idempotent_and_verifiable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = SampleDirectory::load(&pool).await.expect("load seed fixtures");
        let first_verification = SampleDirectory::verify(&pool).await.expect("verify");
        assert!(first_verification.all_present);
        assert_eq!(first.contacts_seeded.len(), 6);

        SampleDirectory::load(&pool).await.expect("reload seed fixtures");
        let second_verification = SampleDirectory::verify(&pool).await.expect("re-verify");
        assert_eq!(first_verification.checks, second_verification.checks);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
            .fetch_one(&pool)
            .await
            .expect("count contacts");
        assert_eq!(count, 6);
    }

    #[tokio::test]
    async fn clean_removes_sample_rows() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        SampleDirectory::load(&pool).await.expect("load");

        SampleDirectory::clean(&pool).await.expect("clean");

        let verification = SampleDirectory::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        assert!(verification.checks.iter().all(|(_, present)| !present));
    }
}

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A directory entry. Names are unique case-insensitively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into().trim().to_string();
        let email = email.into().trim().to_string();

        if name.is_empty() {
            return Err(DomainError::Validation("contact name must not be empty".to_string()));
        }
        if !is_valid_email(&email) {
            return Err(DomainError::Validation(format!(
                "contact `{name}` has an invalid email address `{email}`"
            )));
        }

        Ok(Self { name, email })
    }
}

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}")
            .expect("email address pattern is valid")
    })
}

pub fn is_valid_email(candidate: &str) -> bool {
    address_pattern()
        .find(candidate)
        .map(|found| found.start() == 0 && found.end() == candidate.len())
        .unwrap_or(false)
}

/// First email address embedded anywhere in `text`.
pub fn find_email_address(text: &str) -> Option<&str> {
    address_pattern().find(text).map(|found| found.as_str())
}

#[cfg(test)]
mod tests {
    use super::{find_email_address, is_valid_email, Contact};
    use crate::errors::DomainError;

    #[test]
    fn contact_trims_and_validates() {
        let contact = Contact::new("  Ashu ", " ashu.kumar@oracle.com ").expect("valid contact");
        assert_eq!(contact.name, "Ashu");
        assert_eq!(contact.email, "ashu.kumar@oracle.com");
    }

    #[test]
    fn contact_rejects_blank_name_and_bad_address() {
        assert!(matches!(Contact::new(" ", "a@b.com"), Err(DomainError::Validation(_))));
        assert!(matches!(Contact::new("Ashu", "ashu-at-oracle"), Err(DomainError::Validation(_))));
    }

    #[test]
    fn address_detection_finds_embedded_addresses() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("Ashu <a@b.com>"));
        assert_eq!(
            find_email_address("Ashu <ashu.kumar@oracle.com>"),
            Some("ashu.kumar@oracle.com")
        );
        assert_eq!(find_email_address("mailto:hr@example.org"), Some("hr@example.org"));
        assert_eq!(find_email_address("the HR team"), None);
    }
}

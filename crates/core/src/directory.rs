//! Recipient directory matching.
//!
//! Candidates are ranked by match tier (exact name, word prefix, substring of
//! the name or the address local part), then by shorter name, then
//! alphabetically. The winner is reported together with the other candidate
//! names so a caller can ask for disambiguation.

use serde::{Deserialize, Serialize};

use crate::domain::contact::Contact;

const MAX_ALTERNATIVES: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    WordPrefix,
    Substring,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMatch {
    pub contact: Contact,
    pub match_kind: MatchKind,
    pub alternatives: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found(ContactMatch),
    NotFound { query: String },
}

impl LookupOutcome {
    pub fn from_candidates(query: &str, candidates: impl IntoIterator<Item = Contact>) -> Self {
        match best_match(query, candidates) {
            Some(found) => Self::Found(found),
            None => Self::NotFound { query: query.trim().to_string() },
        }
    }

    pub fn contact(&self) -> Option<&Contact> {
        match self {
            Self::Found(found) => Some(&found.contact),
            Self::NotFound { .. } => None,
        }
    }
}

pub fn normalize_name(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

pub fn classify(query: &str, contact: &Contact) -> Option<MatchKind> {
    let query = normalize_name(query);
    if query.is_empty() {
        return None;
    }

    let name = normalize_name(&contact.name);
    if name == query {
        return Some(MatchKind::Exact);
    }
    if name.starts_with(&query) || name.split(' ').any(|word| word.starts_with(&query)) {
        return Some(MatchKind::WordPrefix);
    }

    let local_part = contact.email.split('@').next().unwrap_or_default().to_lowercase();
    if name.contains(&query) || local_part.contains(&query) {
        return Some(MatchKind::Substring);
    }

    None
}

pub fn best_match(
    query: &str,
    candidates: impl IntoIterator<Item = Contact>,
) -> Option<ContactMatch> {
    let mut ranked: Vec<(MatchKind, Contact)> = candidates
        .into_iter()
        .filter_map(|contact| classify(query, &contact).map(|kind| (kind, contact)))
        .collect();

    ranked.sort_by(|(kind_a, a), (kind_b, b)| {
        kind_a
            .cmp(kind_b)
            .then_with(|| a.name.chars().count().cmp(&b.name.chars().count()))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    ranked.dedup_by(|(_, a), (_, b)| normalize_name(&a.name) == normalize_name(&b.name));

    let mut ranked = ranked.into_iter();
    let (match_kind, contact) = ranked.next()?;
    let alternatives =
        ranked.take(MAX_ALTERNATIVES).map(|(_, contact)| contact.name).collect::<Vec<_>>();

    Some(ContactMatch { contact, match_kind, alternatives })
}

/// A fixed, in-memory directory.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    contacts: Vec<Contact>,
}

impl Directory {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn lookup(&self, query: &str) -> LookupOutcome {
        LookupOutcome::from_candidates(query, self.contacts.iter().cloned())
    }
}

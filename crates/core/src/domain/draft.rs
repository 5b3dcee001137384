use serde::{Deserialize, Serialize};

/// A not-yet-sent email. Only built once recipient, subject and body are all known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

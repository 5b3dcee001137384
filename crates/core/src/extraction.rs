//! Heuristic extraction of email fields from free-form model output.
//!
//! The extractor looks for marker lines such as `To:`, `Subject:` and
//! `Message:` (case-insensitive, tolerant of markdown decoration like
//! `**Subject:**` or `- To:`). A field that has no marker is reported as
//! missing; nothing is inferred from surrounding prose.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::contact::find_email_address;
use crate::domain::draft::EmailDraft;

pub const DEFAULT_MAX_INPUT_BYTES: usize = 64 * 1024;

const RECIPIENT_LABELS: &[&str] =
    &["to", "recipient", "recipient email", "email", "email address"];
const SUBJECT_LABELS: &[&str] = &["subject", "subject line", "re"];
const BODY_LABELS: &[&str] = &["message", "message body", "body", "email body", "content"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailField {
    Recipient,
    Subject,
    Body,
}

impl EmailField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recipient => "recipient",
            Self::Subject => "subject",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for EmailField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("input text is {actual} bytes which exceeds the {limit} byte limit")]
    TooLarge { actual: usize, limit: usize },
    #[error("missing email fields: {}", join_fields(.0))]
    MissingFields(Vec<EmailField>),
}

fn join_fields(fields: &[EmailField]) -> String {
    fields.iter().map(|field| field.as_str()).collect::<Vec<_>>().join(", ")
}

/// Result of scanning a block of text. `to` only holds a real address; a
/// recipient given by name lands in `recipient_name` and the recipient is
/// still reported missing until it is resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEmail {
    pub to: Option<String>,
    pub recipient_name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub missing: Vec<EmailField>,
}

impl ExtractedEmail {
    fn from_parts(
        to: Option<String>,
        recipient_name: Option<String>,
        subject: Option<String>,
        body: Option<String>,
    ) -> Self {
        let mut extracted = Self { to, recipient_name, subject, body, missing: Vec::new() };
        extracted.refresh_missing();
        extracted
    }

    fn refresh_missing(&mut self) {
        let mut missing = Vec::new();
        if self.to.is_none() {
            missing.push(EmailField::Recipient);
        }
        if self.subject.is_none() {
            missing.push(EmailField::Subject);
        }
        if self.body.is_none() {
            missing.push(EmailField::Body);
        }
        self.missing = missing;
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Fills in the address for a recipient that was given by name.
    pub fn resolve_recipient(&mut self, address: impl Into<String>) {
        self.to = Some(address.into());
        self.refresh_missing();
    }

    pub fn into_draft(self) -> Result<EmailDraft, ExtractionError> {
        match (self.to, self.subject, self.body) {
            (Some(to), Some(subject), Some(body)) => Ok(EmailDraft { to, subject, body }),
            _ => Err(ExtractionError::MissingFields(self.missing)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EmailExtractor {
    max_input_bytes: usize,
}

impl Default for EmailExtractor {
    fn default() -> Self {
        Self { max_input_bytes: DEFAULT_MAX_INPUT_BYTES }
    }
}

impl EmailExtractor {
    pub fn new(max_input_bytes: usize) -> Self {
        Self { max_input_bytes: max_input_bytes.max(1) }
    }

    pub fn extract(&self, text: &str) -> Result<ExtractedEmail, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyInput);
        }
        if text.len() > self.max_input_bytes {
            return Err(ExtractionError::TooLarge {
                actual: text.len(),
                limit: self.max_input_bytes,
            });
        }

        let mut recipient: Option<String> = None;
        let mut subject: Option<String> = None;
        let mut body_lines: Option<Vec<String>> = None;
        let mut capturing_body = false;

        for line in text.lines() {
            if line.trim_start().starts_with("```") {
                continue;
            }

            match parse_marker(line) {
                Some((field, value)) => {
                    capturing_body = false;
                    match field {
                        EmailField::Recipient if recipient.is_none() => {
                            recipient = non_empty(value);
                        }
                        EmailField::Subject if subject.is_none() => {
                            subject = non_empty(strip_quotes(value));
                        }
                        EmailField::Body if body_lines.is_none() => {
                            body_lines = Some(vec![value.to_string()]);
                            capturing_body = true;
                        }
                        _ => {}
                    }
                }
                None if capturing_body => {
                    if let Some(lines) = body_lines.as_mut() {
                        lines.push(line.trim_end().to_string());
                    }
                }
                None => {}
            }
        }

        let body = body_lines.and_then(|lines| non_empty(lines.join("\n").trim()));
        let (to, recipient_name) = match recipient {
            Some(value) => match find_email_address(&value) {
                Some(address) => (Some(address.to_string()), None),
                None => (None, non_empty(value.trim_end_matches(['.', ',', ';']))),
            },
            None => (None, None),
        };

        Ok(ExtractedEmail::from_parts(to, recipient_name, subject, body))
    }
}

/// Extracts with the default input limit.
pub fn extract_email_fields(text: &str) -> Result<ExtractedEmail, ExtractionError> {
    EmailExtractor::default().extract(text)
}

fn parse_marker(line: &str) -> Option<(EmailField, &str)> {
    let stripped = line.trim_start_matches(|ch: char| ch.is_whitespace() || is_decoration(ch));
    let (label, rest) = stripped.split_once(':')?;
    let label = label.trim_end_matches(|ch: char| ch.is_whitespace() || is_decoration(ch));
    let label = label.to_ascii_lowercase();

    let field = if RECIPIENT_LABELS.contains(&label.as_str()) {
        EmailField::Recipient
    } else if SUBJECT_LABELS.contains(&label.as_str()) {
        EmailField::Subject
    } else if BODY_LABELS.contains(&label.as_str()) {
        EmailField::Body
    } else {
        return None;
    };

    let value = rest.trim_start_matches(|ch: char| ch == '*' || ch == '_').trim();
    Some((field, value))
}

fn is_decoration(ch: char) -> bool {
    matches!(ch, '*' | '_' | '-' | '#' | '>' | '`')
}

fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{extract_email_fields, EmailExtractor, EmailField, ExtractionError};

    #[test]
    fn well_formed_markers_are_extracted_exactly() {
        let extracted =
            extract_email_fields("To: a@b.com\nSubject: Hi\nMessage: test").expect("extracts");

        assert_eq!(extracted.to.as_deref(), Some("a@b.com"));
        assert_eq!(extracted.subject.as_deref(), Some("Hi"));
        assert_eq!(extracted.body.as_deref(), Some("test"));
        assert!(extracted.is_complete());
    }

    #[test]
    fn markdown_decorated_markers_are_recognized() {
        let text = "Here is the draft:\n\n**To:** Ashu <ashu.kumar@oracle.com>\n\
                    **Subject:** \"Leave balance\"\n**Body:**\nHi Ashu,\n\n\
                    You have 12 days left.\n\nRegards,\nHR";
        let extracted = extract_email_fields(text).expect("extracts");

        assert_eq!(extracted.to.as_deref(), Some("ashu.kumar@oracle.com"));
        assert_eq!(extracted.subject.as_deref(), Some("Leave balance"));
        assert_eq!(
            extracted.body.as_deref(),
            Some("Hi Ashu,\n\nYou have 12 days left.\n\nRegards,\nHR")
        );
    }

    #[test]
    fn missing_subject_is_reported_not_fabricated() {
        let extracted =
            extract_email_fields("To: a@b.com\nMessage: Please review the policy.").expect("ok");

        assert_eq!(extracted.subject, None);
        assert_eq!(extracted.missing, vec![EmailField::Subject]);
    }

    #[test]
    fn prose_without_markers_reports_every_field_missing() {
        let extracted = extract_email_fields("I think you should write to HR about this.")
            .expect("extraction succeeds with missing fields");

        assert_eq!(
            extracted.missing,
            vec![EmailField::Recipient, EmailField::Subject, EmailField::Body]
        );
    }

    #[test]
    fn recipient_given_by_name_is_kept_for_resolution() {
        let mut extracted =
            extract_email_fields("To: Ashu\nSubject: Hi\nMessage: test").expect("extracts");

        assert_eq!(extracted.to, None);
        assert_eq!(extracted.recipient_name.as_deref(), Some("Ashu"));
        assert_eq!(extracted.missing, vec![EmailField::Recipient]);

        extracted.resolve_recipient("ashu.kumar@oracle.com");
        assert!(extracted.is_complete());
        let draft = extracted.into_draft().expect("complete draft");
        assert_eq!(draft.to, "ashu.kumar@oracle.com");
    }

    #[test]
    fn body_stops_at_the_next_marker_and_first_marker_wins() {
        let text = "Message: first line\nsecond line\nSubject: Later subject\n\
                    Subject: ignored\nTo: x@y.org";
        let extracted = extract_email_fields(text).expect("extracts");

        assert_eq!(extracted.body.as_deref(), Some("first line\nsecond line"));
        assert_eq!(extracted.subject.as_deref(), Some("Later subject"));
        assert_eq!(extracted.to.as_deref(), Some("x@y.org"));
    }

    #[test]
    fn code_fences_are_ignored() {
        let text = "```\nTo: a@b.com\nSubject: Hi\nMessage: test\n```";
        let extracted = extract_email_fields(text).expect("extracts");

        assert_eq!(extracted.body.as_deref(), Some("test"));
    }

    #[test]
    fn incomplete_extraction_cannot_become_a_draft() {
        let extracted = extract_email_fields("Subject: Hi").expect("extracts");
        let error = extracted.into_draft().expect_err("draft needs every field");

        assert_eq!(
            error,
            ExtractionError::MissingFields(vec![EmailField::Recipient, EmailField::Body])
        );
        assert_eq!(error.to_string(), "missing email fields: recipient, body");
    }

    #[test]
    fn blank_and_oversized_inputs_are_rejected() {
        assert_eq!(extract_email_fields("  \n\t"), Err(ExtractionError::EmptyInput));

        let extractor = EmailExtractor::new(16);
        let result = extractor.extract("To: a@b.com\nSubject: Hi\nMessage: test");
        assert!(matches!(result, Err(ExtractionError::TooLarge { limit: 16, .. })));
    }
}

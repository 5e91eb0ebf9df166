//! Contact form validation.
//!
//! Rules run in a fixed order and the first failure wins. Nothing here performs I/O,
//! so a rejected submission never reaches the CRM.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::models::LeadSubmission;

pub const NAME_MAX_CHARS: usize = 50;
pub const MESSAGE_MAX_CHARS: usize = 2000;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+()\s-]+$").expect("valid phone regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingRequiredFields,
    FieldLength { field: &'static str },
    InvalidEmail,
    InvalidPhone,
    MessageTooLong,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingRequiredFields => write!(
                f,
                "Missing required fields: first name, last name, title, company, and email are required"
            ),
            ValidationError::FieldLength { field } => write!(
                f,
                "{} must be between 1 and {} characters",
                field, NAME_MAX_CHARS
            ),
            ValidationError::InvalidEmail => write!(f, "Please provide a valid email address"),
            ValidationError::InvalidPhone => {
                write!(f, "Phone number contains invalid characters")
            }
            ValidationError::MessageTooLong => write!(
                f,
                "Message must be {} characters or fewer",
                MESSAGE_MAX_CHARS
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates a submission, returning the first rule it breaks.
pub fn validate(submission: &LeadSubmission) -> Result<(), ValidationError> {
    let required = [
        &submission.first_name,
        &submission.last_name,
        &submission.title,
        &submission.company,
        &submission.email,
    ];
    if required.iter().any(|v| v.trim().is_empty()) {
        return Err(ValidationError::MissingRequiredFields);
    }

    check_name_length(&submission.first_name, "First name")?;
    check_name_length(&submission.last_name, "Last name")?;

    if !is_valid_email(&submission.email) {
        return Err(ValidationError::InvalidEmail);
    }

    if let Some(phone) = non_blank(&submission.phone) {
        if !is_valid_phone(phone) {
            return Err(ValidationError::InvalidPhone);
        }
    }

    if let Some(message) = non_blank(&submission.message) {
        if message.chars().count() > MESSAGE_MAX_CHARS {
            return Err(ValidationError::MessageTooLong);
        }
    }

    Ok(())
}

/// `local@domain.tld` shape check on the address as submitted; surrounding
/// whitespace fails the check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Digits, spaces, `+`, `-`, `(` and `)` only.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone.trim())
}

fn check_name_length(value: &str, field: &'static str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 || len > NAME_MAX_CHARS {
        return Err(ValidationError::FieldLength { field });
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> LeadSubmission {
        LeadSubmission {
            first_name: "Ana".to_string(),
            last_name: "Lee".to_string(),
            title: "Dean".to_string(),
            company: "Acme College".to_string(),
            email: "ana@acme.edu".to_string(),
            phone: None,
            message: None,
        }
    }

    #[test]
    fn test_valid_submission_passes() {
        assert_eq!(validate(&valid()), Ok(()));
    }

    #[test]
    fn test_missing_fields_checked_before_everything_else() {
        let lead = LeadSubmission {
            title: "   ".to_string(),
            email: "broken".to_string(),
            phone: Some("call-me!".to_string()),
            ..valid()
        };
        assert_eq!(validate(&lead), Err(ValidationError::MissingRequiredFields));
    }

    #[test]
    fn test_first_name_checked_before_last_name() {
        let lead = LeadSubmission {
            first_name: "a".repeat(51),
            last_name: "b".repeat(51),
            ..valid()
        };
        assert_eq!(
            validate(&lead),
            Err(ValidationError::FieldLength { field: "First name" })
        );
    }

    #[test]
    fn test_name_length_counts_characters_not_bytes() {
        let lead = LeadSubmission {
            last_name: "é".repeat(50),
            ..valid()
        };
        assert_eq!(validate(&lead), Ok(()));
    }

    #[test]
    fn test_blank_optionals_skip_their_checks() {
        let lead = LeadSubmission {
            phone: Some("  ".to_string()),
            message: Some(String::new()),
            ..valid()
        };
        assert_eq!(validate(&lead), Ok(()));
    }

    #[test]
    fn test_email_is_matched_untrimmed() {
        let lead = LeadSubmission {
            email: " a@b.co ".to_string(),
            ..valid()
        };
        assert_eq!(validate(&lead), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn test_error_messages_name_the_field() {
        assert_eq!(
            ValidationError::FieldLength { field: "Last name" }.to_string(),
            "Last name must be between 1 and 50 characters"
        );
    }
}

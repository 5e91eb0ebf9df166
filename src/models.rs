use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Inbound contact form
// ============================================================================

/// Lead captured by the website contact form.
///
/// Required fields default to an empty string when the key is missing or `null` so the
/// validator reports them as missing instead of the JSON extractor failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl LeadSubmission {
    /// Returns a copy with every field trimmed and blank optional fields dropped.
    pub fn normalized(&self) -> Self {
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            title: self.title.trim().to_string(),
            company: self.company.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: optional(&self.phone),
            message: optional(&self.message),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Successful submission response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub contact_id: String,
}

/// Static payload of `GET /api/contact`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub message: String,
    pub timestamp: String,
}

// ============================================================================
// CRM resources
// ============================================================================

/// Contact record as returned by the CRM.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CrmContact {
    pub id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_attributes: HashMap<String, Value>,
}

/// Error list returned by the CRM on non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CrmErrorBody {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub errors: Vec<CrmErrorEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CrmErrorEntry {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl CrmErrorBody {
    /// First entry carrying the given error code.
    pub fn find_code(&self, code: &str) -> Option<&CrmErrorEntry> {
        self.errors.iter().find(|e| e.code == code)
    }
}

// ============================================================================
// Outbound CRM payloads
// ============================================================================

pub const LEAD_ROLE: &str = "lead";

/// POST /contacts
#[derive(Debug, Clone, Serialize)]
pub struct CreateContactRequest {
    pub role: &'static str,
    pub email: String,
    pub name: String,
}

impl CreateContactRequest {
    pub fn from_submission(submission: &LeadSubmission) -> Self {
        Self {
            role: LEAD_ROLE,
            email: submission.email.trim().to_string(),
            name: submission.full_name(),
        }
    }
}

/// PUT /contacts/{id} renaming an existing contact.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateContactNameRequest {
    pub name: String,
}

/// PUT /contacts/{id} extending custom attributes.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateContactAttributesRequest {
    pub custom_attributes: ContactAttributes,
}

/// Custom attributes written for every demo request.
///
/// Optional profile fields are omitted when absent so existing CRM values are kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactAttributes {
    pub demo_request: bool,
    pub demo_requested_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ContactAttributes {
    pub fn for_submission(submission: &LeadSubmission, submitted_at: DateTime<Utc>) -> Self {
        let lead = submission.normalized();
        let present = |v: String| if v.is_empty() { None } else { Some(v) };

        Self {
            demo_request: true,
            demo_requested_at: format_timestamp(submitted_at),
            title: present(lead.title),
            company: present(lead.company),
            phone: lead.phone,
        }
    }
}

/// POST /tags
#[derive(Debug, Clone, Serialize)]
pub struct TagContactRequest {
    pub name: String,
    pub users: Vec<TaggedContact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaggedContact {
    pub id: String,
}

/// POST /conversations
#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationRequest {
    pub from: ConversationAuthor,
    pub body: String,
    pub message_type: &'static str,
    pub subject: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationAuthor {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
}

/// Timestamps sent to the CRM and shown in conversation bodies.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

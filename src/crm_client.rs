use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::models::{
    format_timestamp, ContactAttributes, ConversationAuthor, CreateContactRequest,
    CreateConversationRequest, CrmContact, CrmErrorBody, LeadSubmission, TagContactRequest,
    TaggedContact, UpdateContactAttributesRequest, UpdateContactNameRequest, LEAD_ROLE,
};

/// Header pinning the CRM API version.
pub const API_VERSION_HEADER: &str = "Intercom-Version";
pub const CONVERSATION_SUBJECT: &str = "New Demo Request";
pub const CONVERSATION_MESSAGE_TYPE: &str = "email";
pub const CALL_TO_ACTION: &str = "Please follow up with this lead to schedule a demo.";

/// Failure of a single CRM call. Whether it is fatal is up to the caller.
#[derive(Debug, Clone)]
pub enum CrmError {
    /// Network failure or timeout before a response arrived.
    Transport(String),
    /// Non-2xx response. `body` is set when the payload was a CRM error list.
    Api {
        status: StatusCode,
        body: Option<CrmErrorBody>,
        raw: String,
    },
    /// 2xx response whose body could not be decoded.
    Decode(String),
}

impl CrmError {
    /// The structured error list, when the CRM sent one.
    pub fn error_body(&self) -> Option<&CrmErrorBody> {
        match self {
            CrmError::Api { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for CrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrmError::Transport(msg) => write!(f, "CRM request failed: {}", msg),
            CrmError::Api { status, raw, .. } => write!(f, "CRM returned {}: {}", status, raw),
            CrmError::Decode(msg) => write!(f, "Failed to parse CRM response: {}", msg),
        }
    }
}

impl std::error::Error for CrmError {}

/// Client for the handful of CRM endpoints the contact form uses.
#[derive(Clone)]
pub struct CrmClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    api_version: String,
}

impl fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmClient")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl CrmClient {
    /// Creates a new `CrmClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the CRM REST API, without a trailing slash.
    /// * `token` - Bearer token for authentication.
    /// * `api_version` - Value sent in the version header on every request.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CrmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrmError::Transport(format!("Failed to create CRM client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            api_version: api_version.into(),
        })
    }

    /// Creates a lead-role contact for the submission.
    ///
    /// A non-2xx answer comes back as [`CrmError::Api`] with the CRM's error list so the
    /// caller can recognise a duplicate-email conflict.
    pub async fn create_contact(&self, submission: &LeadSubmission) -> Result<CrmContact, CrmError> {
        let payload = CreateContactRequest::from_submission(submission);
        tracing::info!("Creating CRM contact for {}", payload.email);

        let contact: CrmContact = self
            .send_json(self.request(Method::POST, "/contacts").json(&payload))
            .await?;

        tracing::info!("✓ CRM contact created: {}", contact.id);
        Ok(contact)
    }

    /// Gets a contact by id.
    pub async fn fetch_contact(&self, contact_id: &str) -> Result<CrmContact, CrmError> {
        tracing::info!("Fetching CRM contact {}", contact_id);
        let path = format!("/contacts/{}", contact_id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    /// Renames an existing contact.
    pub async fn update_contact_name(&self, contact_id: &str, name: &str) -> Result<(), CrmError> {
        let payload = UpdateContactNameRequest {
            name: name.to_string(),
        };
        self.put_contact(contact_id, &payload).await?;
        tracing::info!("✓ CRM contact {} renamed", contact_id);
        Ok(())
    }

    /// Adds demo-request attributes to a contact. Only the listed keys are written.
    pub async fn update_contact_attributes(
        &self,
        contact_id: &str,
        submission: &LeadSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), CrmError> {
        let payload = UpdateContactAttributesRequest {
            custom_attributes: ContactAttributes::for_submission(submission, submitted_at),
        };
        self.put_contact(contact_id, &payload).await?;
        tracing::info!("✓ CRM contact {} attributes updated", contact_id);
        Ok(())
    }

    /// Tags a contact.
    pub async fn add_tag(&self, contact_id: &str, tag_name: &str) -> Result<(), CrmError> {
        let payload = TagContactRequest {
            name: tag_name.to_string(),
            users: vec![TaggedContact {
                id: contact_id.to_string(),
            }],
        };
        self.send_unit(self.request(Method::POST, "/tags").json(&payload))
            .await?;
        tracing::info!("✓ CRM contact {} tagged '{}'", contact_id, tag_name);
        Ok(())
    }

    /// Opens a conversation on behalf of the contact summarising the submission.
    pub async fn create_conversation(
        &self,
        contact: &CrmContact,
        submission: &LeadSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), CrmError> {
        let payload = CreateConversationRequest {
            from: ConversationAuthor {
                kind: LEAD_ROLE,
                id: contact.id.clone(),
            },
            body: format_conversation_body(contact, submission, submitted_at),
            message_type: CONVERSATION_MESSAGE_TYPE,
            subject: CONVERSATION_SUBJECT,
        };
        self.send_unit(self.request(Method::POST, "/conversations").json(&payload))
            .await?;
        tracing::info!("✓ CRM conversation opened for contact {}", contact.id);
        Ok(())
    }

    async fn put_contact<T: Serialize>(&self, contact_id: &str, payload: &T) -> Result<(), CrmError> {
        let path = format!("/contacts/{}", contact_id);
        self.send_unit(self.request(Method::PUT, &path).json(payload))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("CRM {} {}", method, url);

        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header(API_VERSION_HEADER, &self.api_version)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, CrmError> {
        let response = request
            .send()
            .await
            .map_err(|e| CrmError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let raw = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let body = serde_json::from_str::<CrmErrorBody>(&raw).ok();
            return Err(CrmError::Api { status, body, raw });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CrmError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| CrmError::Decode(e.to_string()))
    }

    async fn send_unit(&self, request: RequestBuilder) -> Result<(), CrmError> {
        self.send(request).await.map(|_| ())
    }
}

/// Renders the conversation body. Same inputs always give the same text.
pub fn format_conversation_body(
    contact: &CrmContact,
    submission: &LeadSubmission,
    submitted_at: DateTime<Utc>,
) -> String {
    let lead = submission.normalized();
    let mut lines = vec![
        format!("New demo request from {}", lead.full_name()),
        String::new(),
        "Contact details".to_string(),
        format!("Name: {}", lead.full_name()),
        format!("Email: {}", lead.email),
        format!("Title: {}", lead.title),
        format!("Company: {}", lead.company),
    ];
    if let Some(phone) = &lead.phone {
        lines.push(format!("Phone: {}", phone));
    }
    lines.push(format!("CRM contact: {}", contact.id));

    if let Some(message) = &lead.message {
        lines.push(String::new());
        lines.push("Message".to_string());
        lines.push(message.clone());
    }

    lines.push(String::new());
    lines.push(format!("Submitted at: {}", format_timestamp(submitted_at)));
    lines.push(String::new());
    lines.push(CALL_TO_ACTION.to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn contact() -> CrmContact {
        CrmContact {
            id: "abc123".to_string(),
            role: Some("lead".to_string()),
            email: Some("ana@acme.edu".to_string()),
            name: Some("Ana Lee".to_string()),
            custom_attributes: HashMap::new(),
        }
    }

    fn submission() -> LeadSubmission {
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
    fn test_client_creation() {
        let client = CrmClient::new(
            "https://example.com/",
            "token",
            "2.11",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://example.com");
        assert!(!format!("{:?}", client).contains("token"));
    }

    #[test]
    fn test_conversation_body_without_optional_sections() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 14, 30, 0).unwrap();
        let body = format_conversation_body(&contact(), &submission(), at);

        assert_eq!(
            body,
            "New demo request from Ana Lee\n\
             \n\
             Contact details\n\
             Name: Ana Lee\n\
             Email: ana@acme.edu\n\
             Title: Dean\n\
             Company: Acme College\n\
             CRM contact: abc123\n\
             \n\
             Submitted at: 2026-03-01T14:30:00Z\n\
             \n\
             Please follow up with this lead to schedule a demo."
        );
    }

    #[test]
    fn test_conversation_body_with_phone_and_message() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 14, 30, 0).unwrap();
        let lead = LeadSubmission {
            phone: Some(" +1 (416) 555-0100 ".to_string()),
            message: Some("We enrol 4,000 students a year.".to_string()),
            ..submission()
        };
        let body = format_conversation_body(&contact(), &lead, at);

        assert!(body.contains("Phone: +1 (416) 555-0100\nCRM contact: abc123"));
        assert!(body.contains("\n\nMessage\nWe enrol 4,000 students a year.\n\nSubmitted at:"));
        assert!(body.ends_with(CALL_TO_ACTION));
    }

    #[test]
    fn test_error_body_only_for_api_errors() {
        let err = CrmError::Api {
            status: StatusCode::CONFLICT,
            body: Some(CrmErrorBody::default()),
            raw: "{}".to_string(),
        };
        assert!(err.error_body().is_some());
        assert!(CrmError::Transport("timeout".to_string())
            .error_body()
            .is_none());
    }
}

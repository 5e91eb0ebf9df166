//! Create-or-merge of the CRM contact behind a submission.
//!
//! The CRM refuses to create a second contact for an email it already knows and answers
//! with a `conflict` error whose free-text message contains `id=<hex>`. That id is the
//! only pointer to the existing record, so the message is parsed.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::crm_client::{CrmClient, CrmError};
use crate::models::{CrmContact, LeadSubmission};

pub const CONFLICT_CODE: &str = "conflict";

static CONFLICT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id=([0-9a-fA-F]+)").expect("valid conflict id regex"));

/// Reasons no usable contact could be produced. All of them are fatal for the request.
#[derive(Debug, Clone)]
pub enum ResolutionError {
    /// Creation failed for a reason other than a duplicate.
    CreateFailed(CrmError),
    /// Conflict reported but its message had no `id=<hex>`.
    MissingConflictId { message: String },
    /// The contact named by the conflict could not be fetched.
    FetchFailed { contact_id: String, source: CrmError },
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::CreateFailed(e) => write!(f, "Contact creation failed: {}", e),
            ResolutionError::MissingConflictId { message } => write!(
                f,
                "Could not extract contact id from conflict message: {}",
                message
            ),
            ResolutionError::FetchFailed { contact_id, source } => write!(
                f,
                "Failed to fetch existing contact {}: {}",
                contact_id, source
            ),
        }
    }
}

impl std::error::Error for ResolutionError {}

/// Pulls the existing contact id out of a conflict message.
pub fn extract_conflict_contact_id(message: &str) -> Option<String> {
    CONFLICT_ID_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Returns a contact for the submission, creating it or reusing the one the CRM reports
/// as a duplicate. Creation is attempted exactly once.
pub async fn resolve_contact(
    crm: &CrmClient,
    submission: &LeadSubmission,
) -> Result<CrmContact, ResolutionError> {
    let create_err = match crm.create_contact(submission).await {
        Ok(contact) => return Ok(contact),
        Err(e) => e,
    };

    let conflict = create_err
        .error_body()
        .and_then(|body| body.find_code(CONFLICT_CODE))
        .cloned();
    let Some(conflict) = conflict else {
        return Err(ResolutionError::CreateFailed(create_err));
    };

    tracing::info!("Contact already exists in CRM: {}", conflict.message);

    let contact_id = extract_conflict_contact_id(&conflict.message).ok_or_else(|| {
        ResolutionError::MissingConflictId {
            message: conflict.message.clone(),
        }
    })?;

    let existing = crm
        .fetch_contact(&contact_id)
        .await
        .map_err(|source| ResolutionError::FetchFailed {
            contact_id: contact_id.clone(),
            source,
        })?;

    if let Err(e) = crm
        .update_contact_name(&existing.id, &submission.full_name())
        .await
    {
        tracing::warn!("⚠️  Failed to update name of contact {}: {}", existing.id, e);
    }

    Ok(existing)
}

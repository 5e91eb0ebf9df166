//! Contact form submission workflow:
//! 1. Validate the submission (no I/O)
//! 2. Make sure a CRM client is configured
//! 3. Create the CRM contact, or reuse the existing one on a duplicate-email conflict
//! 4. Best-effort enrichment: attributes, tag, conversation
//! 5. Report the contact id

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;

use crate::crm_client::{CrmClient, CrmError};
use crate::errors::{AppError, ResultExt};
use crate::models::{CrmContact, LeadSubmission};
use crate::resolution::resolve_contact;
use crate::validation::validate;

/// Where a submission is in its lifecycle. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    ContactResolved,
    Enriched,
    Rejected,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::ContactResolved => "contact_resolved",
            Stage::Enriched => "enriched",
            Stage::Rejected => "rejected",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Enrichment calls made after the contact is resolved, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentStep {
    UpdateAttributes,
    AddTag,
    CreateConversation,
}

impl fmt::Display for EnrichmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnrichmentStep::UpdateAttributes => "update attributes",
            EnrichmentStep::AddTag => "add tag",
            EnrichmentStep::CreateConversation => "create conversation",
        };
        f.write_str(name)
    }
}

/// Which enrichment calls succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub attributes_updated: bool,
    pub tagged: bool,
    pub conversation_created: bool,
}

impl EnrichmentReport {
    pub fn is_complete(&self) -> bool {
        self.attributes_updated && self.tagged && self.conversation_created
    }
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub contact_id: String,
    pub enrichment: EnrichmentReport,
}

/// Runs submissions against the CRM.
///
/// `crm` is `None` when no access token is configured; every submission that passes
/// validation then fails with a configuration error.
#[derive(Debug, Clone)]
pub struct LeadPipeline {
    crm: Option<CrmClient>,
    lead_tag: String,
}

impl LeadPipeline {
    pub fn new(crm: Option<CrmClient>, lead_tag: impl Into<String>) -> Self {
        Self {
            crm,
            lead_tag: lead_tag.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.crm.is_some()
    }

    /// Processes one submission end to end.
    ///
    /// # Returns
    ///
    /// * `Ok(SubmissionReceipt)` - The lead is represented in the CRM.
    /// * `Err(AppError::BadRequest)` - Validation failed; nothing was sent to the CRM.
    /// * `Err(AppError::Configuration)` - No CRM token; nothing was sent to the CRM.
    /// * `Err(AppError::WithContext)` - The contact could not be created or resolved; the
    ///   root cause is an `AppError::ExternalApiError`.
    pub async fn submit(&self, submission: LeadSubmission) -> Result<SubmissionReceipt, AppError> {
        tracing::debug!("Submission {}", Stage::Received);

        if let Err(e) = validate(&submission) {
            tracing::info!("Submission {}: {}", Stage::Rejected, e);
            return Err(AppError::BadRequest(e.to_string()));
        }
        let lead = submission.normalized();
        tracing::info!("Submission {} for {}", Stage::Validated, lead.email);

        let Some(crm) = &self.crm else {
            tracing::error!("Submission {}: CRM access token is not configured", Stage::Failed);
            return Err(AppError::Configuration(
                "CRM access token is not configured".to_string(),
            ));
        };

        let contact = resolve_contact(crm, &lead)
            .await
            .map_err(|e| {
                tracing::error!("Submission {}: {}", Stage::Failed, e);
                AppError::ExternalApiError(e.to_string())
            })
            .with_context(|| format!("resolving CRM contact for {}", lead.email))?;
        tracing::info!("Submission {}: contact {}", Stage::ContactResolved, contact.id);

        let submitted_at = Utc::now();
        let enrichment = self.enrich(crm, &contact, &lead, submitted_at).await;
        if enrichment.is_complete() {
            tracing::info!("Submission {}: contact {}", Stage::Enriched, contact.id);
        } else {
            tracing::warn!(
                "Submission {} partially: contact {} ({:?})",
                Stage::Enriched,
                contact.id,
                enrichment
            );
        }

        Ok(SubmissionReceipt {
            contact_id: contact.id,
            enrichment,
        })
    }

    /// Runs every enrichment call in order. Failures are logged and never stop later steps.
    async fn enrich(
        &self,
        crm: &CrmClient,
        contact: &CrmContact,
        lead: &LeadSubmission,
        submitted_at: DateTime<Utc>,
    ) -> EnrichmentReport {
        let attributes_updated = best_effort(
            EnrichmentStep::UpdateAttributes,
            &contact.id,
            crm.update_contact_attributes(&contact.id, lead, submitted_at),
        )
        .await;

        let tagged = best_effort(
            EnrichmentStep::AddTag,
            &contact.id,
            crm.add_tag(&contact.id, &self.lead_tag),
        )
        .await;

        let conversation_created = best_effort(
            EnrichmentStep::CreateConversation,
            &contact.id,
            crm.create_conversation(contact, lead, submitted_at),
        )
        .await;

        EnrichmentReport {
            attributes_updated,
            tagged,
            conversation_created,
        }
    }
}

/// Awaits a CRM call and turns its failure into a warning.
async fn best_effort<F>(step: EnrichmentStep, contact_id: &str, call: F) -> bool
where
    F: Future<Output = Result<(), CrmError>>,
{
    match call.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("⚠️  Failed to {} for contact {}: {}", step, contact_id, e);
            false
        }
    }
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

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let pipeline = LeadPipeline::new(None, "Demo Request");
        let lead = LeadSubmission {
            email: "not-an-email".to_string(),
            ..valid()
        };

        match pipeline.submit(lead).await {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Please provide a valid email address")
            }
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_token_is_configuration_error() {
        let pipeline = LeadPipeline::new(None, "Demo Request");
        assert!(!pipeline.is_configured());

        let result = pipeline.submit(valid()).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_best_effort_swallows_failures() {
        let ok = best_effort(EnrichmentStep::AddTag, "abc123", async { Ok(()) }).await;
        let failed = best_effort(EnrichmentStep::AddTag, "abc123", async {
            Err(CrmError::Transport("timed out".to_string()))
        })
        .await;

        assert!(ok);
        assert!(!failed);
    }

    #[test]
    fn test_report_completeness() {
        let mut report = EnrichmentReport {
            attributes_updated: true,
            tagged: true,
            conversation_created: true,
        };
        assert!(report.is_complete());
        report.tagged = false;
        assert!(!report.is_complete());
    }
}

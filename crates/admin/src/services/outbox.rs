//! Invoice email outbox delivery.
//!
//! Checkout queues one `invoice_email_outbox` row per order in the same
//! transaction as the order. This worker turns those rows into emails:
//! claim, load the invoice, render the PDF, send, record the outcome.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;

use backoffice_core::{OutboxId, OutboxStatus, numbering};

use super::email::{EmailError, InvoiceMailer, compose_invoice_email};
use super::invoice_pdf::{InvoiceRenderError, render_pdf};
use crate::config::OutboxConfig;
use crate::db::{InvoiceRepository, OutboxRepository, RepositoryError};
use crate::models::{InvoiceDocument, OutboxEntry};

/// How long a claimed row stays hidden from other workers.
const CLAIM_LEASE: Duration = Duration::from_secs(5 * 60);

/// Delay before the first retry; doubles per attempt.
const BASE_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Upper bound on the retry delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60 * 60);

/// Why a delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invoice {0} no longer exists")]
    InvoiceMissing(String),

    #[error("order for invoice {0} no longer exists")]
    OrderMissing(String),

    #[error(transparent)]
    Render(#[from] InvoiceRenderError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// What to do with a row after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Try again after the delay.
    Retry(Duration),
    /// Out of attempts.
    GiveUp,
}

/// Exponential backoff for the `attempt`-th failure (1-based).
#[must_use]
pub fn retry_delay(attempt: i32) -> Duration {
    let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(0).min(16);
    BASE_RETRY_DELAY
        .saturating_mul(1 << exponent)
        .min(MAX_RETRY_DELAY)
}

/// Decide the next step for a row that has now failed `attempts_made` times.
#[must_use]
pub fn next_step(attempts_made: i32, max_attempts: i32) -> RetryStep {
    if attempts_made >= max_attempts {
        RetryStep::GiveUp
    } else {
        RetryStep::Retry(retry_delay(attempts_made))
    }
}

/// Render an invoice and hand it to the mailer, returning the `Message-ID`.
///
/// # Errors
///
/// Returns `DeliveryError::Render` or `DeliveryError::Email` on failure.
pub async fn send_document(
    mailer: &dyn InvoiceMailer,
    document: &InvoiceDocument,
) -> Result<String, DeliveryError> {
    let pdf = render_pdf(document)?;
    let filename = numbering::invoice_filename(document.file_reference(), document.order_date);
    let email = compose_invoice_email(document, filename, pdf)?;
    Ok(mailer.send_invoice(&email).await?)
}

/// Delivers queued invoice emails.
#[derive(Clone)]
pub struct OutboxWorker {
    pool: PgPool,
    mailer: Option<Arc<dyn InvoiceMailer>>,
    config: OutboxConfig,
}

impl OutboxWorker {
    #[must_use]
    pub fn new(pool: PgPool, mailer: Option<Arc<dyn InvoiceMailer>>, config: OutboxConfig) -> Self {
        Self {
            pool,
            mailer,
            config,
        }
    }

    /// Whether a mailer is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Poll for due rows until the task is dropped.
    ///
    /// Returns immediately when no mailer is configured; rows then stay
    /// `pending` until a worker with SMTP settings picks them up.
    pub async fn run(self) {
        if self.mailer.is_none() {
            tracing::warn!("SMTP is not configured, invoice emails will stay queued");
            return;
        }

        tracing::info!(
            poll_seconds = self.config.poll_interval.as_secs(),
            max_attempts = self.config.max_attempts,
            "Outbox worker started"
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "Outbox batch processed"),
                Err(e) => tracing::error!(error = %e, "Outbox poll failed"),
            }
        }
    }

    /// Claim and process one batch of due rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the claim itself fails. Per-row failures
    /// are recorded on the row.
    pub async fn poll_once(&self) -> Result<usize, RepositoryError> {
        let Some(mailer) = self.mailer.as_deref() else {
            return Ok(0);
        };

        let entries = OutboxRepository::new(&self.pool)
            .claim_due(self.config.batch_size, CLAIM_LEASE)
            .await?;
        let count = entries.len();
        for entry in entries {
            self.process(mailer, &entry).await;
        }
        Ok(count)
    }

    /// Attempt one row right away, as checkout does after commit.
    ///
    /// Returns the row's status after the attempt, or `None` when the row was
    /// not claimable (already sent, not yet due, or held by another worker)
    /// or no mailer is configured.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the claim fails.
    pub async fn deliver_now(&self, id: OutboxId) -> Result<Option<OutboxStatus>, RepositoryError> {
        let Some(mailer) = self.mailer.as_deref() else {
            tracing::warn!(outbox_id = %id, "SMTP is not configured, invoice email left queued");
            return Ok(None);
        };

        let Some(entry) = OutboxRepository::new(&self.pool)
            .claim_one(id, CLAIM_LEASE)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(self.process(mailer, &entry).await))
    }

    async fn process(&self, mailer: &dyn InvoiceMailer, entry: &OutboxEntry) -> OutboxStatus {
        let repo = OutboxRepository::new(&self.pool);
        let outcome = self.deliver(mailer, entry).await;

        let recorded = match &outcome {
            Ok(message_id) => {
                tracing::info!(
                    outbox_id = %entry.id,
                    order_id = %entry.order_id,
                    message_id = %message_id,
                    "Invoice email delivered"
                );
                repo.mark_sent(entry.id, message_id)
                    .await
                    .map(|()| OutboxStatus::Sent)
            }
            Err(e) => {
                let error = e.to_string();
                match next_step(entry.attempts + 1, self.config.max_attempts) {
                    RetryStep::Retry(delay) => {
                        tracing::warn!(
                            outbox_id = %entry.id,
                            attempt = entry.attempts + 1,
                            retry_in_secs = delay.as_secs(),
                            error = %error,
                            "Invoice email failed, will retry"
                        );
                        repo.mark_retry(entry.id, &error, delay)
                            .await
                            .map(|()| OutboxStatus::Pending)
                    }
                    RetryStep::GiveUp => {
                        tracing::error!(
                            outbox_id = %entry.id,
                            order_id = %entry.order_id,
                            attempts = entry.attempts + 1,
                            error = %error,
                            "Invoice email failed permanently"
                        );
                        repo.mark_failed(entry.id, &error)
                            .await
                            .map(|()| OutboxStatus::Failed)
                    }
                }
            }
        };

        recorded.unwrap_or_else(|e| {
            tracing::error!(outbox_id = %entry.id, error = %e, "Failed to record outbox outcome");
            entry.status
        })
    }

    async fn deliver(
        &self,
        mailer: &dyn InvoiceMailer,
        entry: &OutboxEntry,
    ) -> Result<String, DeliveryError> {
        let invoices = InvoiceRepository::new(&self.pool);
        let header = invoices
            .get_header(&entry.company_code, entry.invoice_id)
            .await?
            .ok_or_else(|| DeliveryError::InvoiceMissing(entry.invoice_id.to_string()))?;
        let document = invoices
            .load_document(
                &entry.company_code,
                header.order_id,
                &header.invoice_number,
                header.invoice_date,
            )
            .await?
            .ok_or_else(|| DeliveryError::OrderMissing(header.invoice_number.clone()))?;

        send_document(mailer, &document).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::services::email::InvoiceEmail;
    use crate::services::invoice_pdf::tests::sample_document;

    #[derive(Default)]
    struct MemoryMailer {
        sent: Mutex<Vec<InvoiceEmail>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl InvoiceMailer for MemoryMailer {
        async fn send_invoice(&self, email: &InvoiceEmail) -> Result<String, EmailError> {
            if let Some(address) = &self.fail_with {
                return Err(EmailError::InvalidAddress(address.clone()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(format!("<{}@memory>", email.reference))
        }
    }

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        assert_eq!(retry_delay(1), Duration::from_secs(60));
        assert_eq!(retry_delay(2), Duration::from_secs(120));
        assert_eq!(retry_delay(3), Duration::from_secs(240));
        assert_eq!(retry_delay(10), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(i32::MAX), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(0), Duration::from_secs(60));
    }

    #[test]
    fn test_next_step_gives_up_at_max_attempts() {
        assert_eq!(next_step(1, 5), RetryStep::Retry(Duration::from_secs(60)));
        assert_eq!(next_step(4, 5), RetryStep::Retry(Duration::from_secs(480)));
        assert_eq!(next_step(5, 5), RetryStep::GiveUp);
        assert_eq!(next_step(6, 5), RetryStep::GiveUp);
        assert_eq!(next_step(1, 1), RetryStep::GiveUp);
    }

    #[tokio::test]
    async fn test_send_document_attaches_rendered_pdf() {
        let mailer = MemoryMailer::default();
        let doc = sample_document(3);

        let message_id = send_document(&mailer, &doc).await.unwrap();
        assert_eq!(message_id, "<INV-20240315-101112123-9@memory>");

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let email = &sent[0];
        assert_eq!(email.to.as_str(), "buyer@shop.test");
        assert!(email.attachment.starts_with(b"%PDF-"));
        assert!(email.attachment_name.ends_with(".pdf"));
        assert!(email.attachment_name.contains("ORD-1710497472123-42"));
    }

    #[tokio::test]
    async fn test_attachment_falls_back_to_invoice_number() {
        let mailer = MemoryMailer::default();
        let mut doc = sample_document(1);
        doc.order_number = String::new();

        send_document(&mailer, &doc).await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert!(sent[0].attachment_name.contains("INV-20240315-101112123-9"));
    }

    #[tokio::test]
    async fn test_send_document_surfaces_mailer_error() {
        let mailer = MemoryMailer {
            fail_with: Some("buyer@shop.test".to_string()),
            ..MemoryMailer::default()
        };

        let err = send_document(&mailer, &sample_document(1)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Email(EmailError::InvalidAddress(_))));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }
}

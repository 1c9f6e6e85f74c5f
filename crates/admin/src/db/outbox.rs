//! Invoice email outbox.
//!
//! A row is written in the checkout transaction, so an invoice email exists
//! for exactly the orders that committed. Delivery happens afterwards and is
//! retried until it succeeds or runs out of attempts.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use backoffice_core::{CompanyCode, InvoiceId, OrderId, OutboxId, OutboxStatus};

use super::{RepositoryError, parse_column};
use crate::models::OutboxEntry;

const OUTBOX_COLUMNS: &str = "id, company_code, order_id, invoice_id, status, attempts, \
                              last_error, message_id, next_attempt_at, created_at, sent_at";

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: OutboxId,
    company_code: CompanyCode,
    order_id: OrderId,
    invoice_id: InvoiceId,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    message_id: Option<String>,
    next_attempt_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<OutboxRow> for OutboxEntry {
    type Error = RepositoryError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            company_code: row.company_code,
            order_id: row.order_id,
            invoice_id: row.invoice_id,
            status: parse_column(&row.status)?,
            attempts: row.attempts,
            last_error: row.last_error,
            message_id: row.message_id,
            next_attempt_at: row.next_attempt_at,
            created_at: row.created_at,
            sent_at: row.sent_at,
        })
    }
}

/// Queue an invoice email on the checkout transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn enqueue(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    order_id: OrderId,
    invoice_id: InvoiceId,
) -> Result<OutboxId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OutboxId>(
        r"
        INSERT INTO backoffice.invoice_email_outbox (company_code, order_id, invoice_id)
        VALUES ($1, $2, $3)
        RETURNING id
        ",
    )
    .bind(company_code)
    .bind(order_id)
    .bind(invoice_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Repository for outbox delivery bookkeeping.
pub struct OutboxRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OutboxRepository<'a> {
    /// Create a new outbox repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Claim up to `limit` due rows.
    ///
    /// Claimed rows have `next_attempt_at` pushed out by `lease`, so another
    /// worker will not pick them up while this one is sending. Rows locked by
    /// a concurrent claim are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim_due(
        &self,
        limit: i64,
        lease: Duration,
    ) -> Result<Vec<OutboxEntry>, RepositoryError> {
        let sql = format!(
            "UPDATE backoffice.invoice_email_outbox \
             SET next_attempt_at = now() + make_interval(secs => $2) \
             WHERE id IN ( \
                 SELECT id FROM backoffice.invoice_email_outbox \
                 WHERE status = $3 AND next_attempt_at <= now() \
                 ORDER BY next_attempt_at, id \
                 LIMIT $1 \
                 FOR UPDATE SKIP LOCKED) \
             RETURNING {OUTBOX_COLUMNS}"
        );
        let rows = sqlx::query_as::<_, OutboxRow>(&sql)
            .bind(limit)
            .bind(lease.as_secs_f64())
            .bind(OutboxStatus::Pending.as_str())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Claim one specific row if it is still pending and not held elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim_one(
        &self,
        id: OutboxId,
        lease: Duration,
    ) -> Result<Option<OutboxEntry>, RepositoryError> {
        let sql = format!(
            "UPDATE backoffice.invoice_email_outbox \
             SET next_attempt_at = now() + make_interval(secs => $2) \
             WHERE id IN ( \
                 SELECT id FROM backoffice.invoice_email_outbox \
                 WHERE id = $1 AND status = $3 AND next_attempt_at <= now() \
                 FOR UPDATE SKIP LOCKED) \
             RETURNING {OUTBOX_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OutboxRow>(&sql)
            .bind(id)
            .bind(lease.as_secs_f64())
            .bind(OutboxStatus::Pending.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_sent(&self, id: OutboxId, message_id: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE backoffice.invoice_email_outbox
            SET status = $2, attempts = attempts + 1, message_id = $3,
                last_error = NULL, sent_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(OutboxStatus::Sent.as_str())
        .bind(message_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt and schedule the next one after `delay`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_retry(
        &self,
        id: OutboxId,
        error: &str,
        delay: Duration,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE backoffice.invoice_email_outbox
            SET attempts = attempts + 1, last_error = $2,
                next_attempt_at = now() + make_interval(secs => $3)
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(error)
        .bind(delay.as_secs_f64())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Record the final failed attempt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_failed(&self, id: OutboxId, error: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE backoffice.invoice_email_outbox
            SET status = $2, attempts = attempts + 1, last_error = $3
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(OutboxStatus::Failed.as_str())
        .bind(error)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Outbox rows for an order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_order(
        &self,
        company_code: &CompanyCode,
        order_id: OrderId,
    ) -> Result<Vec<OutboxEntry>, RepositoryError> {
        let sql = format!(
            "SELECT {OUTBOX_COLUMNS} FROM backoffice.invoice_email_outbox \
             WHERE company_code = $1 AND order_id = $2 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OutboxRow>(&sql)
            .bind(company_code)
            .bind(order_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::{InvoiceMailer, OutboxWorker};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    outbox: OutboxWorker,
}

impl AppState {
    /// Build the state. `mailer` is `None` when SMTP is not configured.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool, mailer: Option<Arc<dyn InvoiceMailer>>) -> Self {
        let outbox = OutboxWorker::new(pool.clone(), mailer, config.outbox);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                outbox,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The invoice email outbox.
    #[must_use]
    pub fn outbox(&self) -> &OutboxWorker {
        &self.inner.outbox
    }
}

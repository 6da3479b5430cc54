use sqlx::{Pool, Postgres};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::AuditEntry;
use crate::db::log_repository::LogRepository;

/// Background worker draining the audit channel into `trabajos_log`.
pub struct AuditWorker {
    pool: Pool<Postgres>,
    rx: mpsc::Receiver<AuditEntry>,
}

impl AuditWorker {
    pub fn new(pool: Pool<Postgres>, rx: mpsc::Receiver<AuditEntry>) -> Self {
        Self { pool, rx }
    }

    /// Runs until every sender is gone and the queue is drained. Insert
    /// failures are logged and skipped; the request that queued the entry
    /// already finished.
    pub async fn run(mut self) {
        info!("Audit worker started");

        while let Some(entry) = self.rx.recv().await {
            debug!(
                trabajo_id = entry.trabajo_id,
                accion = entry.accion.as_str(),
                "Persisting audit entry"
            );
            if let Err(e) = LogRepository::insert(&self.pool, &entry).await {
                error!(
                    "Failed to persist audit entry for trabajo {}: {}",
                    entry.trabajo_id, e
                );
            }
        }

        info!("Audit channel closed, worker exiting");
    }
}

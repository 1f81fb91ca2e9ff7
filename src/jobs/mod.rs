//! Scheduled Jobs
//!
//! Periodic maintenance for the ledger database: expiring idempotency keys
//! and checking that no transaction was left without entries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;

use crate::config::Config;

// =========================================================================
// Expired Idempotency Key Deletion
// =========================================================================

/// Delete idempotency keys past their expiry (24 hours after creation).
/// Transactions they point to are kept.
pub async fn delete_expired_idempotency_keys(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        DELETE FROM idempotency_keys
        WHERE expires_at < NOW()
        "#,
    )
    .execute(pool)
    .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(rows_deleted, "Deleted expired idempotency keys");
    }

    Ok(rows_deleted)
}

// =========================================================================
// Ledger Integrity Check
// =========================================================================

/// Count transactions that have no entries.
///
/// Every unit of work writes its transaction and entries together, so any
/// hit here means the database was modified outside the ledger.
pub async fn count_transactions_without_entries(pool: &PgPool) -> Result<i64, JobError> {
    let orphaned: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM transactions t
        WHERE NOT EXISTS (
            SELECT 1 FROM transaction_entries e WHERE e.transaction_id = t.id
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if orphaned > 0 {
        tracing::warn!(orphaned, "Found transactions without entries");
    }

    Ok(orphaned)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for idempotency key maintenance (default: 1 hour)
    pub idempotency_maintenance_interval: Duration,
    /// Interval for the integrity check (default: 1 hour)
    pub integrity_check_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            idempotency_maintenance_interval: Duration::from_secs(3600),
            integrity_check_interval: Duration::from_secs(3600),
        }
    }
}

impl From<&Config> for JobSchedulerConfig {
    fn from(config: &Config) -> Self {
        Self {
            idempotency_maintenance_interval: config.maintenance_interval,
            integrity_check_interval: config.maintenance_interval,
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    pool: PgPool,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: JobSchedulerConfig::default(),
        }
    }

    pub fn with_config(pool: PgPool, config: JobSchedulerConfig) -> Self {
        Self { pool, config }
    }

    /// Start the job scheduler in the background.
    /// Abort the returned handle to stop it.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!(
            idempotency_interval_secs = self.config.idempotency_maintenance_interval.as_secs(),
            integrity_interval_secs = self.config.integrity_check_interval.as_secs(),
            "Job scheduler started"
        );

        let mut idempotency_interval = interval(self.config.idempotency_maintenance_interval);
        let mut integrity_interval = interval(self.config.integrity_check_interval);

        loop {
            tokio::select! {
                _ = idempotency_interval.tick() => {
                    if let Err(e) = delete_expired_idempotency_keys(&self.pool).await {
                        tracing::error!(error = %e, "Idempotency key deletion failed");
                    }
                }
                _ = integrity_interval.tick() => {
                    if let Err(e) = count_transactions_without_entries(&self.pool).await {
                        tracing::error!(error = %e, "Integrity check failed");
                    }
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match delete_expired_idempotency_keys(&self.pool).await {
            Ok(count) => report.idempotency_keys_deleted = count,
            Err(e) => report.errors.push(format!("Idempotency deletion: {}", e)),
        }

        match count_transactions_without_entries(&self.pool).await {
            Ok(count) => report.transactions_without_entries = count,
            Err(e) => report.errors.push(format!("Integrity check: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub idempotency_keys_deleted: u64,
    pub transactions_without_entries: i64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl MaintenanceReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.transactions_without_entries == 0
    }
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =========================================================================
// Tests
// =========================================================================

//! Transaction Ledger
//!
//! Records transactions and their entries. Every write runs as one unit of
//! work (a database transaction bounded by a deadline) and either commits
//! completely or leaves no trace: no transaction row, no entries, no
//! category created on the way.

mod query;
mod single_entry;
mod transfer;


pub use query::DEFAULT_RECENT_LIMIT;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::balance::BalanceCalculator;
use crate::config::Config;
use crate::error::{LedgerError, LedgerResult};
use crate::idempotency::IdempotencyRepository;
use crate::store::{AccountRepository, CategoryResolver, UserRepository};

/// Deadline applied when none is configured
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Ledger engine facade
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: PgPool,
    users: UserRepository,
    accounts: AccountRepository,
    categories: CategoryResolver,
    balances: BalanceCalculator,
    idempotency: IdempotencyRepository,
    deadline: Duration,
}

impl Ledger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            accounts: AccountRepository::new(pool.clone()),
            categories: CategoryResolver::new(pool.clone()),
            balances: BalanceCalculator::new(pool.clone()),
            idempotency: IdempotencyRepository::new(pool.clone()),
            pool,
            deadline: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Build a ledger using the configured operation deadline
    pub fn from_config(pool: PgPool, config: &Config) -> Self {
        Self::new(pool).with_deadline(config.operation_timeout)
    }

    /// Override the deadline of every unit of work
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn accounts(&self) -> &AccountRepository {
        &self.accounts
    }

    pub fn categories(&self) -> &CategoryResolver {
        &self.categories
    }

    pub fn balances(&self) -> &BalanceCalculator {
        &self.balances
    }

    pub fn idempotency(&self) -> &IdempotencyRepository {
        &self.idempotency
    }

    /// Run a whole ledger operation (lookups and unit of work) under the
    /// deadline. On expiry the work future is dropped, which rolls back any
    /// open transaction.
    async fn within_deadline<T, F>(&self, operation: &'static str, work: F) -> LedgerResult<T>
    where
        F: Future<Output = LedgerResult<T>>,
    {
        match tokio::time::timeout(self.deadline, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Unit of work exceeded its deadline and was rolled back"
                );
                Err(LedgerError::Internal(format!(
                    "{} exceeded its deadline of {}ms",
                    operation,
                    self.deadline.as_millis()
                )))
            }
        }
    }
}

/// Entry to append inside a unit of work
struct NewEntry<'a> {
    transaction_id: i64,
    account_id: i64,
    category_id: Option<i64>,
    amount: i64,
    description: Option<&'a str>,
}

async fn insert_transaction(
    conn: &mut PgConnection,
    user_id: i64,
    occurred_at: DateTime<Utc>,
) -> LedgerResult<i64> {
    let transaction_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO transactions (user_id, occurred_at)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(occurred_at)
    .fetch_one(conn)
    .await?;

    Ok(transaction_id)
}

/// Append-only: entries are inserted, never updated or deleted
async fn append_entry(conn: &mut PgConnection, entry: &NewEntry<'_>) -> LedgerResult<i64> {
    let entry_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO transaction_entries (transaction_id, account_id, category_id, amount, description)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(entry.transaction_id)
    .bind(entry.account_id)
    .bind(entry.category_id)
    .bind(entry.amount)
    .bind(entry.description)
    .fetch_one(conn)
    .await?;

    Ok(entry_id)
}

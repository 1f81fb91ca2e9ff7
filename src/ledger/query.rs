//! Read-only projections over committed ledger data

use chrono::{DateTime, Utc};

use crate::domain::{CategoryType, RecentEntry, Transaction, TransactionEntry};
use crate::error::{LedgerError, LedgerResult};

use super::Ledger;

/// Limit callers should apply when the requester gives none
pub const DEFAULT_RECENT_LIMIT: i64 = 20;

type RecentEntryRow = (
    i64,
    DateTime<Utc>,
    String,
    Option<String>,
    Option<String>,
    i64,
    Option<String>,
);

fn recent_entry_from_row(
    (transaction_id, occurred_at, account_name, category_name, category_type, amount, description): RecentEntryRow,
) -> LedgerResult<RecentEntry> {
    let category_type = category_type
        .map(|t| t.parse::<CategoryType>())
        .transpose()
        .map_err(|e| LedgerError::Internal(format!("transaction {}: {}", transaction_id, e)))?;

    Ok(RecentEntry {
        transaction_id,
        occurred_at,
        account_name,
        category_name,
        category_type,
        amount,
        description,
    })
}

impl Ledger {
    /// Most recent entries of a user across all accounts, newest first.
    ///
    /// `limit` must be positive; defaulting is the caller's job
    /// (see [`DEFAULT_RECENT_LIMIT`]).
    pub async fn recent_entries(&self, user_id: i64, limit: i64) -> LedgerResult<Vec<RecentEntry>> {
        if limit <= 0 {
            return Err(LedgerError::InvalidData(format!(
                "limit must be greater than zero (got {})",
                limit
            )));
        }

        let user = self.users.get_by_id(user_id).await?;

        let rows: Vec<RecentEntryRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.occurred_at, a.name, c.name, c.type, e.amount, e.description
            FROM transaction_entries e
            JOIN transactions t ON t.id = e.transaction_id
            JOIN accounts a ON a.id = e.account_id
            LEFT JOIN categories c ON c.id = e.category_id
            WHERE t.user_id = $1
            ORDER BY t.occurred_at DESC, e.id DESC
            LIMIT $2
            "#,
        )
        .bind(user.id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(recent_entry_from_row).collect()
    }

    /// Load one transaction; fails with `NotFound` unless it belongs to the user
    pub async fn get_transaction(
        &self,
        user_id: i64,
        transaction_id: i64,
    ) -> LedgerResult<Transaction> {
        let user = self.users.get_by_id(user_id).await?;

        let row: Option<(i64, i64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT id, user_id, occurred_at, created_at
            FROM transactions
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(transaction_id)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, user_id, occurred_at, created_at)| Transaction {
            id,
            user_id,
            occurred_at,
            created_at,
        })
        .ok_or_else(|| LedgerError::NotFound(format!("transaction {} not found", transaction_id)))
    }

    /// Entries of one transaction, in insertion order.
    ///
    /// Fails with `NotFound` unless the transaction belongs to the user.
    pub async fn entries_for_transaction(
        &self,
        user_id: i64,
        transaction_id: i64,
    ) -> LedgerResult<Vec<TransactionEntry>> {
        let transaction = self.get_transaction(user_id, transaction_id).await?;

        let rows: Vec<(i64, i64, i64, Option<i64>, i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT id, transaction_id, account_id, category_id, amount, description
            FROM transaction_entries
            WHERE transaction_id = $1
            ORDER BY id
            "#,
        )
        .bind(transaction.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, transaction_id, account_id, category_id, amount, description)| {
                    TransactionEntry {
                        id,
                        transaction_id,
                        account_id,
                        category_id,
                        amount,
                        description,
                    }
                },
            )
            .collect())
    }
}

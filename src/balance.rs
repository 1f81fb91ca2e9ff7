//! Balance Calculator
//!
//! The only source of "current balance": initial balance plus the signed sum
//! of committed entries. Nothing is cached, so there is nothing to
//! invalidate when entries are appended.

use sqlx::{PgConnection, PgPool};

use crate::domain::{Account, User};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{account_from_row, AccountRow};

/// Derives account balances from transaction entries
#[derive(Debug, Clone)]
pub struct BalanceCalculator {
    pool: PgPool,
}

impl BalanceCalculator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current balance of `account`, from committed entries only
    pub async fn balance_of(&self, account: &Account) -> LedgerResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::balance_in(&mut *conn, account).await
    }

    /// Every account of `user` with its current balance, in one query
    pub async fn balances_for_user(&self, user: &User) -> LedgerResult<Vec<(Account, i64)>> {
        let rows: Vec<(i64, i64, String, String, i64, chrono::DateTime<chrono::Utc>, i64)> =
            sqlx::query_as(
                r#"
                SELECT a.id, a.user_id, a.name, a.currency, a.initial_balance, a.created_at,
                       (a.initial_balance + COALESCE(SUM(e.amount), 0))::BIGINT
                FROM accounts a
                LEFT JOIN transaction_entries e ON e.account_id = a.id
                WHERE a.user_id = $1
                GROUP BY a.id
                ORDER BY a.id
                "#,
            )
            .bind(user.id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, name, currency, initial_balance, created_at, balance)| {
                let row: AccountRow = (id, user_id, name, currency, initial_balance, created_at);
                (account_from_row(row), balance)
            })
            .collect())
    }

    /// Balance read on the given connection. Inside a unit of work this sees
    /// the work's own uncommitted entries plus everything committed before
    /// the statement started.
    pub(crate) async fn balance_in(conn: &mut PgConnection, account: &Account) -> LedgerResult<i64> {
        let entries_total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT
            FROM transaction_entries
            WHERE account_id = $1
            "#,
        )
        .bind(account.id)
        .fetch_one(conn)
        .await?;

        derive_balance(account.initial_balance, entries_total).ok_or_else(|| {
            LedgerError::Internal(format!("balance of account {} overflows", account.id))
        })
    }
}

fn derive_balance(initial_balance: i64, entries_total: i64) -> Option<i64> {
    initial_balance.checked_add(entries_total)
}

//! Atomic two-entry transfer between accounts of one user

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::balance::BalanceCalculator;
use crate::db;
use crate::domain::{Account, Amount, TransferCommand, User};
use crate::error::{LedgerError, LedgerResult};
use crate::idempotency::IdempotencyRepository;
use crate::store::AccountRepository;

use super::{append_entry, insert_transaction, Ledger, NewEntry};

/// Everything a transfer needs once its preconditions hold
struct TransferPlan<'a> {
    user: &'a User,
    from: &'a Account,
    to: &'a Account,
    amount: Amount,
    occurred_at: DateTime<Utc>,
    description: &'a str,
    idempotency: Option<(Uuid, &'a str)>,
}

impl Ledger {
    /// Move `amount` from one account to another.
    ///
    /// Preconditions are checked before any write. The source balance is read
    /// under the source account's row lock, so two transfers draining the
    /// same account are serialized and the second one sees the first one's
    /// debit. The debit and credit entries always sum to zero. The deadline
    /// covers the user and account lookups as well.
    pub async fn transfer(&self, command: TransferCommand) -> LedgerResult<i64> {
        if command.from_account.trim() == command.to_account.trim() {
            return Err(LedgerError::InvalidData("accounts must be different".to_string()));
        }
        let amount = Amount::new(command.amount)?;

        self.within_deadline("transfer", self.checked_transfer(command, amount))
            .await
    }

    async fn checked_transfer(&self, command: TransferCommand, amount: Amount) -> LedgerResult<i64> {
        let user = self.users.get_by_id(command.user_id).await?;
        let from = self.accounts.get_by_name(&user, &command.from_account).await?;
        let to = self.accounts.get_by_name(&user, &command.to_account).await?;

        if from.currency != to.currency {
            return Err(LedgerError::InvalidData(format!(
                "cannot transfer between {} and {} accounts",
                from.currency, to.currency
            )));
        }

        let description = command.effective_description();
        let request_hash = match command.idempotency_key {
            Some(_) => Some(IdempotencyRepository::hash_command(&command)?),
            None => None,
        };

        let plan = TransferPlan {
            user: &user,
            from: &from,
            to: &to,
            amount,
            occurred_at: command.occurred_at,
            description: &description,
            idempotency: command.idempotency_key.zip(request_hash.as_deref()),
        };

        self.try_transfer(plan).await
    }

    async fn try_transfer(&self, plan: TransferPlan<'_>) -> LedgerResult<i64> {
        let mut tx = db::begin_unit_of_work(&self.pool, self.deadline).await?;

        if let Some((key, hash)) = plan.idempotency {
            if let Some(existing) =
                IdempotencyRepository::find_in(&mut *tx, plan.user.id, key, hash).await?
            {
                tracing::info!(
                    transaction_id = existing,
                    idempotency_key = %key,
                    "Replayed transfer"
                );
                return Ok(existing);
            }
        }

        AccountRepository::lock_for_update(&mut *tx, plan.from).await?;
        let available = BalanceCalculator::balance_in(&mut *tx, plan.from).await?;

        if !plan.amount.is_covered_by(available) {
            tracing::info!(
                user_id = plan.user.id,
                account = %plan.from.name,
                required = plan.amount.value(),
                available,
                "Transfer rejected: insufficient balance"
            );
            return Err(LedgerError::insufficient_balance(plan.amount.value(), available));
        }

        let transaction_id = insert_transaction(&mut *tx, plan.user.id, plan.occurred_at).await?;

        append_entry(
            &mut *tx,
            &NewEntry {
                transaction_id,
                account_id: plan.from.id,
                category_id: None,
                amount: plan.amount.negated(),
                description: Some(plan.description),
            },
        )
        .await?;

        append_entry(
            &mut *tx,
            &NewEntry {
                transaction_id,
                account_id: plan.to.id,
                category_id: None,
                amount: plan.amount.value(),
                description: Some(plan.description),
            },
        )
        .await?;

        if let Some((key, hash)) = plan.idempotency {
            IdempotencyRepository::record_in(&mut *tx, plan.user.id, key, hash, transaction_id)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            transaction_id,
            user_id = plan.user.id,
            from = %plan.from.name,
            to = %plan.to.name,
            amount = plan.amount.value(),
            "Transfer committed"
        );

        Ok(transaction_id)
    }
}

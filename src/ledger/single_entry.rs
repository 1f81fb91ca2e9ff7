//! Single-entry recording (income and expenses)

use crate::db;
use crate::domain::{Account, Amount, Category, EntryCategory, RecordEntryCommand, User};
use crate::error::{LedgerError, LedgerResult};
use crate::idempotency::IdempotencyRepository;
use crate::store::CategoryResolver;

use super::{append_entry, insert_transaction, Ledger, NewEntry};

impl Ledger {
    /// Record one categorised entry against an account.
    ///
    /// The category is resolved (and created on first use) inside the same
    /// unit of work, so a failed recording leaves no new category behind.
    /// The deadline covers the user and account lookups as well.
    /// Returns the new transaction id.
    pub async fn record_single_entry(&self, command: RecordEntryCommand) -> LedgerResult<i64> {
        if command.amount == 0 {
            return Err(LedgerError::InvalidData("amount must not be zero".to_string()));
        }
        Amount::from_signed(command.amount)?;

        self.within_deadline("record_single_entry", self.checked_single_entry(command))
            .await
    }

    async fn checked_single_entry(&self, command: RecordEntryCommand) -> LedgerResult<i64> {
        let user = self.users.get_by_id(command.user_id).await?;
        let account = self.accounts.get_by_name(&user, &command.account_name).await?;

        if let EntryCategory::Resolved(category) = &command.category {
            if category.user_id != user.id {
                return Err(LedgerError::NotFound(format!(
                    "category {} not found",
                    category.id
                )));
            }
        }

        let request_hash = match command.idempotency_key {
            Some(_) => Some(IdempotencyRepository::hash_command(&command)?),
            None => None,
        };

        self.try_record_single_entry(&user, &account, &command, request_hash.as_deref())
            .await
    }

    async fn try_record_single_entry(
        &self,
        user: &User,
        account: &Account,
        command: &RecordEntryCommand,
        request_hash: Option<&str>,
    ) -> LedgerResult<i64> {
        let mut tx = db::begin_unit_of_work(&self.pool, self.deadline).await?;

        let idempotency = command.idempotency_key.zip(request_hash);
        if let Some((key, hash)) = idempotency {
            if let Some(existing) =
                IdempotencyRepository::find_in(&mut *tx, user.id, key, hash).await?
            {
                tracing::info!(
                    transaction_id = existing,
                    idempotency_key = %key,
                    "Replayed single entry"
                );
                return Ok(existing);
            }
        }

        let category: Category = match &command.category {
            EntryCategory::Resolved(category) => {
                CategoryResolver::get_in(&mut *tx, user.id, category.id).await?
            }
            EntryCategory::Named {
                name,
                category_type,
            } => CategoryResolver::resolve_in(&mut *tx, user.id, name, *category_type).await?,
        };

        let transaction_id = insert_transaction(&mut *tx, user.id, command.occurred_at).await?;

        let description = command
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        append_entry(
            &mut *tx,
            &NewEntry {
                transaction_id,
                account_id: account.id,
                category_id: Some(category.id),
                amount: command.amount,
                description,
            },
        )
        .await?;

        if let Some((key, hash)) = idempotency {
            IdempotencyRepository::record_in(&mut *tx, user.id, key, hash, transaction_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            transaction_id,
            user_id = user.id,
            account = %account.name,
            category = %category.name,
            category_type = %category.category_type,
            amount = command.amount,
            "Single entry recorded"
        );

        Ok(transaction_id)
    }
}

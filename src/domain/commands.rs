//! Command definitions
//!
//! Commands represent intentions to append to the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, CategoryType};

/// Description stored on both legs of a transfer when the caller gives none
pub const DEFAULT_TRANSFER_DESCRIPTION: &str = "Account transfer";

/// How a single entry names its category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryCategory {
    /// Already resolved by the caller
    Resolved(Category),
    /// Resolved (and created on first use) inside the unit of work
    Named {
        name: String,
        category_type: CategoryType,
    },
}

impl EntryCategory {
    pub fn named(name: impl Into<String>, category_type: CategoryType) -> Self {
        Self::Named {
            name: name.into(),
            category_type,
        }
    }
}

// =========================================================================
// RecordEntryCommand
// =========================================================================

/// Command to record one categorised entry (income or expense)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEntryCommand {
    pub user_id: i64,
    pub account_name: String,
    pub category: EntryCategory,
    /// Signed amount in minor units (negative = outflow)
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
    pub idempotency_key: Option<Uuid>,
}

impl RecordEntryCommand {
    pub fn new(
        user_id: i64,
        account_name: impl Into<String>,
        category: EntryCategory,
        amount: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            account_name: account_name.into(),
            category,
            amount,
            occurred_at,
            description: None,
            idempotency_key: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: Uuid) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move money between two accounts of the same user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub user_id: i64,
    pub from_account: String,
    pub to_account: String,
    /// Amount in minor units, validated as strictly positive
    pub amount: i64,
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
    pub idempotency_key: Option<Uuid>,
}

impl TransferCommand {
    pub fn new(
        user_id: i64,
        from_account: impl Into<String>,
        to_account: impl Into<String>,
        amount: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount,
            occurred_at,
            description: None,
            idempotency_key: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: Uuid) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    /// Description for both legs, falling back to the default when blank
    pub fn effective_description(&self) -> String {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_TRANSFER_DESCRIPTION)
            .to_string()
    }
}

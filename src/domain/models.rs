//! Ledger records
//!
//! Plain data read from and written to the store. Balances are not stored on
//! `Account`; see `BalanceCalculator`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity holder that owns accounts, categories and transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Named money container, unique by name per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub currency: String,
    /// Opening balance in minor units (may be negative)
    pub initial_balance: i64,
    pub created_at: DateTime<Utc>,
}

/// Category type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryType {
    Income,
    Expense,
    Transfer,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "INCOME",
            CategoryType::Expense => "EXPENSE",
            CategoryType::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown category type string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category type: {0}")]
pub struct UnknownCategoryType(pub String);

impl FromStr for CategoryType {
    type Err = UnknownCategoryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(CategoryType::Income),
            "EXPENSE" => Ok(CategoryType::Expense),
            "TRANSFER" => Ok(CategoryType::Transfer),
            _ => Err(UnknownCategoryType(s.to_string())),
        }
    }
}

/// Label for classifying entries, unique by (user, name, type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub category_type: CategoryType,
    pub created_at: DateTime<Utc>,
}

/// Logical financial event; its amount lives on its entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One signed amount posted against one account.
/// Positive = credit/inflow, negative = debit/outflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub id: i64,
    pub transaction_id: i64,
    pub account_id: i64,
    /// Transfers carry no category
    pub category_id: Option<i64>,
    pub amount: i64,
    pub description: Option<String>,
}

/// Row of the recent-activity projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub transaction_id: i64,
    pub occurred_at: DateTime<Utc>,
    pub account_name: String,
    pub category_name: Option<String>,
    pub category_type: Option<CategoryType>,
    pub amount: i64,
    pub description: Option<String>,
}

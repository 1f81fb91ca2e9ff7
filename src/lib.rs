//! koin ledger library
//!
//! Per-user personal finance ledger: accounts, categories, income and
//! expense entries, and atomic transfers on PostgreSQL.

pub mod balance;
pub mod config;
pub mod db;
pub mod domain;
pub mod idempotency;
pub mod jobs;
pub mod ledger;
pub mod store;

mod error;

pub use balance::BalanceCalculator;
pub use config::{Config, LogFormat};
pub use domain::{
    Account, Amount, AmountError, Category, CategoryType, EntryCategory, RecentEntry,
    RecordEntryCommand, Transaction, TransactionEntry, TransferCommand, User,
};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{Ledger, DEFAULT_RECENT_LIMIT};
pub use store::{AccountRepository, CategoryResolver, UserRepository};

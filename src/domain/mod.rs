//! Domain module
//!
//! Core ledger types: amounts, records and commands.

pub mod amount;
pub mod commands;
pub mod models;

pub use amount::{check_bounds, Amount, AmountError};
pub use commands::{EntryCategory, RecordEntryCommand, TransferCommand, DEFAULT_TRANSFER_DESCRIPTION};
pub use models::{
    Account, Category, CategoryType, RecentEntry, Transaction, TransactionEntry,
    UnknownCategoryType, User,
};

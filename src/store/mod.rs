//! Store module
//!
//! Repositories for users, accounts and categories. Each holds a pool for
//! standalone calls; the `*_in` functions run on a caller-supplied
//! connection so the ledger can use them inside its unit of work.

mod account;
mod category;
mod user;

pub use account::AccountRepository;
pub use category::CategoryResolver;
pub use user::UserRepository;

pub(crate) use account::{account_from_row, AccountRow};

use crate::error::LedgerError;

/// Trimmed, non-empty name or `InvalidData`
fn normalize_name<'a>(what: &str, name: &'a str) -> Result<&'a str, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidData(format!("{} name must not be empty", what)));
    }
    Ok(trimmed)
}

/// Classify an insert failure, replacing the storage message of a uniqueness
/// violation with one naming the duplicate.
fn classify_insert_error(err: sqlx::Error, duplicate: impl FnOnce() -> String) -> LedgerError {
    match LedgerError::from(err) {
        LedgerError::Conflict(_) => LedgerError::Conflict(duplicate()),
        other => other,
    }
}

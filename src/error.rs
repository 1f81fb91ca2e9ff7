//! Error handling module
//!
//! Closed set of ledger error kinds. Storage errors are classified here so
//! callers never see a storage-specific error kind.

use crate::domain::AmountError;

/// Ledger-wide Result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger error kinds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    // Lookup failures
    #[error("not found: {0}")]
    NotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Uniqueness violation (account name, category triple, user email,
    /// idempotency key)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller-supplied arguments violate a precondition
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Business-rule abort of a transfer
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    // Storage/connectivity failure or deadline expiry
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Create an insufficient balance error
    pub fn insufficient_balance(required: i64, available: i64) -> Self {
        Self::InsufficientBalance { required, available }
    }

    /// Stable machine-readable code for presentation layers
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::UserNotFound(_) => "user_not_found",
            Self::AccountNotFound(_) => "account_not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidData(_) => "invalid_data",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::Internal(_) => "internal",
        }
    }

    /// Check if this is any of the lookup failures
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::UserNotFound(_) | Self::AccountNotFound(_)
        )
    }

    /// Check if this is a conflict error (re-resolving may help)
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => LedgerError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                LedgerError::Conflict(db_err.message().to_string())
            }
            _ => {
                tracing::error!(error = ?err, "Storage failure");
                LedgerError::Internal(err.to_string())
            }
        }
    }
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        LedgerError::InvalidData(err.to_string())
    }
}

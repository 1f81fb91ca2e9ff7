//! Idempotency module
//!
//! Prevents duplicate ledger transactions on retried requests.

mod repository;

pub use repository::{IdempotencyKey, IdempotencyRepository};

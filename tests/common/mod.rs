//! Common test utilities
//!
//! Integration tests need a PostgreSQL database in `DATABASE_URL`. When it is
//! unset they return early. Each test works under its own freshly created
//! user, so tests never truncate tables and can run in parallel.

#![allow(dead_code)]

use koin_ledger::{Account, Ledger, User};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to the test database and apply migrations
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping database test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    koin_ledger::db::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Create a user with a unique email
pub async fn create_user(ledger: &Ledger) -> User {
    let email = format!("test-{}@koin.test", uuid::Uuid::new_v4());
    ledger
        .users()
        .create(&email, "test-credential")
        .await
        .expect("Failed to create user")
}

/// Create an account in USD
pub async fn create_account(ledger: &Ledger, user: &User, name: &str, initial: i64) -> Account {
    ledger
        .accounts()
        .create(user, name, "USD", initial)
        .await
        .expect("Failed to create account")
}

/// Current balance of an account
pub async fn balance(ledger: &Ledger, account: &Account) -> i64 {
    ledger
        .balances()
        .balance_of(account)
        .await
        .expect("Failed to read balance")
}

/// Number of transactions recorded for a user
pub async fn transaction_count(pool: &PgPool, user: &User) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(pool)
        .await
        .expect("Failed to count transactions")
}

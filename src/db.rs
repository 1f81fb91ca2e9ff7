//! Database module
//!
//! Pool construction, migrations and the unit-of-work helper every ledger
//! write runs inside.

use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use crate::config::Config;

/// Bundled schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Relations the ledger reads and writes
const REQUIRED_TABLES: [&str; 6] = [
    "users",
    "accounts",
    "categories",
    "transactions",
    "transaction_entries",
    "idempotency_keys",
];

/// Create the connection pool from configuration
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
}

/// Apply bundled migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}

/// Open a unit of work: one database transaction whose statements are
/// cancelled server-side once `deadline` has elapsed.
///
/// Dropping the returned transaction without committing rolls it back.
pub async fn begin_unit_of_work(
    pool: &PgPool,
    deadline: Duration,
) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    // SET does not accept bind parameters
    let statement = format!("SET LOCAL statement_timeout = {}", deadline.as_millis().max(1));
    sqlx::query(&statement).execute(&mut *tx).await?;

    Ok(tx)
}

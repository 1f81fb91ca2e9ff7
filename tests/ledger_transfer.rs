//! Integration tests for transfers

use std::time::Duration;

use chrono::Utc;
use koin_ledger::domain::DEFAULT_TRANSFER_DESCRIPTION;
use koin_ledger::{Ledger, LedgerError, TransferCommand};
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_transfer_end_to_end() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = Ledger::new(pool);
    let user = common::create_user(&ledger).await;
    let a = common::create_account(&ledger, &user, "A", 10_000).await;
    let b = common::create_account(&ledger, &user, "B", 0).await;

    let tx_id = ledger
        .transfer(TransferCommand::new(user.id, "A", "B", 3_000, Utc::now()))
        .await
        .unwrap();

    assert_eq!(common::balance(&ledger, &a).await, 7_000);
    assert_eq!(common::balance(&ledger, &b).await, 3_000);

    let entries = ledger.entries_for_transaction(user.id, tx_id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.iter().map(|e| e.amount).sum::<i64>(), 0);
    assert_eq!(entries[0].account_id, a.id);
    assert_eq!(entries[0].amount, -3_000);
    assert_eq!(entries[1].account_id, b.id);
    assert_eq!(entries[1].amount, 3_000);
    for entry in &entries {
        assert_eq!(entry.category_id, None);
        assert_eq!(entry.description.as_deref(), Some(DEFAULT_TRANSFER_DESCRIPTION));
    }

    let err = ledger
        .transfer(TransferCommand::new(user.id, "A", "B", 8_000, Utc::now()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientBalance {
            required: 8_000,
            available: 7_000
        }
    );

    assert_eq!(common::balance(&ledger, &a).await, 7_000);
    assert_eq!(common::balance(&ledger, &b).await, 3_000);
}

#[tokio::test]
async fn test_transfer_exact_balance_boundary() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = Ledger::new(pool.clone());
    let user = common::create_user(&ledger).await;
    let a = common::create_account(&ledger, &user, "A", 500).await;
    let b = common::create_account(&ledger, &user, "B", 0).await;

    let err = ledger
        .transfer(TransferCommand::new(user.id, "A", "B", 501, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert_eq!(common::transaction_count(&pool, &user).await, 0);

    ledger
        .transfer(TransferCommand::new(user.id, "A", "B", 500, Utc::now()))
        .await
        .unwrap();
    assert_eq!(common::balance(&ledger, &a).await, 0);
    assert_eq!(common::balance(&ledger, &b).await, 500);
}

#[tokio::test]
async fn test_transfer_custom_description() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = Ledger::new(pool);
    let user = common::create_user(&ledger).await;
    common::create_account(&ledger, &user, "A", 100).await;
    common::create_account(&ledger, &user, "B", 0).await;

    let tx_id = ledger
        .transfer(
            TransferCommand::new(user.id, "A", "B", 40, Utc::now())
                .with_description("Rent share"),
        )
        .await
        .unwrap();

    let transaction = ledger.get_transaction(user.id, tx_id).await.unwrap();
    assert_eq!(transaction.user_id, user.id);

    let entries = ledger.entries_for_transaction(user.id, tx_id).await.unwrap();
    assert!(entries
        .iter()
        .all(|e| e.description.as_deref() == Some("Rent share")));
}

#[tokio::test]
async fn test_transfer_precondition_failures_write_nothing() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = Ledger::new(pool.clone());
    let user = common::create_user(&ledger).await;
    common::create_account(&ledger, &user, "A", 1_000).await;
    common::create_account(&ledger, &user, "B", 0).await;
    ledger
        .accounts()
        .create(&user, "Euro", "EUR", 0)
        .await
        .unwrap();

    let err = ledger
        .transfer(TransferCommand::new(-1, "A", "B", 10, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UserNotFound(_)));

    let err = ledger
        .transfer(TransferCommand::new(user.id, "A", "Missing", 10, Utc::now()))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::AccountNotFound("Missing".to_string()));

    let err = ledger
        .transfer(TransferCommand::new(user.id, "A", "A", 10, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidData(_)));

    let err = ledger
        .transfer(TransferCommand::new(user.id, "A", "B", 0, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidData(_)));

    let err = ledger
        .transfer(TransferCommand::new(user.id, "A", "Euro", 10, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidData(_)));

    assert_eq!(common::transaction_count(&pool, &user).await, 0);
}

#[tokio::test]
async fn test_transfer_idempotent_replay() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = Ledger::new(pool.clone());
    let user = common::create_user(&ledger).await;
    let a = common::create_account(&ledger, &user, "A", 1_000).await;
    common::create_account(&ledger, &user, "B", 0).await;

    let key = Uuid::new_v4();
    let occurred_at = Utc::now();
    let cmd = TransferCommand::new(user.id, "A", "B", 250, occurred_at).with_idempotency_key(key);

    let first = ledger.transfer(cmd.clone()).await.unwrap();
    let second = ledger.transfer(cmd).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(common::transaction_count(&pool, &user).await, 1);
    assert_eq!(common::balance(&ledger, &a).await, 750);

    let stored = ledger.idempotency().get(user.id, key).await.unwrap().unwrap();
    assert_eq!(stored.transaction_id, first);

    // Same key, different request
    let err = ledger
        .transfer(
            TransferCommand::new(user.id, "A", "B", 300, occurred_at).with_idempotency_key(key),
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(common::transaction_count(&pool, &user).await, 1);
}

#[tokio::test]
async fn test_expired_idempotency_key_is_reusable() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = Ledger::new(pool.clone());
    let user = common::create_user(&ledger).await;
    let a = common::create_account(&ledger, &user, "A", 1_000).await;
    common::create_account(&ledger, &user, "B", 0).await;

    let key = Uuid::new_v4();
    let first = ledger
        .transfer(TransferCommand::new(user.id, "A", "B", 100, Utc::now()).with_idempotency_key(key))
        .await
        .unwrap();

    sqlx::query(
        "UPDATE idempotency_keys SET expires_at = NOW() - INTERVAL '1 hour' WHERE user_id = $1 AND key = $2",
    )
    .bind(user.id)
    .bind(key)
    .execute(&pool)
    .await
    .unwrap();

    // A different request under the expired key is a fresh transfer
    let retry = TransferCommand::new(user.id, "A", "B", 250, Utc::now()).with_idempotency_key(key);
    let second = ledger.transfer(retry.clone()).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(common::transaction_count(&pool, &user).await, 2);
    assert_eq!(common::balance(&ledger, &a).await, 650);

    let stored = ledger.idempotency().get(user.id, key).await.unwrap().unwrap();
    assert_eq!(stored.transaction_id, second);
    assert!(stored.expires_at > Utc::now());

    // The renewed key replays the new transfer
    assert_eq!(ledger.transfer(retry).await, Ok(second));
    assert_eq!(common::transaction_count(&pool, &user).await, 2);
}

#[tokio::test]
async fn test_transfer_failure_midway_rolls_back() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = Ledger::new(pool.clone());
    let user = common::create_user(&ledger).await;
    let a = common::create_account(&ledger, &user, "A", 1_000).await;
    let b = common::create_account(&ledger, &user, "B", 0).await;

    // Fails the credit leg only, after the transaction row and debit exist
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION koin_test_fail_credit() RETURNS trigger AS $$
        BEGIN
            IF NEW.description = 'fault-injection' AND NEW.amount > 0 THEN
                RAISE EXCEPTION 'injected failure';
            END IF;
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("DROP TRIGGER IF EXISTS koin_test_fail_credit ON transaction_entries")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        r#"
        CREATE TRIGGER koin_test_fail_credit
        BEFORE INSERT ON transaction_entries
        FOR EACH ROW EXECUTE FUNCTION koin_test_fail_credit()
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let result = ledger
        .transfer(
            TransferCommand::new(user.id, "A", "B", 400, Utc::now())
                .with_description("fault-injection"),
        )
        .await;

    sqlx::query("DROP TRIGGER IF EXISTS koin_test_fail_credit ON transaction_entries")
        .execute(&pool)
        .await
        .unwrap();

    let err = result.unwrap_err();
    assert!(matches!(err, LedgerError::Internal(_)), "got {:?}", err);

    assert_eq!(common::transaction_count(&pool, &user).await, 0);
    assert_eq!(common::balance(&ledger, &a).await, 1_000);
    assert_eq!(common::balance(&ledger, &b).await, 0);
}

#[tokio::test]
async fn test_transfer_deadline_rolls_back() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = Ledger::new(pool.clone()).with_deadline(Duration::from_millis(200));
    let user = common::create_user(&ledger).await;
    let a = common::create_account(&ledger, &user, "A", 1_000).await;
    common::create_account(&ledger, &user, "B", 0).await;

    // Hold the source row lock so the transfer cannot make progress
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(a.id)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let err = ledger
        .transfer(TransferCommand::new(user.id, "A", "B", 100, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Internal(_)), "got {:?}", err);

    blocker.rollback().await.unwrap();

    assert_eq!(common::transaction_count(&pool, &user).await, 0);
    assert_eq!(common::balance(&ledger, &a).await, 1_000);
}

#[tokio::test]
async fn test_entries_for_foreign_transaction_not_found() {
    let Some(pool) = common::setup_test_db().await else { return };
    let ledger = Ledger::new(pool);
    let owner = common::create_user(&ledger).await;
    let stranger = common::create_user(&ledger).await;
    common::create_account(&ledger, &owner, "A", 100).await;
    common::create_account(&ledger, &owner, "B", 0).await;

    let tx_id = ledger
        .transfer(TransferCommand::new(owner.id, "A", "B", 10, Utc::now()))
        .await
        .unwrap();

    let err = ledger
        .entries_for_transaction(stranger.id, tx_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

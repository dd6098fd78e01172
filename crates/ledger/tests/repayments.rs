use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use ledger::{
    ContactCmd, EntryKind, Ledger, LedgerError, MoneyCents, RepaymentCmd, TransactionCmd,
    UpdateRepaymentCmd, ValidationReport, ViolationKind,
};
use migration::MigratorTrait;

async fn ledger_with_db() -> (Ledger, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["alice", "bob"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let ledger = Ledger::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (ledger, db)
}

/// A contact of alice's with one credit transaction of the given amount.
async fn transaction_of(ledger: &Ledger, amount: i64) -> i64 {
    ledger.new_payment_method("Cash", None, "alice").await.unwrap();
    let contact = ledger.new_contact(ContactCmd::new("Mario"), "alice").await.unwrap();
    ledger
        .new_transaction(
            TransactionCmd::new("Loan", contact, EntryKind::Credit, MoneyCents::new(amount)),
            "alice",
        )
        .await
        .unwrap()
}

async fn age_row(db: &DatabaseConnection, table: &str, id: i64, days: i64) {
    let backend = db.get_database_backend();
    let stamp = Utc::now() - Duration::days(days);
    db.execute(Statement::from_sql_and_values(
        backend,
        format!("UPDATE {table} SET updated_at = ? WHERE id = ?"),
        vec![stamp.into(), id.into()],
    ))
    .await
    .unwrap();
}

fn validation(err: LedgerError) -> ValidationReport {
    match err {
        LedgerError::Validation(report) => report,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn overshooting_the_pending_amount_persists_nothing() {
    let (ledger, _db) = ledger_with_db().await;
    let transaction_id = transaction_of(&ledger, 10_00).await;

    ledger
        .new_repayment(
            RepaymentCmd::new("First", transaction_id, MoneyCents::new(5_00)),
            "alice",
        )
        .await
        .unwrap();

    let err = ledger
        .new_repayment(
            RepaymentCmd::new("Too much", transaction_id, MoneyCents::new(5_01)),
            "alice",
        )
        .await
        .unwrap_err();
    let report = validation(err);
    let violations = report.field("amount");
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::AmountExceedsPending);
    assert_eq!(
        violations[0].message,
        "The amount you entered exceeds the pending amount of 5.00"
    );

    let listed = ledger.repayments(Some(transaction_id), "alice").await.unwrap();
    assert_eq!(listed.len(), 1);
    let detail = ledger.transaction(transaction_id, "alice").await.unwrap();
    assert_eq!(detail.pending_amount, MoneyCents::new(5_00));
}

#[tokio::test]
async fn exact_fit_settles_the_transaction() {
    let (ledger, _db) = ledger_with_db().await;
    let transaction_id = transaction_of(&ledger, 10_00).await;

    ledger
        .new_repayment(
            RepaymentCmd::new("Full", transaction_id, MoneyCents::new(10_00)),
            "alice",
        )
        .await
        .unwrap();

    let detail = ledger.transaction(transaction_id, "alice").await.unwrap();
    assert_eq!(detail.pending_amount, MoneyCents::ZERO);
}

#[tokio::test]
async fn settled_transactions_take_no_further_repayments() {
    let (ledger, _db) = ledger_with_db().await;
    let transaction_id = transaction_of(&ledger, 10_00).await;

    ledger
        .new_repayment(
            RepaymentCmd::new("Full", transaction_id, MoneyCents::new(10_00)),
            "alice",
        )
        .await
        .unwrap();

    let err = ledger
        .new_repayment(
            RepaymentCmd::new("Extra", transaction_id, MoneyCents::new(1_00)),
            "alice",
        )
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("amount", ViolationKind::NoPendingAmount));
}

#[tokio::test]
async fn update_excludes_its_own_stored_amount() {
    let (ledger, _db) = ledger_with_db().await;
    let transaction_id = transaction_of(&ledger, 10_00).await;

    let repayment_id = ledger
        .new_repayment(
            RepaymentCmd::new("Full", transaction_id, MoneyCents::new(10_00)),
            "alice",
        )
        .await
        .unwrap();

    // Shrinking the settling repayment reopens the transaction.
    ledger
        .update_repayment(
            repayment_id,
            UpdateRepaymentCmd::new().amount(MoneyCents::new(6_00)),
            "alice",
        )
        .await
        .unwrap();
    let detail = ledger.transaction(transaction_id, "alice").await.unwrap();
    assert_eq!(detail.pending_amount, MoneyCents::new(4_00));

    // Growing past the transaction amount still fails.
    let err = ledger
        .update_repayment(
            repayment_id,
            UpdateRepaymentCmd::new().amount(MoneyCents::new(10_01)),
            "alice",
        )
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("amount", ViolationKind::AmountExceedsPending));
}

#[tokio::test]
async fn unknown_or_foreign_transaction_is_a_field_violation() {
    let (ledger, _db) = ledger_with_db().await;
    let transaction_id = transaction_of(&ledger, 10_00).await;

    let err = ledger
        .new_repayment(
            RepaymentCmd::new("Lost", 999, MoneyCents::new(1_00)),
            "alice",
        )
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("transaction", ViolationKind::NotFound));

    // Bob cannot repay against alice's transaction.
    ledger.new_payment_method("Cash", None, "bob").await.unwrap();
    let err = ledger
        .new_repayment(
            RepaymentCmd::new("Sneaky", transaction_id, MoneyCents::new(1_00)),
            "bob",
        )
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("transaction", ViolationKind::NotFound));
}

#[tokio::test]
async fn negative_amount_rejected() {
    let (ledger, _db) = ledger_with_db().await;
    let transaction_id = transaction_of(&ledger, 10_00).await;

    let err = ledger
        .new_repayment(
            RepaymentCmd::new("Refund", transaction_id, MoneyCents::new(-1_00)),
            "alice",
        )
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("amount", ViolationKind::Invalid));
}

#[tokio::test]
async fn settled_and_stale_repayments_refuse_updates_but_not_deletes() {
    let (ledger, db) = ledger_with_db().await;
    let transaction_id = transaction_of(&ledger, 10_00).await;

    let repayment_id = ledger
        .new_repayment(
            RepaymentCmd::new("Full", transaction_id, MoneyCents::new(10_00)),
            "alice",
        )
        .await
        .unwrap();
    age_row(&db, "repayments", repayment_id, 31).await;

    let err = ledger
        .update_repayment(
            repayment_id,
            UpdateRepaymentCmd::new().label("Too late"),
            "alice",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::LockedForEdit));

    // Deleting still works and reopens the full amount.
    ledger.delete_repayment(repayment_id, "alice").await.unwrap();
    let detail = ledger.transaction(transaction_id, "alice").await.unwrap();
    assert_eq!(detail.pending_amount, MoneyCents::new(10_00));
}

#[tokio::test]
async fn recent_or_unsettled_repayments_still_update() {
    let (ledger, db) = ledger_with_db().await;
    let transaction_id = transaction_of(&ledger, 10_00).await;

    // Settling repayment updated a moment ago.
    let settling = ledger
        .new_repayment(
            RepaymentCmd::new("Full", transaction_id, MoneyCents::new(10_00)),
            "alice",
        )
        .await
        .unwrap();
    ledger
        .update_repayment(settling, UpdateRepaymentCmd::new().label("Fresh"), "alice")
        .await
        .unwrap();

    // Old repayment on a transaction that still owes.
    ledger
        .update_repayment(
            settling,
            UpdateRepaymentCmd::new().amount(MoneyCents::new(4_00)),
            "alice",
        )
        .await
        .unwrap();
    age_row(&db, "repayments", settling, 40).await;
    ledger
        .update_repayment(settling, UpdateRepaymentCmd::new().label("Old but open"), "alice")
        .await
        .unwrap();
}

#[tokio::test]
async fn repayments_list_is_scoped_and_ordered() {
    let (ledger, _db) = ledger_with_db().await;
    let transaction_id = transaction_of(&ledger, 10_00).await;

    let first = ledger
        .new_repayment(
            RepaymentCmd::new("First", transaction_id, MoneyCents::new(2_00)),
            "alice",
        )
        .await
        .unwrap();
    let second = ledger
        .new_repayment(
            RepaymentCmd::new("Second", transaction_id, MoneyCents::new(3_00)),
            "alice",
        )
        .await
        .unwrap();

    let listed = ledger.repayments(Some(transaction_id), "alice").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first);
    assert_eq!(listed[1].id, second);

    assert!(ledger.repayments(None, "bob").await.unwrap().is_empty());
    assert!(matches!(
        ledger.repayment(first, "bob").await,
        Err(LedgerError::NotFound(_))
    ));
}

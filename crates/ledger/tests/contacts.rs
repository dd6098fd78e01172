use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::json;

use ledger::{
    ContactCmd, EntryKind, Ledger, LedgerError, MoneyCents, RepaymentCmd, TransactionCmd,
    ValidationReport, ViolationKind,
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

fn validation(err: LedgerError) -> ValidationReport {
    match err {
        LedgerError::Validation(report) => report,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn contact_round_trips_with_data_and_groups() {
    let (ledger, _db) = ledger_with_db().await;

    let family = ledger.new_contact_group("Family", None, "alice").await.unwrap();
    let contact_id = ledger
        .new_contact(
            ContactCmd::new("Mario")
                .data(json!({"phone": "333 1234567", "city": "Pisa"}))
                .groups(vec![family]),
            "alice",
        )
        .await
        .unwrap();

    let contact = ledger.contact(contact_id, "alice").await.unwrap();
    assert_eq!(contact.name, "Mario");
    assert_eq!(contact.data["city"], "Pisa");
    assert_eq!(contact.groups, vec![family]);
}

#[tokio::test]
async fn data_must_be_a_json_object() {
    let (ledger, _db) = ledger_with_db().await;

    let err = ledger
        .new_contact(ContactCmd::new("Mario").data(json!([1, 2, 3])), "alice")
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("data", ViolationKind::Invalid));

    assert!(ledger.contacts("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_and_foreign_group_ids_are_collected() {
    let (ledger, _db) = ledger_with_db().await;

    let bobs = ledger.new_contact_group("Family", None, "bob").await.unwrap();

    let err = ledger
        .new_contact(ContactCmd::new("Mario").groups(vec![bobs, 999]), "alice")
        .await
        .unwrap_err();
    let report = validation(err);

    // One violation per offending id, foreign ids indistinguishable from
    // unknown ones.
    let violations = report.field("groups");
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().all(|v| v.kind == ViolationKind::NotFound));
}

#[tokio::test]
async fn update_replaces_the_membership_set() {
    let (ledger, _db) = ledger_with_db().await;

    let family = ledger.new_contact_group("Family", None, "alice").await.unwrap();
    let work = ledger.new_contact_group("Work", None, "alice").await.unwrap();
    let contact_id = ledger
        .new_contact(ContactCmd::new("Mario").groups(vec![family]), "alice")
        .await
        .unwrap();

    ledger
        .update_contact(contact_id, ContactCmd::new("Mario").groups(vec![work]), "alice")
        .await
        .unwrap();

    let contact = ledger.contact(contact_id, "alice").await.unwrap();
    assert_eq!(contact.groups, vec![work]);

    ledger
        .update_contact(contact_id, ContactCmd::new("Mario"), "alice")
        .await
        .unwrap();
    let contact = ledger.contact(contact_id, "alice").await.unwrap();
    assert!(contact.groups.is_empty());
}

#[tokio::test]
async fn deleting_a_contact_takes_its_transactions_along() {
    let (ledger, _db) = ledger_with_db().await;

    ledger.new_payment_method("Cash", None, "alice").await.unwrap();
    let contact_id = ledger.new_contact(ContactCmd::new("Mario"), "alice").await.unwrap();
    let transaction_id = ledger
        .new_transaction(
            TransactionCmd::new("Loan", contact_id, EntryKind::Credit, MoneyCents::new(50_00)),
            "alice",
        )
        .await
        .unwrap();

    ledger.delete_contact(contact_id, "alice").await.unwrap();

    assert!(matches!(
        ledger.contact(contact_id, "alice").await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        ledger.transaction(transaction_id, "alice").await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn outstanding_balances_filters_and_orders() {
    let (ledger, _db) = ledger_with_db().await;

    ledger.new_payment_method("Cash", None, "alice").await.unwrap();
    let mario = ledger.new_contact(ContactCmd::new("Mario"), "alice").await.unwrap();
    let luigi = ledger.new_contact(ContactCmd::new("Luigi"), "alice").await.unwrap();
    let peach = ledger.new_contact(ContactCmd::new("Peach"), "alice").await.unwrap();

    ledger
        .new_transaction(
            TransactionCmd::new("Loan", mario, EntryKind::Credit, MoneyCents::new(100_00)),
            "alice",
        )
        .await
        .unwrap();
    let luigi_tx = ledger
        .new_transaction(
            TransactionCmd::new("Loan", luigi, EntryKind::Credit, MoneyCents::new(50_00)),
            "alice",
        )
        .await
        .unwrap();
    ledger
        .new_repayment(
            RepaymentCmd::new("First", luigi_tx, MoneyCents::new(20_00)),
            "alice",
        )
        .await
        .unwrap();

    let balances = ledger.outstanding_balances("alice").await.unwrap();
    assert_eq!(balances.len(), 2);
    // Largest outstanding first; Peach has no transactions and drops out.
    assert_eq!(balances[0].contact_id, mario);
    assert_eq!(balances[0].total_repaid, MoneyCents::ZERO);
    assert_eq!(balances[0].outstanding, MoneyCents::new(100_00));
    assert_eq!(balances[1].contact_id, luigi);
    assert_eq!(balances[1].outstanding, MoneyCents::new(30_00));
    assert!(!balances.iter().any(|b| b.contact_id == peach));

    // Settling Luigi removes him from the report.
    ledger
        .new_repayment(
            RepaymentCmd::new("Rest", luigi_tx, MoneyCents::new(30_00)),
            "alice",
        )
        .await
        .unwrap();
    let balances = ledger.outstanding_balances("alice").await.unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].contact_id, mario);
}

#[tokio::test]
async fn contacts_are_partitioned_by_owner() {
    let (ledger, _db) = ledger_with_db().await;

    let contact_id = ledger.new_contact(ContactCmd::new("Mario"), "alice").await.unwrap();

    assert!(matches!(
        ledger.contact(contact_id, "bob").await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        ledger.delete_contact(contact_id, "bob").await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(ledger.contacts("bob").await.unwrap().is_empty());
}

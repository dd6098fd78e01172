use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use ledger::{Ledger, LedgerError, ValidationReport, ViolationKind};
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
async fn duplicate_name_rejected_per_owner_only() {
    let (ledger, _db) = ledger_with_db().await;

    ledger.new_contact_group("Family", None, "alice").await.unwrap();

    let err = ledger
        .new_contact_group("Family", None, "alice")
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("name", ViolationKind::DuplicateName));

    // Same name under another owner is fine.
    ledger.new_contact_group("Family", None, "bob").await.unwrap();
}

#[tokio::test]
async fn rename_to_own_name_is_allowed() {
    let (ledger, _db) = ledger_with_db().await;

    let group_id = ledger.new_contact_group("Family", None, "alice").await.unwrap();
    ledger
        .update_contact_group(group_id, "Family", None, "alice")
        .await
        .unwrap();

    let node = ledger.contact_group(group_id, "alice").await.unwrap();
    assert_eq!(node.name, "Family");
}

#[tokio::test]
async fn blank_name_rejected() {
    let (ledger, _db) = ledger_with_db().await;

    let err = ledger.new_contact_group("   ", None, "alice").await.unwrap_err();
    let report = validation(err);
    assert!(report.contains("name", ViolationKind::Required));
}

#[tokio::test]
async fn foreign_parent_is_a_permission_violation() {
    let (ledger, _db) = ledger_with_db().await;

    let bobs = ledger.new_contact_group("Family", None, "bob").await.unwrap();

    let err = ledger
        .new_contact_group("Friends", Some(bobs), "alice")
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("parent_group", ViolationKind::Permission));
}

#[tokio::test]
async fn unknown_parent_is_a_missing_reference() {
    let (ledger, _db) = ledger_with_db().await;

    let err = ledger
        .new_contact_group("Friends", Some(999), "alice")
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("parent_group", ViolationKind::NotFound));
}

#[tokio::test]
async fn group_cannot_be_its_own_parent() {
    let (ledger, _db) = ledger_with_db().await;

    let group_id = ledger.new_contact_group("Family", None, "alice").await.unwrap();

    let err = ledger
        .update_contact_group(group_id, "Family", Some(group_id), "alice")
        .await
        .unwrap_err();
    let report = validation(err);
    assert!(report.contains("parent_group", ViolationKind::InvalidHierarchy));
}

#[tokio::test]
async fn attaching_a_second_child_detaches_the_first() {
    let (ledger, _db) = ledger_with_db().await;

    let family = ledger.new_contact_group("Family", None, "alice").await.unwrap();
    let close = ledger
        .new_contact_group("Close Friends", Some(family), "alice")
        .await
        .unwrap();

    let node = ledger.contact_group(close, "alice").await.unwrap();
    assert_eq!(node.parent_group, Some(family));

    let work = ledger
        .new_contact_group("Work", Some(family), "alice")
        .await
        .unwrap();

    // "Close Friends" lost its parent; "Work" took the slot.
    let close_node = ledger.contact_group(close, "alice").await.unwrap();
    assert_eq!(close_node.parent_group, None);
    let family_node = ledger.contact_group(family, "alice").await.unwrap();
    assert_eq!(family_node.subgroups.len(), 1);
    assert_eq!(family_node.subgroups[0].id, work);
}

#[tokio::test]
async fn collapse_applies_on_update_too() {
    let (ledger, _db) = ledger_with_db().await;

    let family = ledger.new_contact_group("Family", None, "alice").await.unwrap();
    let close = ledger
        .new_contact_group("Close Friends", Some(family), "alice")
        .await
        .unwrap();
    let work = ledger.new_contact_group("Work", None, "alice").await.unwrap();

    ledger
        .update_contact_group(work, "Work", Some(family), "alice")
        .await
        .unwrap();

    let close_node = ledger.contact_group(close, "alice").await.unwrap();
    assert_eq!(close_node.parent_group, None);
    let work_node = ledger.contact_group(work, "alice").await.unwrap();
    assert_eq!(work_node.parent_group, Some(family));
}

#[tokio::test]
async fn delete_orphans_children_instead_of_cascading() {
    let (ledger, _db) = ledger_with_db().await;

    let family = ledger.new_contact_group("Family", None, "alice").await.unwrap();
    let close = ledger
        .new_contact_group("Close Friends", Some(family), "alice")
        .await
        .unwrap();

    ledger.delete_contact_group(family, "alice").await.unwrap();

    assert!(matches!(
        ledger.contact_group(family, "alice").await,
        Err(LedgerError::NotFound(_))
    ));
    let close_node = ledger.contact_group(close, "alice").await.unwrap();
    assert_eq!(close_node.parent_group, None);
}

#[tokio::test]
async fn forest_read_nests_subtrees_in_id_order() {
    let (ledger, _db) = ledger_with_db().await;

    let family = ledger.new_contact_group("Family", None, "alice").await.unwrap();
    let close = ledger
        .new_contact_group("Close Friends", Some(family), "alice")
        .await
        .unwrap();
    let inner = ledger
        .new_contact_group("Inner Circle", Some(close), "alice")
        .await
        .unwrap();
    let work = ledger.new_contact_group("Work", None, "alice").await.unwrap();

    let forest = ledger.contact_groups("alice").await.unwrap();
    assert_eq!(forest.len(), 2);
    assert_eq!(forest[0].id, family);
    assert_eq!(forest[0].subgroups.len(), 1);
    assert_eq!(forest[0].subgroups[0].id, close);
    assert_eq!(forest[0].subgroups[0].subgroups[0].id, inner);
    assert_eq!(forest[1].id, work);
    assert!(forest[1].subgroups.is_empty());

    // Another owner's forest stays empty.
    assert!(ledger.contact_groups("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn foreign_group_reads_as_missing() {
    let (ledger, _db) = ledger_with_db().await;

    let bobs = ledger.new_contact_group("Family", None, "bob").await.unwrap();

    assert!(matches!(
        ledger.contact_group(bobs, "alice").await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        ledger.update_contact_group(bobs, "Taken", None, "alice").await,
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        ledger.delete_contact_group(bobs, "alice").await,
        Err(LedgerError::NotFound(_))
    ));

    // Still there for its owner.
    let node = ledger.contact_group(bobs, "bob").await.unwrap();
    assert_eq!(node.name, "Family");
}

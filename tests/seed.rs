mod common;

use common::{RecordingDatabase, leads, memory_db, users};
use crmseed::{
    ColumnSpec, ColumnType, DbError, RowOutcome, SeedLoader, SeedRow, TableDefinition,
    TableOutcome, catalog, load_seeds, reconcile_live, run_setup,
};
use serde_json::{Value, json};

fn seed_row(table: &str, values: Value) -> SeedRow {
    SeedRow::new(table, serde_json::from_value(values).unwrap())
}

fn user_row(email: &str) -> SeedRow {
    seed_row("users", json!({"name": "Ada", "email": email})).keyed_by(&["email"])
}

#[tokio::test]
async fn empty_schema_to_one_user_and_one_lead() {
    let mut db = memory_db().await;
    let defs = vec![users(), leads()];

    let tables = reconcile_live(&mut db, &defs).await.unwrap();
    let outcomes: Vec<_> = tables.entries.iter().map(|e| e.outcome.clone()).collect();
    assert_eq!(outcomes, vec![TableOutcome::Created, TableOutcome::Created]);

    let rows = vec![
        user_row("ada@example.com"),
        seed_row("leads", json!({"email": "lead@example.com", "owner_id": 1}))
            .keyed_by(&["email"]),
    ];
    let seeds = load_seeds(&mut db, &rows).await.unwrap();
    let outcomes: Vec<_> = seeds.entries.iter().map(|e| e.outcome.clone()).collect();
    assert_eq!(outcomes, vec![RowOutcome::Inserted, RowOutcome::Inserted]);

    assert_eq!(db.count_rows("users").await.unwrap(), 1);
    assert_eq!(db.count_rows("leads").await.unwrap(), 1);
}

#[tokio::test]
async fn seeding_twice_skips_everything() {
    let mut db = memory_db().await;
    reconcile_live(&mut db, &[users(), leads()]).await.unwrap();
    let rows = vec![
        user_row("ada@example.com"),
        user_row("grace@example.com"),
        seed_row("leads", json!({"email": "lead@example.com", "owner_id": 2}))
            .keyed_by(&["email"]),
    ];

    let first = load_seeds(&mut db, &rows).await.unwrap();
    assert_eq!(first.inserted(), 3);

    let second = load_seeds(&mut db, &rows).await.unwrap();
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.skipped(), 3);
    assert!(second.is_success());
    assert_eq!(db.count_rows("users").await.unwrap(), 2);
}

#[tokio::test]
async fn existing_natural_key_is_skipped_not_failed() {
    let mut db = memory_db().await;
    reconcile_live(&mut db, &[users()]).await.unwrap();
    load_seeds(&mut db, &[user_row("ada@example.com")])
        .await
        .unwrap();

    let report = load_seeds(&mut db, &[user_row("ada@example.com")])
        .await
        .unwrap();

    assert_eq!(report.entries[0].row, "users[email=ada@example.com]");
    assert_eq!(report.entries[0].outcome, RowOutcome::SkippedDuplicate);
    assert_eq!(db.count_rows("users").await.unwrap(), 1);
}

#[tokio::test]
async fn dangling_reference_fails_that_row_only() {
    let mut db = memory_db().await;
    reconcile_live(&mut db, &[users(), leads()]).await.unwrap();
    let rows = vec![
        seed_row("leads", json!({"email": "orphan@example.com", "owner_id": 42}))
            .keyed_by(&["email"]),
        user_row("ada@example.com"),
    ];

    let report = load_seeds(&mut db, &rows).await.unwrap();

    assert!(matches!(
        &report.entries[0].outcome,
        RowOutcome::Failed(reason) if reason.starts_with("constraint violation")
    ));
    assert_eq!(report.entries[1].outcome, RowOutcome::Inserted);
    assert!(!report.is_success());
}

#[tokio::test]
async fn unknown_table_is_a_schema_failure() {
    let mut db = memory_db().await;

    let report = load_seeds(&mut db, &[user_row("ada@example.com")])
        .await
        .unwrap();

    assert!(matches!(
        &report.entries[0].outcome,
        RowOutcome::Failed(reason) if reason.starts_with("syntax or schema error")
    ));
}

#[tokio::test]
async fn missing_auto_uuid_columns_are_filled() {
    let mut db = memory_db().await;
    let defs = vec![
        TableDefinition::new("contracts")
            .column(ColumnSpec::id("id"))
            .column(ColumnSpec::new("reference", ColumnType::Uuid).not_null().unique().auto_uuid())
            .column(ColumnSpec::new("title", ColumnType::Text).not_null()),
    ];
    reconcile_live(&mut db, &defs).await.unwrap();

    let rows = vec![
        seed_row("contracts", json!({"title": "Support"})),
        seed_row("contracts", json!({"title": "Hosting"})),
    ];
    let report = SeedLoader::new(&mut db)
        .with_definitions(&defs)
        .load(&rows)
        .await
        .unwrap();

    assert_eq!(report.inserted(), 2);
    assert_eq!(db.count_rows("contracts").await.unwrap(), 2);
}

#[tokio::test]
async fn catalog_setup_is_idempotent() {
    let mut db = memory_db().await;
    let defs = catalog::definitions();
    let seeds = catalog::seeds();

    let first = run_setup(&mut db, &defs, &seeds, false).await.unwrap();
    assert!(first.is_success(), "{}", first);
    assert_eq!(first.tables.created(), defs.len());
    let first_seeds = first.seeds.as_ref().unwrap();
    assert_eq!(first_seeds.inserted(), seeds.len());

    let second = run_setup(&mut db, &defs, &seeds, false).await.unwrap();
    assert!(second.is_success(), "{}", second);
    assert_eq!(second.tables.already_existed(), defs.len());
    assert_eq!(second.seeds.as_ref().unwrap().skipped(), seeds.len());

    assert_eq!(db.count_rows("pipeline_stages").await.unwrap(), 5);
    assert_eq!(db.count_rows("payments").await.unwrap(), 2);
}

#[tokio::test]
async fn schema_only_setup_does_not_seed() {
    let mut db = memory_db().await;

    let report = run_setup(&mut db, &catalog::definitions(), &catalog::seeds(), true)
        .await
        .unwrap();

    assert!(report.seeds.is_none());
    assert_eq!(db.count_rows("users").await.unwrap(), 0);
}

#[tokio::test]
async fn inspection_lists_created_columns() {
    let mut db = memory_db().await;
    reconcile_live(&mut db, &[users()]).await.unwrap();

    let columns = db.list_columns("users").await.unwrap();
    let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();

    assert_eq!(names, vec!["id", "name", "email"]);
    assert_eq!(columns[2].1, "VARCHAR(191)");
}

#[tokio::test]
async fn connection_error_stops_seeding() {
    let mut db = RecordingDatabase::new().fail_when(
        "INSERT INTO \"leads\"",
        DbError::Connection("server closed the connection".into()),
    );
    let rows = vec![
        user_row("ada@example.com"),
        seed_row("leads", json!({"email": "lead@example.com"})),
        user_row("grace@example.com"),
    ];

    let err = load_seeds(&mut db, &rows).await.unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(db.executed.len(), 2);
}

#[tokio::test]
async fn duplicate_error_from_the_database_is_a_skip() {
    let mut db = RecordingDatabase::new().fail_when(
        "INSERT INTO \"users\"",
        DbError::DuplicateKey("UNIQUE constraint failed: users.email".into()),
    );

    let report = load_seeds(&mut db, &[user_row("ada@example.com")])
        .await
        .unwrap();

    assert_eq!(report.skipped(), 1);
    assert!(db.executed[0].sql.starts_with("INSERT INTO \"users\" ("));
    assert!(db.executed[0].sql.ends_with("VALUES (?, ?)"));
    assert_eq!(db.executed[0].params.len(), 2);
}

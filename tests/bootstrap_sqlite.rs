use std::collections::HashSet;
use std::path::Path;

use contacts_bootstrap::{
    schema, Backend, BootstrapError, Bootstrapper, DatabaseConfig, NewContact, SeedPolicy,
};
use sqlx::{AnyConnection, Connection};
use tempfile::TempDir;

fn sqlite_config(dir: &TempDir) -> DatabaseConfig {
    let path = dir.path().join("contacts.db");
    DatabaseConfig::sqlite(path.to_str().unwrap())
}

async fn open(config: &DatabaseConfig) -> AnyConnection {
    sqlx::any::install_default_drivers();
    AnyConnection::connect(&config.database_url().unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn first_run_creates_and_seeds() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir);

    let report = Bootstrapper::new(config.clone()).run().await.unwrap();

    assert_eq!(report.backend, Backend::Sqlite);
    assert!(report.database_created);
    assert!(report.table_created);
    assert_eq!(report.seeded, 4);
    assert!(Path::new(&config.database).exists());

    let rows: Vec<(i64, &str, &str, &str)> = report
        .contacts
        .iter()
        .map(|c| {
            (
                c.id,
                c.first_name.as_str(),
                c.last_name.as_str(),
                c.phone_number.as_str(),
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            (1, "John", "Doe", "050-1234567"),
            (2, "Jane", "Smith", "052-9876543"),
            (3, "David", "Cohen", "054-5551234"),
            (4, "Sarah", "Levi", "053-7778899"),
        ]
    );

    let phones: HashSet<_> = report.contacts.iter().map(|c| &c.phone_number).collect();
    assert_eq!(phones.len(), 4);
}

#[tokio::test]
async fn second_run_is_a_no_op_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let bootstrapper = Bootstrapper::new(sqlite_config(&dir));

    bootstrapper.run().await.unwrap();
    let report = bootstrapper.run().await.unwrap();

    assert!(!report.database_created);
    assert!(!report.table_created);
    assert_eq!(report.seeded, 0);
    assert_eq!(report.contacts.len(), 4);
}

#[tokio::test]
async fn always_policy_fails_on_duplicate_phone_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir);

    Bootstrapper::new(config.clone()).run().await.unwrap();
    let err = Bootstrapper::new(config.clone())
        .with_seed_policy(SeedPolicy::Always)
        .run()
        .await
        .unwrap_err();
    assert!(err.is_duplicate(), "unexpected error: {err}");

    let mut conn = open(&config).await;
    assert_eq!(schema::count_contacts(&mut conn).await.unwrap(), 4);
}

#[tokio::test]
async fn always_policy_seeds_an_empty_existing_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir);

    let mut conn = open(&config).await;
    assert!(schema::create_contacts_table(&mut conn, Backend::Sqlite).await.unwrap());
    conn.close().await.unwrap();

    let report = Bootstrapper::new(config.clone())
        .with_seed_policy(SeedPolicy::Always)
        .run()
        .await
        .unwrap();
    assert!(!report.table_created);
    assert_eq!(report.seeded, 4);

    let ids: Vec<i64> = report.contacts.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn ids_keep_increasing_and_are_not_reused() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir);
    Bootstrapper::new(config.clone()).run().await.unwrap();

    let mut conn = open(&config).await;
    sqlx::query("DELETE FROM contacts WHERE id = 4")
        .execute(&mut conn)
        .await
        .unwrap();
    let extra = NewContact {
        first_name: "Noa",
        last_name: "Katz",
        phone_number: "058-1112222",
    };
    let inserted = schema::insert_contacts(&mut conn, Backend::Sqlite, &[extra])
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let ids: Vec<i64> = schema::fetch_contacts(&mut conn)
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 5]);
}

#[tokio::test]
async fn storage_enforces_column_limits() {
    let dir = tempfile::tempdir().unwrap();
    let config = sqlite_config(&dir);
    Bootstrapper::new(config.clone()).run().await.unwrap();

    let mut conn = open(&config).await;
    let long_name = "x".repeat(51);
    let row = NewContact {
        first_name: &long_name,
        last_name: "Doe",
        phone_number: "059-0000000",
    };
    let err = schema::insert_contacts(&mut conn, Backend::Sqlite, &[row])
        .await
        .unwrap_err();
    assert!(
        matches!(err, BootstrapError::ConstraintViolation(_)),
        "unexpected error: {err}"
    );
    assert_eq!(schema::count_contacts(&mut conn).await.unwrap(), 4);
}

#[tokio::test]
async fn in_memory_database_is_always_fresh() {
    let report = Bootstrapper::new(DatabaseConfig::sqlite(":memory:"))
        .run()
        .await
        .unwrap();
    assert!(report.database_created);
    assert!(report.table_created);
    assert_eq!(report.contacts.len(), 4);
}

#[tokio::test]
async fn report_serializes_for_the_cli() {
    let dir = tempfile::tempdir().unwrap();
    let report = Bootstrapper::new(sqlite_config(&dir)).run().await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["backend"], "sqlite");
    assert_eq!(json["seed_policy"], "on-create");
    assert_eq!(json["seeded"], 4);
    assert_eq!(json["contacts"][0]["phone_number"], "050-1234567");
}

mod common;

use std::collections::HashMap;

use migration::history;
use migration::sea_orm::ConnectionTrait;
use migration::{MigrateError, MigrateResult, MigrationEngine, MigrationState, ScriptMigrator};
use test_support::{ScriptDir, TempSqlite};

use common::{config_for, connect, table_exists};

const USERS: &str = "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);";
const EMAIL: &str = "ALTER TABLE users ADD COLUMN email TEXT;";
const INDEX: &str = "CREATE INDEX idx_users_name ON users (name);";

#[tokio::test]
async fn applies_pending_scripts_in_version_order() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts.write("V1__create_users.sql", USERS).unwrap();
    scripts.write("V2__add_email.sql", EMAIL).unwrap();
    scripts.write("V1_1__index_names.sql", INDEX).unwrap();
    scripts.write("README.md", "not a migration").unwrap();

    let db = connect(&sqlite).await;
    let result = ScriptMigrator.migrate(&db, &config_for(&scripts)).await.unwrap();

    assert_eq!(
        result,
        MigrateResult {
            migrations_executed: 3,
            target_schema_version: Some("2".to_string()),
        }
    );

    let applied = history::load(&db).await.unwrap();
    let versions: Vec<String> = applied.iter().map(|a| a.version.to_string()).collect();
    assert_eq!(versions, vec!["1", "1.1", "2"]);
    assert_eq!(applied[1].description, "index names");
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts.write("V1__create_users.sql", USERS).unwrap();

    let db = connect(&sqlite).await;
    let config = config_for(&scripts);
    ScriptMigrator.migrate(&db, &config).await.unwrap();
    let again = ScriptMigrator.migrate(&db, &config).await.unwrap();

    assert_eq!(again, MigrateResult::default());
}

#[tokio::test]
async fn scripts_in_nested_directories_and_multiple_locations_are_found() {
    let sqlite = TempSqlite::new().unwrap();
    let first = ScriptDir::new().unwrap();
    let second = ScriptDir::new().unwrap();
    first.write("core/V1__create_users.sql", USERS).unwrap();
    second.write("V2__add_email.sql", EMAIL).unwrap();

    let db = connect(&sqlite).await;
    let mut config = config_for(&first);
    config.locations.push(second.path().display().to_string());

    let result = ScriptMigrator.migrate(&db, &config).await.unwrap();
    assert_eq!(result.migrations_executed, 2);
}

#[tokio::test]
async fn duplicate_versions_across_locations_are_rejected() {
    let sqlite = TempSqlite::new().unwrap();
    let first = ScriptDir::new().unwrap();
    let second = ScriptDir::new().unwrap();
    first.write("V1__create_users.sql", USERS).unwrap();
    second.write("V1.0__also_one.sql", EMAIL).unwrap();

    let db = connect(&sqlite).await;
    let mut config = config_for(&first);
    config.locations.push(second.location());

    let err = ScriptMigrator.migrate(&db, &config).await.unwrap_err();
    assert!(matches!(err, MigrateError::DuplicateVersion { .. }), "{err:?}");
}

#[tokio::test]
async fn placeholders_are_substituted_when_enabled() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts
        .write("V1__create_table.sql", "CREATE TABLE ${table} (id INTEGER);")
        .unwrap();

    let db = connect(&sqlite).await;
    let mut config = config_for(&scripts);
    config.placeholder_replacement = true;
    config.placeholders = HashMap::from([("table".to_string(), "widgets".to_string())]);

    ScriptMigrator.migrate(&db, &config).await.unwrap();
    assert!(table_exists(&db, "widgets").await);
}

#[tokio::test]
async fn unknown_placeholder_fails_before_touching_the_schema() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts
        .write("V1__create_table.sql", "CREATE TABLE ${table} (id INTEGER);")
        .unwrap();

    let db = connect(&sqlite).await;
    let mut config = config_for(&scripts);
    config.placeholder_replacement = true;

    let err = ScriptMigrator.migrate(&db, &config).await.unwrap_err();
    assert!(matches!(err, MigrateError::UnresolvedPlaceholder { .. }), "{err:?}");
    assert!(history::load(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn edited_script_fails_checksum_validation() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts.write("V1__create_users.sql", USERS).unwrap();

    let db = connect(&sqlite).await;
    let config = config_for(&scripts);
    ScriptMigrator.migrate(&db, &config).await.unwrap();

    scripts
        .write("V1__create_users.sql", "CREATE TABLE users (id INTEGER);")
        .unwrap();

    let err = ScriptMigrator.migrate(&db, &config).await.unwrap_err();
    assert!(matches!(err, MigrateError::ChecksumMismatch { .. }), "{err:?}");

    let mut lenient = config.clone();
    lenient.validate_on_migrate = false;
    let result = ScriptMigrator.migrate(&db, &lenient).await.unwrap();
    assert_eq!(result.migrations_executed, 0);
}

#[tokio::test]
async fn late_script_with_older_version_is_out_of_order() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts.write("V2__create_users.sql", USERS).unwrap();

    let db = connect(&sqlite).await;
    let config = config_for(&scripts);
    ScriptMigrator.migrate(&db, &config).await.unwrap();

    scripts.write("V1__early.sql", "CREATE TABLE early (id INTEGER);").unwrap();

    let err = ScriptMigrator.migrate(&db, &config).await.unwrap_err();
    match err {
        MigrateError::OutOfOrder { version, current } => {
            assert_eq!(version, "1");
            assert_eq!(current, "2");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let mut lenient = config.clone();
    lenient.validate_on_migrate = false;
    let result = ScriptMigrator.migrate(&db, &lenient).await.unwrap();
    assert_eq!(result.migrations_executed, 0);
    assert!(!table_exists(&db, "early").await);
}

#[tokio::test]
async fn removed_script_is_reported_as_missing() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts.write("V1__create_users.sql", USERS).unwrap();
    scripts.write("V2__add_email.sql", EMAIL).unwrap();

    let db = connect(&sqlite).await;
    let config = config_for(&scripts);
    ScriptMigrator.migrate(&db, &config).await.unwrap();

    scripts.remove("V2__add_email.sql").unwrap();

    let err = ScriptMigrator.validate(&db, &config).await.unwrap_err();
    assert!(matches!(err, MigrateError::MissingScript { ref version } if version == "2"));

    let info = ScriptMigrator.info(&db, &config).await.unwrap();
    assert_eq!(info[1].state, MigrationState::Missing);
}

#[tokio::test]
async fn non_empty_schema_requires_baseline() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts.write("V1__create_users.sql", USERS).unwrap();
    scripts.write("V2__add_email.sql", EMAIL).unwrap();

    let db = connect(&sqlite).await;
    db.execute_unprepared(USERS).await.unwrap();

    let mut config = config_for(&scripts);
    let err = ScriptMigrator.migrate(&db, &config).await.unwrap_err();
    assert!(matches!(err, MigrateError::NonEmptySchema), "{err:?}");

    config.baseline_on_migrate = true;
    let result = ScriptMigrator.migrate(&db, &config).await.unwrap();
    assert_eq!(result.migrations_executed, 1);
    assert_eq!(result.target_schema_version.as_deref(), Some("2"));

    let states: Vec<MigrationState> = ScriptMigrator
        .info(&db, &config)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.state)
        .collect();
    // V1 shares the baseline version and is covered by the baseline row.
    assert!(states.contains(&MigrationState::Baseline));
    assert!(states.contains(&MigrationState::Applied));
}

#[tokio::test]
async fn failing_script_rolls_back_and_is_not_recorded() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts.write("V1__create_users.sql", USERS).unwrap();
    scripts
        .write("V2__broken.sql", "CREATE TABLE half (id INTEGER); SELEC nonsense;")
        .unwrap();

    let db = connect(&sqlite).await;
    let err = ScriptMigrator
        .migrate(&db, &config_for(&scripts))
        .await
        .unwrap_err();

    match err {
        MigrateError::ScriptFailed { script, .. } => assert_eq!(script, "V2__broken.sql"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(history::load(&db).await.unwrap().len(), 1);
    assert!(!table_exists(&db, "half").await);
}

#[tokio::test]
async fn info_reports_pending_scripts() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts.write("V1__create_users.sql", USERS).unwrap();

    let db = connect(&sqlite).await;
    let config = config_for(&scripts);
    ScriptMigrator.migrate(&db, &config).await.unwrap();
    scripts.write("V2__add_email.sql", EMAIL).unwrap();

    let info = ScriptMigrator.info(&db, &config).await.unwrap();
    assert_eq!(info.len(), 2);
    assert_eq!(info[0].state, MigrationState::Applied);
    assert!(info[0].installed_on.is_some());
    assert_eq!(info[1].state, MigrationState::Pending);
    assert_eq!(info[1].installed_on, None);
}

#[tokio::test]
async fn clean_is_refused_while_disabled() {
    let sqlite = TempSqlite::new().unwrap();
    let scripts = ScriptDir::new().unwrap();
    scripts.write("V1__create_users.sql", USERS).unwrap();

    let db = connect(&sqlite).await;
    let mut config = config_for(&scripts);
    ScriptMigrator.migrate(&db, &config).await.unwrap();

    let err = ScriptMigrator.clean(&db, &config).await.unwrap_err();
    assert!(matches!(err, MigrateError::CleanDisabled));
    assert!(table_exists(&db, "users").await);

    config.clean_disabled = false;
    let dropped = ScriptMigrator.clean(&db, &config).await.unwrap();
    assert!(dropped.contains(&"users".to_string()));
    assert!(!table_exists(&db, "users").await);

    let result = ScriptMigrator.migrate(&db, &config).await.unwrap();
    assert_eq!(result.migrations_executed, 1);
}

#[tokio::test]
async fn missing_location_is_skipped() {
    let sqlite = TempSqlite::new().unwrap();
    let db = connect(&sqlite).await;
    let config = migration::MigrationConfig {
        locations: vec!["filesystem:/definitely/not/here".to_string()],
        ..Default::default()
    };

    let result = ScriptMigrator.migrate(&db, &config).await.unwrap();
    assert_eq!(result, MigrateResult::default());
}

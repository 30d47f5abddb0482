#![allow(dead_code)]

use migration::sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use migration::MigrationConfig;
use test_support::{ScriptDir, TempSqlite};

#[ctor::ctor]
fn init_logging() {
    test_support::logging::init();
}

pub async fn connect(db: &TempSqlite) -> DatabaseConnection {
    Database::connect(db.driver_url())
        .await
        .expect("connect to temporary sqlite database")
}

pub fn config_for(scripts: &ScriptDir) -> MigrationConfig {
    MigrationConfig {
        locations: vec![scripts.location()],
        ..MigrationConfig::default()
    }
}

pub async fn table_exists(db: &DatabaseConnection, name: &str) -> bool {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS cnt FROM sqlite_master WHERE type = 'table' AND name = '{name}'"),
        ))
        .await
        .expect("query sqlite_master")
        .expect("count row");
    row.try_get::<i64>("", "cnt").expect("cnt column") > 0
}

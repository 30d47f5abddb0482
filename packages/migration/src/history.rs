//! Schema history table: one row per applied script plus an optional baseline marker.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend, QueryResult, Statement};
use serde::Serialize;

use crate::error::MigrateError;
use crate::script::Version;

pub const HISTORY_TABLE: &str = "schema_history";

#[derive(Iden)]
enum SchemaHistory {
    Table,
    InstalledRank,
    Version,
    Description,
    Kind,
    Script,
    Checksum,
    InstalledOn,
    ExecutionMs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    Sql,
    Baseline,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Sql => "SQL",
            EntryKind::Baseline => "BASELINE",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw {
            "BASELINE" => EntryKind::Baseline,
            _ => EntryKind::Sql,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub installed_rank: i32,
    pub version: Version,
    pub description: String,
    pub kind: EntryKind,
    pub script: String,
    pub checksum: Option<i64>,
    pub installed_on: String,
    pub execution_ms: i64,
}

pub async fn ensure_table<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let stmt = Table::create()
        .table(SchemaHistory::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(SchemaHistory::InstalledRank)
                .integer()
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(SchemaHistory::Version).string_len(50).not_null())
        .col(ColumnDef::new(SchemaHistory::Description).string_len(200).not_null())
        .col(ColumnDef::new(SchemaHistory::Kind).string_len(20).not_null())
        .col(ColumnDef::new(SchemaHistory::Script).string_len(1000).not_null())
        .col(ColumnDef::new(SchemaHistory::Checksum).big_integer().null())
        .col(ColumnDef::new(SchemaHistory::InstalledOn).string_len(64).not_null())
        .col(ColumnDef::new(SchemaHistory::ExecutionMs).big_integer().not_null())
        .to_owned();

    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// All recorded entries ordered by installation rank.
pub async fn load<C: ConnectionTrait>(db: &C) -> Result<Vec<AppliedMigration>, MigrateError> {
    let query = Query::select()
        .columns([
            SchemaHistory::InstalledRank,
            SchemaHistory::Version,
            SchemaHistory::Description,
            SchemaHistory::Kind,
            SchemaHistory::Script,
            SchemaHistory::Checksum,
            SchemaHistory::InstalledOn,
            SchemaHistory::ExecutionMs,
        ])
        .from(SchemaHistory::Table)
        .order_by(SchemaHistory::InstalledRank, Order::Asc)
        .to_owned();

    let backend = db.get_database_backend();
    let rows = db.query_all(backend.build(&query)).await?;
    rows.iter().map(decode_row).collect()
}

fn decode_row(row: &QueryResult) -> Result<AppliedMigration, MigrateError> {
    let version: String = row.try_get("", "version")?;
    let kind: String = row.try_get("", "kind")?;

    Ok(AppliedMigration {
        installed_rank: row.try_get("", "installed_rank")?,
        version: Version::parse(&version)?,
        description: row.try_get("", "description")?,
        kind: EntryKind::parse(&kind),
        script: row.try_get("", "script")?,
        checksum: row.try_get("", "checksum")?,
        installed_on: row.try_get("", "installed_on")?,
        execution_ms: row.try_get("", "execution_ms")?,
    })
}

pub async fn record<C: ConnectionTrait>(db: &C, entry: &AppliedMigration) -> Result<(), DbErr> {
    let insert = Query::insert()
        .into_table(SchemaHistory::Table)
        .columns([
            SchemaHistory::InstalledRank,
            SchemaHistory::Version,
            SchemaHistory::Description,
            SchemaHistory::Kind,
            SchemaHistory::Script,
            SchemaHistory::Checksum,
            SchemaHistory::InstalledOn,
            SchemaHistory::ExecutionMs,
        ])
        .values_panic([
            entry.installed_rank.into(),
            entry.version.to_string().into(),
            entry.description.clone().into(),
            entry.kind.as_str().into(),
            entry.script.clone().into(),
            entry.checksum.into(),
            entry.installed_on.clone().into(),
            entry.execution_ms.into(),
        ])
        .to_owned();

    let backend = db.get_database_backend();
    db.execute(backend.build(&insert)).await?;
    Ok(())
}

/// Whether the current schema holds any table other than the history table.
pub async fn schema_has_objects<C: ConnectionTrait>(db: &C) -> Result<bool, MigrateError> {
    let backend = db.get_database_backend();
    let sql = match backend {
        DatabaseBackend::Sqlite => format!(
            "SELECT COUNT(*) AS cnt FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name <> '{HISTORY_TABLE}'"
        ),
        DatabaseBackend::Postgres => format!(
            "SELECT COUNT(*) AS cnt FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name <> '{HISTORY_TABLE}'"
        ),
        DatabaseBackend::MySql => format!(
            "SELECT COUNT(*) AS cnt FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name <> '{HISTORY_TABLE}'"
        ),
    };

    let count: i64 = match db.query_one(Statement::from_string(backend, sql)).await? {
        Some(row) => row.try_get("", "cnt")?,
        None => 0,
    };
    Ok(count > 0)
}

pub fn now_timestamp() -> String {
    use time::format_description::well_known::Rfc3339;
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

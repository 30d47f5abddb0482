use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use async_trait::async_trait;
use sea_orm_migration::sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::MigrateError;
use crate::history::{self, AppliedMigration, EntryKind};
use crate::placeholder::replace_placeholders;
use crate::script::{resolve_scripts, ResolvedScript, Version};
use crate::{MigrateResult, MigrationConfig, MigrationEngine};

/// Versioned SQL script runner with a schema history table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptMigrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    Pending,
    Applied,
    Baseline,
    BelowBaseline,
    /// Not applied and older than the current version.
    Ignored,
    /// Applied, but the script is no longer present locally.
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationInfo {
    pub version: String,
    pub description: String,
    pub script: String,
    pub state: MigrationState,
    pub installed_on: Option<String>,
}

#[async_trait]
impl MigrationEngine for ScriptMigrator {
    async fn migrate(
        &self,
        db: &DatabaseConnection,
        config: &MigrationConfig,
    ) -> Result<MigrateResult, MigrateError> {
        let scripts = resolve_scripts(&config.locations)?;
        debug!(resolved = scripts.len(), locations = ?config.locations, "scripts resolved");

        history::ensure_table(db).await?;
        let mut applied = history::load(db).await?;

        if applied.is_empty() && history::schema_has_objects(db).await? {
            if !config.baseline_on_migrate {
                return Err(MigrateError::NonEmptySchema);
            }
            let baseline = baseline_entry(config)?;
            history::record(db, &baseline).await?;
            info!(
                baseline_version = %baseline.version,
                "migrate=baseline description={:?}",
                baseline.description
            );
            applied.push(baseline);
        }

        if config.validate_on_migrate {
            validate_state(&scripts, &applied)?;
        }

        let applied_versions: HashSet<&Version> = applied.iter().map(|a| &a.version).collect();
        let current = applied.iter().map(|a| a.version.clone()).max();
        let mut next_rank = applied.iter().map(|a| a.installed_rank).max().unwrap_or(0) + 1;

        let mut executed = 0;
        let mut target = None;

        for script in &scripts {
            if applied_versions.contains(&script.version) {
                continue;
            }
            if let Some(current) = &current {
                if script.version <= *current {
                    warn!(
                        version = %script.version,
                        current = %current,
                        "Skipping migration older than current schema version"
                    );
                    continue;
                }
            }

            let sql = if config.placeholder_replacement {
                Cow::Owned(replace_placeholders(
                    &script.sql,
                    &config.placeholders,
                    &script.script,
                )?)
            } else {
                Cow::Borrowed(script.sql.as_str())
            };

            apply_script(db, script, &sql, next_rank).await?;
            next_rank += 1;
            executed += 1;
            target = Some(script.version.to_string());
        }

        Ok(MigrateResult {
            migrations_executed: executed,
            target_schema_version: target,
        })
    }
}

impl ScriptMigrator {
    /// Validate applied history against the scripts found in `config.locations`.
    pub async fn validate(
        &self,
        db: &DatabaseConnection,
        config: &MigrationConfig,
    ) -> Result<(), MigrateError> {
        let scripts = resolve_scripts(&config.locations)?;
        history::ensure_table(db).await?;
        let applied = history::load(db).await?;
        validate_state(&scripts, &applied)
    }

    /// Per-version state of every applied and resolved migration.
    pub async fn info(
        &self,
        db: &DatabaseConnection,
        config: &MigrationConfig,
    ) -> Result<Vec<MigrationInfo>, MigrateError> {
        let scripts = resolve_scripts(&config.locations)?;
        history::ensure_table(db).await?;
        let applied = history::load(db).await?;
        Ok(build_info(&scripts, &applied))
    }

    /// Drop every object the migrations manage. Refused unless clean is enabled.
    pub async fn clean(
        &self,
        db: &DatabaseConnection,
        config: &MigrationConfig,
    ) -> Result<Vec<String>, MigrateError> {
        if config.clean_disabled {
            return Err(MigrateError::CleanDisabled);
        }

        let backend = db.get_database_backend();
        let dropped = match backend {
            DatabaseBackend::Sqlite => {
                let rows = db
                    .query_all(Statement::from_string(
                        backend,
                        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                    ))
                    .await?;
                let tables = rows
                    .iter()
                    .map(|row| row.try_get::<String>("", "name"))
                    .collect::<Result<Vec<_>, _>>()?;

                db.execute_unprepared("PRAGMA foreign_keys = OFF").await?;
                for table in &tables {
                    db.execute_unprepared(&format!("DROP TABLE IF EXISTS {}", quote(table)))
                        .await?;
                }
                db.execute_unprepared("PRAGMA foreign_keys = ON").await?;
                tables
            }
            DatabaseBackend::Postgres => {
                let schema: String = match db
                    .query_one(Statement::from_string(
                        backend,
                        "SELECT current_schema()::text AS name",
                    ))
                    .await?
                {
                    Some(row) => row.try_get("", "name")?,
                    None => "public".to_string(),
                };
                db.execute_unprepared(&format!(
                    "DROP SCHEMA {0} CASCADE; CREATE SCHEMA {0};",
                    quote(&schema)
                ))
                .await?;
                vec![schema]
            }
            DatabaseBackend::MySql => {
                return Err(MigrateError::UnsupportedBackend {
                    backend: format!("{backend:?}"),
                });
            }
        };

        info!(dropped = ?dropped, "clean=done");
        Ok(dropped)
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn baseline_entry(config: &MigrationConfig) -> Result<AppliedMigration, MigrateError> {
    Ok(AppliedMigration {
        installed_rank: 1,
        version: Version::parse(&config.baseline_version)?,
        description: config.baseline_description.clone(),
        kind: EntryKind::Baseline,
        script: format!("<< {} >>", config.baseline_description),
        checksum: None,
        installed_on: history::now_timestamp(),
        execution_ms: 0,
    })
}

async fn apply_script(
    db: &DatabaseConnection,
    script: &ResolvedScript,
    sql: &str,
    rank: i32,
) -> Result<(), MigrateError> {
    let start = Instant::now();
    info!(version = %script.version, script = %script.script, "migrate=apply");

    let txn = db.begin().await?;
    if let Err(source) = txn.execute_unprepared(sql).await {
        if let Err(rollback_err) = txn.rollback().await {
            warn!(error = %rollback_err, "rollback after failed migration returned error");
        }
        return Err(MigrateError::ScriptFailed {
            script: script.script.clone(),
            source,
        });
    }

    let entry = AppliedMigration {
        installed_rank: rank,
        version: script.version.clone(),
        description: script.description.clone(),
        kind: EntryKind::Sql,
        script: script.script.clone(),
        checksum: Some(script.checksum),
        installed_on: history::now_timestamp(),
        execution_ms: start.elapsed().as_millis() as i64,
    };
    history::record(&txn, &entry).await?;
    txn.commit().await?;

    debug!(
        version = %script.version,
        elapsed_ms = start.elapsed().as_millis(),
        "migration applied"
    );
    Ok(())
}

fn baseline_version(applied: &[AppliedMigration]) -> Option<&Version> {
    applied
        .iter()
        .find(|a| a.kind == EntryKind::Baseline)
        .map(|a| &a.version)
}

fn validate_state(
    scripts: &[ResolvedScript],
    applied: &[AppliedMigration],
) -> Result<(), MigrateError> {
    let by_version: HashMap<&Version, &ResolvedScript> =
        scripts.iter().map(|s| (&s.version, s)).collect();

    for entry in applied.iter().filter(|a| a.kind == EntryKind::Sql) {
        match by_version.get(&entry.version) {
            None => {
                return Err(MigrateError::MissingScript {
                    version: entry.version.to_string(),
                })
            }
            Some(script) if entry.checksum != Some(script.checksum) => {
                return Err(MigrateError::ChecksumMismatch {
                    version: entry.version.to_string(),
                    applied: entry.checksum,
                    resolved: script.checksum,
                })
            }
            Some(_) => {}
        }
    }

    let Some(current) = applied.iter().map(|a| &a.version).max() else {
        return Ok(());
    };
    let baseline = baseline_version(applied);
    let applied_versions: HashSet<&Version> = applied.iter().map(|a| &a.version).collect();

    let out_of_order = scripts.iter().find(|s| {
        !applied_versions.contains(&s.version)
            && s.version < *current
            && baseline.map_or(true, |b| s.version > *b)
    });
    if let Some(script) = out_of_order {
        return Err(MigrateError::OutOfOrder {
            version: script.version.to_string(),
            current: current.to_string(),
        });
    }

    Ok(())
}

fn build_info(scripts: &[ResolvedScript], applied: &[AppliedMigration]) -> Vec<MigrationInfo> {
    let resolved: HashSet<&Version> = scripts.iter().map(|s| &s.version).collect();
    let applied_versions: HashSet<&Version> = applied.iter().map(|a| &a.version).collect();
    let baseline = baseline_version(applied);
    let current = applied.iter().map(|a| &a.version).max();

    let mut rows: Vec<(Version, MigrationInfo)> = applied
        .iter()
        .map(|a| {
            let state = match a.kind {
                EntryKind::Baseline => MigrationState::Baseline,
                EntryKind::Sql if resolved.contains(&a.version) => MigrationState::Applied,
                EntryKind::Sql => MigrationState::Missing,
            };
            (
                a.version.clone(),
                MigrationInfo {
                    version: a.version.to_string(),
                    description: a.description.clone(),
                    script: a.script.clone(),
                    state,
                    installed_on: Some(a.installed_on.clone()),
                },
            )
        })
        .collect();

    for script in scripts.iter().filter(|s| !applied_versions.contains(&s.version)) {
        let state = if baseline.is_some_and(|b| script.version <= *b) {
            MigrationState::BelowBaseline
        } else if current.is_some_and(|c| script.version < *c) {
            MigrationState::Ignored
        } else {
            MigrationState::Pending
        };
        rows.push((
            script.version.clone(),
            MigrationInfo {
                version: script.version.to_string(),
                description: script.description.clone(),
                script: script.script.clone(),
                state,
                installed_on: None,
            },
        ));
    }

    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows.into_iter().map(|(_, info)| info).collect()
}

use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseConnection;

use crate::{MigrateError, MigrateResult, MigrationConfig, MigrationEngine};

/// Engine over a compiled `sea-orm-migration` migrator. Script locations,
/// baseline and placeholder settings do not apply to code migrations.
pub struct CodeMigrations<M> {
    _migrator: PhantomData<fn() -> M>,
}

impl<M> CodeMigrations<M> {
    pub fn new() -> Self {
        Self {
            _migrator: PhantomData,
        }
    }
}

impl<M> Default for CodeMigrations<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M> MigrationEngine for CodeMigrations<M>
where
    M: MigratorTrait + 'static,
{
    async fn migrate(
        &self,
        db: &DatabaseConnection,
        config: &MigrationConfig,
    ) -> Result<MigrateResult, MigrateError> {
        tracing::debug!(
            locations = ?config.locations,
            "code migrations ignore script locations and placeholders"
        );

        let before = count_applied_migrations::<M>(db).await?;
        tracing::info!(
            "▶ BEFORE: runner has {} migration(s) defined, {} applied",
            M::migrations().len(),
            before
        );

        M::up(db, None).await?;

        let applied = M::get_applied_migrations(db).await?;
        let executed = applied.len().saturating_sub(before);
        tracing::info!(
            "▶ AFTER: runner has {} migration(s) defined, {} applied",
            M::migrations().len(),
            applied.len()
        );

        let target_schema_version = if executed > 0 {
            applied.last().map(|m| m.name().to_string())
        } else {
            None
        };

        Ok(MigrateResult {
            migrations_executed: executed,
            target_schema_version,
        })
    }
}

/// Count the number of migrations that have been applied to the database.
/// Returns 0 if the migration table doesn't exist yet.
pub async fn count_applied_migrations<M: MigratorTrait>(
    db: &DatabaseConnection,
) -> Result<usize, DbErr> {
    match M::get_applied_migrations(db).await {
        Ok(migrations) => Ok(migrations.len()),
        Err(DbErr::Exec(_)) => Ok(0), // Migration table doesn't exist yet
        Err(e) => Err(e),
    }
}

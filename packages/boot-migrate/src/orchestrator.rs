use migration::{MigrationEngine, ScriptMigrator};
use tokio::time::Instant;
use tracing::{error, info};

use crate::config::{BootConfig, ConnectionConfig, MigrationSettings};
use crate::error::MigrationFailed;
use crate::infra::db::{
    execute_migration, migration_counters, ConnectionFactory, MigrationOutcome,
    SeaOrmConnectionFactory,
};
use crate::resolver::ConnectionResolver;

/// Entry point for one startup migration run.
pub struct Orchestrator<F = SeaOrmConnectionFactory, E = ScriptMigrator> {
    resolver: ConnectionResolver,
    factory: F,
    engine: E,
    connection: ConnectionConfig,
    settings: MigrationSettings,
}

impl Orchestrator {
    /// Default wiring: postgres converter, sea-orm pool, SQL script engine.
    pub fn new(connection: ConnectionConfig, settings: MigrationSettings) -> Self {
        Self::with_parts(
            ConnectionResolver::default(),
            SeaOrmConnectionFactory::default(),
            ScriptMigrator,
            connection,
            settings,
        )
    }
}

impl<F, E> Orchestrator<F, E>
where
    F: ConnectionFactory,
    E: MigrationEngine,
{
    pub fn with_parts(
        resolver: ConnectionResolver,
        factory: F,
        engine: E,
        connection: ConnectionConfig,
        settings: MigrationSettings,
    ) -> Self {
        Self {
            resolver,
            factory,
            engine,
            connection,
            settings,
        }
    }

    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// Resolve the connection once, then migrate under the retry policy.
    /// `elapsed_ms` on the outcome covers every attempt and pause.
    pub async fn run(&self) -> Result<MigrationOutcome, MigrationFailed> {
        let policy = self.settings.retry_policy();
        info!(
            locations = ?self.settings.locations,
            max_attempts = policy.max_attempts(),
            retry_delay_ms = policy.delay().as_millis(),
            "migrate=start"
        );

        let result = match self.resolver.resolve(&self.connection) {
            Ok(descriptor) => {
                let descriptor = &descriptor;
                let start = Instant::now();
                policy
                    .run_with_retry(|attempt| {
                        info!(attempt, "migrate=attempt");
                        execute_migration(&self.factory, &self.engine, descriptor, &self.settings)
                    })
                    .await
                    .map(|outcome| MigrationOutcome {
                        elapsed_ms: start.elapsed().as_millis() as u64,
                        ..outcome
                    })
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => {
                migration_counters::run_succeeded();
                info!(
                    migrations_applied = outcome.migrations_applied,
                    target_version = outcome.target_version.as_deref().unwrap_or("unchanged"),
                    elapsed_ms = outcome.elapsed_ms,
                    "migrate=done"
                );
            }
            Err(e) => {
                migration_counters::run_failed();
                error!(error = %e, "migrate=failed");
            }
        }
        migration_counters::log_snapshot("boot_migration");

        result.map_err(MigrationFailed::new)
    }
}

/// Run startup migrations if enabled. `Ok(None)` means they were skipped.
pub async fn run_migrations(config: &BootConfig) -> Result<Option<MigrationOutcome>, MigrationFailed> {
    if !config.enabled {
        info!("migrate=skipped enabled=false");
        return Ok(None);
    }

    Orchestrator::new(config.connection.clone(), config.settings.clone())
        .run()
        .await
        .map(Some)
}

/// Load startup configuration through `lookup` and run. Malformed settings
/// are reported as `MigrationFailed` like any other startup failure.
pub async fn run_migrations_from_lookup<L>(
    lookup: L,
) -> Result<Option<MigrationOutcome>, MigrationFailed>
where
    L: Fn(&str) -> Option<String>,
{
    let config = BootConfig::from_lookup(lookup).map_err(|e| {
        error!(error = %e, "migrate=failed");
        MigrationFailed::new(e)
    })?;
    run_migrations(&config).await
}

pub async fn run_migrations_from_env() -> Result<Option<MigrationOutcome>, MigrationFailed> {
    run_migrations_from_lookup(|key| std::env::var(key).ok()).await
}

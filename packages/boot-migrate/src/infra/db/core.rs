use std::time::Duration;

use migration::MigrationEngine;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{ConnectionDescriptor, MigrationSettings};
use crate::error::MigrationError;
use crate::infra::db::diagnostics::migration_counters;
use crate::infra::db::pool::{sanitize_db_url, ConnectionFactory, ConnectionHandle};

pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one successful migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub migrations_applied: usize,
    /// Only set when at least one migration was applied.
    pub target_version: Option<String>,
    pub elapsed_ms: u64,
}

/// Open a handle and check it is alive. A handle that fails the check is
/// released before returning.
pub async fn acquire_validated<F>(
    factory: &F,
    descriptor: &ConnectionDescriptor,
) -> Result<F::Handle, MigrationError>
where
    F: ConnectionFactory,
{
    let handle = factory.open(descriptor).await.map_err(|source| {
        migration_counters::acquisition_failed();
        MigrationError::ConnectionAcquisitionFailed { source }
    })?;

    if !handle.is_valid(VALIDATION_TIMEOUT).await {
        migration_counters::validation_failed();
        release(handle).await;
        return Err(MigrationError::ConnectionValidationFailed);
    }

    debug!(url = %sanitize_db_url(&descriptor.url), "migration connection validated");
    Ok(handle)
}

/// Close `handle`. Failures are logged and dropped so they never replace the
/// result of the attempt that used it.
pub async fn release<H>(handle: H)
where
    H: ConnectionHandle,
{
    if let Err(e) = handle.close().await {
        migration_counters::release_failed();
        warn!(error = %e, "Failed to release migration connection");
    }
}

/// One attempt: acquire, validate, migrate, release. No retry.
pub async fn execute_migration<F, E>(
    factory: &F,
    engine: &E,
    descriptor: &ConnectionDescriptor,
    settings: &MigrationSettings,
) -> Result<MigrationOutcome, MigrationError>
where
    F: ConnectionFactory,
    E: MigrationEngine + ?Sized,
{
    let start = Instant::now();
    let handle = acquire_validated(factory, descriptor).await?;

    let config = settings.engine_config();
    let result = engine.migrate(handle.connection(), &config).await;
    release(handle).await;

    let result = result.map_err(|e| {
        migration_counters::engine_failed();
        MigrationError::from(e)
    })?;

    let outcome = MigrationOutcome {
        migrations_applied: result.migrations_executed,
        target_version: result.target_schema_version,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        migrations_applied = outcome.migrations_applied,
        target_version = ?outcome.target_version,
        elapsed_ms = outcome.elapsed_ms,
        "migrate=attempt_done"
    );
    Ok(outcome)
}

use migration::MigrateError;
use sea_orm::DbErr;
use thiserror::Error;

use crate::config::ConfigGroup;

/// Every way a startup migration can fail, below the top-level [`MigrationFailed`].
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("{group} connection configuration requires url, username and password to all be set")]
    IncompleteConfiguration { group: ConfigGroup },

    #[error(
        "no database connection configuration found; set BOOTMIGRATE_URL/USERNAME/PASSWORD \
         (jdbc:postgresql://...) or R2DBC_URL/USERNAME/PASSWORD (r2dbc:postgresql://...)"
    )]
    NoConfigurationFound,

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidSetting {
        key: String,
        value: String,
        reason: String,
    },

    #[error(
        "database '{dialect}' cannot be converted from its r2dbc url; currently supported: postgresql. \
         Provide a direct connection (BOOTMIGRATE_URL=jdbc:{dialect}://...) instead"
    )]
    UnsupportedDialect { dialect: String },

    #[error("failed to acquire database connection: {source}")]
    ConnectionAcquisitionFailed {
        #[source]
        source: DbErr,
    },

    #[error("database connection validation failed")]
    ConnectionValidationFailed,

    #[error("migration engine failed: {source}")]
    MigrationEngineFailure {
        #[from]
        source: MigrateError,
    },

    #[error("failed to execute migrations after {attempts} attempt(s): {last_cause}")]
    MigrationRetriesExhausted {
        attempts: u32,
        #[source]
        last_cause: Box<MigrationError>,
    },
}

impl MigrationError {
    /// Only connectivity failures can succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MigrationError::ConnectionAcquisitionFailed { .. }
                | MigrationError::ConnectionValidationFailed
        )
    }
}

/// The single error surfaced to the host. Startup must abort on it.
#[derive(Debug, Error)]
#[error("database migration failed during application startup")]
pub struct MigrationFailed {
    #[source]
    cause: MigrationError,
}

impl MigrationFailed {
    pub fn new(cause: MigrationError) -> Self {
        Self { cause }
    }

    pub fn cause(&self) -> &MigrationError {
        &self.cause
    }

    pub fn into_cause(self) -> MigrationError {
        self.cause
    }
}

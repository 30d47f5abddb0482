use std::path::PathBuf;

use sea_orm_migration::sea_orm::DbErr;
use thiserror::Error;

/// Failures raised by a migration engine. None of these are connectivity
/// problems: retrying the same run cannot change the outcome.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("invalid migration location '{location}': only 'filesystem:' or plain directory paths are supported")]
    InvalidLocation { location: String },

    #[error("failed to read migration scripts at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid migration script name '{name}': {reason}")]
    InvalidScriptName { name: String, reason: String },

    #[error("invalid migration version '{version}'")]
    InvalidVersion { version: String },

    #[error("found more than one migration with version {version} ({first} and {second})")]
    DuplicateVersion {
        version: String,
        first: String,
        second: String,
    },

    #[error("no value provided for placeholder '${{{name}}}' in {script}")]
    UnresolvedPlaceholder { script: String, name: String },

    #[error("validation failed: migration checksum mismatch for version {version} (applied {applied:?}, resolved {resolved})")]
    ChecksumMismatch {
        version: String,
        applied: Option<i64>,
        resolved: i64,
    },

    #[error("validation failed: detected applied migration not resolved locally: {version}")]
    MissingScript { version: String },

    #[error("validation failed: detected resolved migration not applied to database: {version} (current version is {current})")]
    OutOfOrder { version: String, current: String },

    #[error("found non-empty schema without schema history table; enable baseline-on-migrate to initialize it")]
    NonEmptySchema,

    #[error("migration {script} failed: {source}")]
    ScriptFailed {
        script: String,
        #[source]
        source: DbErr,
    },

    #[error("clean is disabled by configuration")]
    CleanDisabled,

    #[error("database backend {backend} is not supported by this operation")]
    UnsupportedBackend { backend: String },

    #[error("schema history error: {0}")]
    Db(#[from] DbErr),
}

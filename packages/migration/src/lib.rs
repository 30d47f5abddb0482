//! Migration engines behind a narrow "configure + run" contract.
//!
//! An engine is handed an open connection and a [`MigrationConfig`], applies
//! whatever is pending, and reports how many migrations ran. Connection
//! management and retries live with the caller.

pub use sea_orm_migration::sea_orm;
pub use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};

use std::collections::HashMap;

mod code;
mod engine;
mod error;
pub mod history;
mod placeholder;
pub mod script;

pub use code::{count_applied_migrations, CodeMigrations};
pub use engine::{MigrationInfo, MigrationState, ScriptMigrator};
pub use error::MigrateError;
pub use placeholder::replace_placeholders;
pub use script::Version;

pub const DEFAULT_LOCATION: &str = "db/migration";

/// Everything an engine needs to know about one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    pub locations: Vec<String>,
    pub baseline_on_migrate: bool,
    pub validate_on_migrate: bool,
    pub clean_disabled: bool,
    pub baseline_version: String,
    pub baseline_description: String,
    pub placeholder_replacement: bool,
    pub placeholders: HashMap<String, String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            locations: vec![DEFAULT_LOCATION.to_string()],
            baseline_on_migrate: false,
            validate_on_migrate: true,
            clean_disabled: true,
            baseline_version: "1".to_string(),
            baseline_description: "Initial version".to_string(),
            placeholder_replacement: false,
            placeholders: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrateResult {
    pub migrations_executed: usize,
    /// Version reached by this run; `None` when nothing was applied.
    pub target_schema_version: Option<String>,
}

#[async_trait::async_trait]
pub trait MigrationEngine: Send + Sync {
    async fn migrate(
        &self,
        db: &DatabaseConnection,
        config: &MigrationConfig,
    ) -> Result<MigrateResult, MigrateError>;
}

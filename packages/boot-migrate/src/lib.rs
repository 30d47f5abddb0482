//! Startup database migrations.
//!
//! Resolves one connection from either a direct or a delegated (r2dbc-style)
//! configuration group, opens a temporary pool, runs the migration engine
//! with bounded retry, and always closes the pool again.

pub mod config;
pub mod convert;
pub mod error;
pub mod infra;
pub mod orchestrator;
pub mod resolver;

pub use config::{BootConfig, ConnectionConfig, ConnectionDescriptor, ConnectionGroup, MigrationSettings};
pub use convert::{ConverterRegistry, DialectConverter, PostgresConverter};
pub use error::{MigrationError, MigrationFailed};
pub use infra::db::{MigrationOutcome, RetryPolicy};
pub use orchestrator::{
    run_migrations, run_migrations_from_env, run_migrations_from_lookup, Orchestrator,
};
pub use resolver::ConnectionResolver;

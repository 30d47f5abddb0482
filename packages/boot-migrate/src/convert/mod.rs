//! Delegated (r2dbc-style) connection strings translated into direct driver descriptors.

mod postgres;
mod registry;

pub use postgres::PostgresConverter;
pub use registry::{dialect_name, ConverterRegistry};

use crate::config::ConnectionDescriptor;
use crate::error::MigrationError;

/// Translation for one database family.
pub trait DialectConverter: Send + Sync {
    /// Family name used in logs.
    fn name(&self) -> &'static str;

    fn supports(&self, url: &str) -> bool;

    /// Fails with `UnsupportedDialect` when `url` is not one of ours.
    fn convert(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<ConnectionDescriptor, MigrationError>;
}

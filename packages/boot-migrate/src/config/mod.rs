//! Configuration surface: the two connection groups, migration settings and
//! the environment loader that fills them.

pub mod connection;
pub mod env;
pub mod settings;

pub use connection::{ConfigGroup, ConnectionConfig, ConnectionDescriptor, ConnectionGroup};
pub use env::BootConfig;
pub use settings::MigrationSettings;

pub mod core;
pub mod diagnostics;
pub mod pool;
pub mod retry;

pub use self::core::{acquire_validated, execute_migration, release, MigrationOutcome, VALIDATION_TIMEOUT};
pub use diagnostics::migration_counters;
pub use pool::{
    driver_target, sanitize_db_url, ConnectionFactory, ConnectionHandle, DriverTarget,
    PoolSettings, SeaOrmConnectionFactory, TempPool,
};
pub use retry::RetryPolicy;

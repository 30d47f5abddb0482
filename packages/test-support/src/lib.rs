//! Test support utilities
//!
//! Unified logging initialization plus throwaway SQLite databases and
//! migration script directories for tests that exercise a real connection.

pub mod logging;
pub mod sqlite;

pub use sqlite::{ScriptDir, TempSqlite};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A SQLite database file inside its own temporary directory.
/// The directory (and the database) is removed on drop.
pub struct TempSqlite {
    _dir: TempDir,
    path: PathBuf,
}

impl TempSqlite {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("migrations_test.db");
        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Synchronous-driver style URL, as a host would configure it.
    pub fn jdbc_url(&self) -> String {
        format!("jdbc:sqlite:{}", self.path.display())
    }

    /// URL understood by sea-orm / sqlx directly.
    pub fn driver_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path.display())
    }
}

/// A temporary directory holding versioned migration scripts.
pub struct ScriptDir {
    dir: TempDir,
}

impl ScriptDir {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Location string in `filesystem:` form.
    pub fn location(&self) -> String {
        format!("filesystem:{}", self.dir.path().display())
    }

    pub fn write(&self, file_name: &str, sql: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, sql)?;
        Ok(path)
    }

    pub fn remove(&self, file_name: &str) -> io::Result<()> {
        fs::remove_file(self.dir.path().join(file_name))
    }
}

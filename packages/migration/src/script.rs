// Versioned SQL script discovery: `V<version>__<description>.sql`.

use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::MigrateError;

const FILESYSTEM_PREFIX: &str = "filesystem:";
const SCRIPT_PREFIX: char = 'V';
const SCRIPT_SEPARATOR: &str = "__";
const SCRIPT_SUFFIX: &str = ".sql";

/// Dotted numeric migration version. `1`, `1.0` and `1_0` are the same version.
#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
}

impl Version {
    pub fn parse(raw: &str) -> Result<Self, MigrateError> {
        let invalid = || MigrateError::InvalidVersion {
            version: raw.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let parts = trimmed
            .split(['.', '_'])
            .map(|segment| segment.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { parts })
    }

    fn significant(&self) -> &[u64] {
        let end = self
            .parts
            .iter()
            .rposition(|part| *part != 0)
            .map_or(0, |idx| idx + 1);
        &self.parts[..end]
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.significant(), other.significant());
        for idx in 0..a.len().max(b.len()) {
            let left = a.get(idx).copied().unwrap_or(0);
            let right = b.get(idx).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.parts {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
            first = false;
        }
        Ok(())
    }
}

/// A migration script found in one of the configured locations.
#[derive(Debug, Clone)]
pub struct ResolvedScript {
    pub version: Version,
    pub description: String,
    /// File name, as recorded in the schema history.
    pub script: String,
    pub path: PathBuf,
    pub checksum: i64,
    pub sql: String,
}

/// Checksum of the raw script text with line endings normalized.
pub fn checksum(content: &str) -> i64 {
    let normalized = content.replace("\r\n", "\n");
    xxh3_64(normalized.as_bytes()) as i64
}

/// Parse a script file name. Returns `Ok(None)` for files that are not
/// versioned migrations (wrong extension, repeatable or undo scripts).
pub fn parse_script_name(file_name: &str) -> Result<Option<(Version, String)>, MigrateError> {
    let Some(stem) = file_name.strip_suffix(SCRIPT_SUFFIX) else {
        return Ok(None);
    };
    let Some(rest) = stem.strip_prefix(SCRIPT_PREFIX) else {
        return Ok(None);
    };

    let Some((raw_version, raw_description)) = rest.split_once(SCRIPT_SEPARATOR) else {
        return Err(MigrateError::InvalidScriptName {
            name: file_name.to_string(),
            reason: format!("missing '{SCRIPT_SEPARATOR}' between version and description"),
        });
    };

    let version = Version::parse(raw_version).map_err(|_| MigrateError::InvalidScriptName {
        name: file_name.to_string(),
        reason: format!("'{raw_version}' is not a dotted numeric version"),
    })?;

    Ok(Some((version, raw_description.replace('_', " "))))
}

/// Map a configured location onto a directory.
pub fn location_dir(location: &str) -> Result<PathBuf, MigrateError> {
    let trimmed = location.trim();
    let invalid = || MigrateError::InvalidLocation {
        location: location.to_string(),
    };

    if let Some(path) = trimmed.strip_prefix(FILESYSTEM_PREFIX) {
        if path.trim().is_empty() {
            return Err(invalid());
        }
        return Ok(PathBuf::from(path.trim()));
    }

    if trimmed.is_empty() {
        return Err(invalid());
    }

    // `classpath:` and friends have no meaning here; a single letter is a drive.
    match trimmed.split_once(':') {
        Some((prefix, _)) if prefix.len() > 1 && !prefix.contains(['/', '\\']) => Err(invalid()),
        _ => Ok(PathBuf::from(trimmed)),
    }
}

/// Discover all versioned scripts across `locations`, sorted by version.
pub fn resolve_scripts(locations: &[String]) -> Result<Vec<ResolvedScript>, MigrateError> {
    let mut scripts = Vec::new();

    for location in locations {
        let dir = location_dir(location)?;
        if !dir.is_dir() {
            warn!(location = %location, "Skipping migration location: directory not found");
            continue;
        }

        for path in sql_files(&dir)? {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((version, description)) = parse_script_name(file_name)? else {
                debug!(file = %path.display(), "Ignoring non-versioned file");
                continue;
            };

            let sql = fs::read_to_string(&path).map_err(|source| MigrateError::Io {
                path: path.clone(),
                source,
            })?;

            scripts.push(ResolvedScript {
                version,
                description,
                script: file_name.to_string(),
                checksum: checksum(&sql),
                path,
                sql,
            });
        }
    }

    scripts.sort_by(|a, b| a.version.cmp(&b.version));

    if let Some(pair) = scripts.windows(2).find(|w| w[0].version == w[1].version) {
        return Err(MigrateError::DuplicateVersion {
            version: pair[0].version.to_string(),
            first: pair[0].path.display().to_string(),
            second: pair[1].path.display().to_string(),
        });
    }

    Ok(scripts)
}

fn sql_files(root: &Path) -> Result<Vec<PathBuf>, MigrateError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| MigrateError::Io { path, source }
    };

    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
            let path = entry.map_err(io_err(&dir))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "sql") {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

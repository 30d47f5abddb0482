use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::config::{ConnectionConfig, ConnectionGroup, MigrationSettings};
use crate::error::MigrationError;

pub const ENABLED: &str = "BOOTMIGRATE_ENABLED";
pub const URL: &str = "BOOTMIGRATE_URL";
pub const USERNAME: &str = "BOOTMIGRATE_USERNAME";
pub const PASSWORD: &str = "BOOTMIGRATE_PASSWORD";
pub const LOCATIONS: &str = "BOOTMIGRATE_LOCATIONS";
pub const BASELINE_ON_MIGRATE: &str = "BOOTMIGRATE_BASELINE_ON_MIGRATE";
pub const VALIDATE_ON_MIGRATE: &str = "BOOTMIGRATE_VALIDATE_ON_MIGRATE";
pub const CLEAN_DISABLED: &str = "BOOTMIGRATE_CLEAN_DISABLED";
pub const BASELINE_VERSION: &str = "BOOTMIGRATE_BASELINE_VERSION";
pub const BASELINE_DESCRIPTION: &str = "BOOTMIGRATE_BASELINE_DESCRIPTION";
pub const PLACEHOLDER_REPLACEMENT: &str = "BOOTMIGRATE_PLACEHOLDER_REPLACEMENT";
pub const PLACEHOLDERS: &str = "BOOTMIGRATE_PLACEHOLDERS";
pub const CONNECTION_RETRIES: &str = "BOOTMIGRATE_CONNECTION_RETRIES";
pub const CONNECTION_RETRY_DELAY: &str = "BOOTMIGRATE_CONNECTION_RETRY_DELAY";

// Owned by the host's data-access layer; read, never written.
pub const DELEGATED_URL: &str = "R2DBC_URL";
pub const DELEGATED_USERNAME: &str = "R2DBC_USERNAME";
pub const DELEGATED_PASSWORD: &str = "R2DBC_PASSWORD";

/// Everything the host needs to decide whether and how to migrate at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootConfig {
    /// Opt-in; migrations never run unless this is set.
    pub enabled: bool,
    pub connection: ConnectionConfig,
    pub settings: MigrationSettings,
}

impl BootConfig {
    /// Startup configuration from the process environment. See [`BootConfig::from_lookup`].
    pub fn from_env() -> Result<Self, MigrationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Every setting from the process environment, whether or not migrations
    /// are enabled. Used by maintenance commands.
    pub fn parse_env() -> Result<Self, MigrationError> {
        Self::parse_lookup(|key| env::var(key).ok())
    }

    /// Startup configuration. When migrations are disabled nothing else is
    /// read, so a bad migration setting cannot stop the host from starting.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, MigrationError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let enabled = match lookup(ENABLED).filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_bool(ENABLED, &raw)?,
            None => false,
        };
        if !enabled {
            return Ok(Self::default());
        }
        Self::parse_lookup(lookup)
    }

    /// Build from any key lookup. Blank values are treated as unset.
    pub fn parse_lookup<L>(lookup: L) -> Result<Self, MigrationError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = MigrationSettings::default();

        let flag = |key: &str, default: bool| -> Result<bool, MigrationError> {
            var(key).map_or(Ok(default), |raw| parse_bool(key, &raw))
        };

        let locations = match var(LOCATIONS) {
            Some(raw) => {
                let list = parse_list(&raw);
                if list.is_empty() {
                    return Err(invalid(LOCATIONS, &raw, "at least one location is required"));
                }
                list
            }
            None => defaults.locations,
        };

        let placeholders = match var(PLACEHOLDERS) {
            Some(raw) => parse_placeholders(PLACEHOLDERS, &raw)?,
            None => HashMap::new(),
        };

        let connection_retries = match var(CONNECTION_RETRIES) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| invalid(CONNECTION_RETRIES, &raw, "expected a non-negative integer"))?,
            None => defaults.connection_retries,
        };

        let connection_retry_delay = match var(CONNECTION_RETRY_DELAY) {
            Some(raw) => parse_duration(CONNECTION_RETRY_DELAY, &raw)?,
            None => defaults.connection_retry_delay,
        };

        let settings = MigrationSettings {
            locations,
            baseline_on_migrate: flag(BASELINE_ON_MIGRATE, defaults.baseline_on_migrate)?,
            validate_on_migrate: flag(VALIDATE_ON_MIGRATE, defaults.validate_on_migrate)?,
            clean_disabled: flag(CLEAN_DISABLED, defaults.clean_disabled)?,
            baseline_version: var(BASELINE_VERSION).unwrap_or(defaults.baseline_version),
            baseline_description: var(BASELINE_DESCRIPTION)
                .unwrap_or(defaults.baseline_description),
            placeholder_replacement: flag(
                PLACEHOLDER_REPLACEMENT,
                defaults.placeholder_replacement,
            )?,
            placeholders,
            connection_retries,
            connection_retry_delay,
        };

        let connection = ConnectionConfig {
            direct: ConnectionGroup {
                url: var(URL),
                username: var(USERNAME),
                password: var(PASSWORD),
            },
            delegated: ConnectionGroup {
                url: var(DELEGATED_URL),
                username: var(DELEGATED_USERNAME),
                password: var(DELEGATED_PASSWORD),
            },
        };

        Ok(Self {
            enabled: flag(ENABLED, false)?,
            connection,
            settings,
        })
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> MigrationError {
    MigrationError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, MigrationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, raw, "expected true or false")),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `key=value` pairs separated by commas.
fn parse_placeholders(key: &str, raw: &str) -> Result<HashMap<String, String>, MigrationError> {
    let mut placeholders = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((name, value)) = pair.split_once('=') else {
            return Err(invalid(key, raw, "expected name=value pairs"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid(key, raw, "placeholder name must not be empty"));
        }
        placeholders.insert(name.to_string(), value.trim().to_string());
    }
    Ok(placeholders)
}

/// Accepts `500ms`, `2s`, `1m`, ISO-8601 `PT2S` / `PT1M`, or a bare number of milliseconds.
fn parse_duration(key: &str, raw: &str) -> Result<Duration, MigrationError> {
    let value = raw.trim();
    let fail = || invalid(key, raw, "expected a duration such as 500ms, 2s, 1m or PT2S");

    let upper = value.to_ascii_uppercase();
    let (number, unit_ms) = if let Some(iso) = upper.strip_prefix("PT") {
        if let Some(n) = iso.strip_suffix('S') {
            (n.to_string(), 1_000)
        } else if let Some(n) = iso.strip_suffix('M') {
            (n.to_string(), 60_000)
        } else {
            return Err(fail());
        }
    } else if let Some(n) = value.strip_suffix("ms") {
        (n.to_string(), 1)
    } else if let Some(n) = value.strip_suffix('s') {
        (n.to_string(), 1_000)
    } else if let Some(n) = value.strip_suffix('m') {
        (n.to_string(), 60_000)
    } else {
        (value.to_string(), 1)
    };

    let amount: u64 = number.trim().parse().map_err(|_| fail())?;
    Ok(Duration::from_millis(amount.saturating_mul(unit_ms)))
}

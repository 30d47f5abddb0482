use std::collections::HashMap;
use std::time::Duration;

use migration::{MigrationConfig, DEFAULT_LOCATION};

use crate::infra::db::retry::RetryPolicy;

pub const DEFAULT_CONNECTION_RETRIES: u32 = 3;
pub const DEFAULT_CONNECTION_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Settings for one migration run. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    pub locations: Vec<String>,
    pub baseline_on_migrate: bool,
    pub validate_on_migrate: bool,
    pub clean_disabled: bool,
    pub baseline_version: String,
    pub baseline_description: String,
    pub placeholder_replacement: bool,
    pub placeholders: HashMap<String, String>,
    pub connection_retries: u32,
    pub connection_retry_delay: Duration,
}

impl Default for MigrationSettings {
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
            connection_retries: DEFAULT_CONNECTION_RETRIES,
            connection_retry_delay: DEFAULT_CONNECTION_RETRY_DELAY,
        }
    }
}

impl MigrationSettings {
    /// The engine-facing part of the settings.
    pub fn engine_config(&self) -> MigrationConfig {
        MigrationConfig {
            locations: self.locations.clone(),
            baseline_on_migrate: self.baseline_on_migrate,
            validate_on_migrate: self.validate_on_migrate,
            clean_disabled: self.clean_disabled,
            baseline_version: self.baseline_version.clone(),
            baseline_description: self.baseline_description.clone(),
            placeholder_replacement: self.placeholder_replacement,
            placeholders: self.placeholders.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.connection_retries, self.connection_retry_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = MigrationSettings::default();
        assert_eq!(settings.locations, vec!["db/migration".to_string()]);
        assert!(!settings.baseline_on_migrate);
        assert!(settings.validate_on_migrate);
        assert!(settings.clean_disabled);
        assert_eq!(settings.baseline_version, "1");
        assert_eq!(settings.baseline_description, "Initial version");
        assert!(!settings.placeholder_replacement);
        assert!(settings.placeholders.is_empty());
        assert_eq!(settings.connection_retries, 3);
        assert_eq!(settings.connection_retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn engine_config_carries_every_engine_setting() {
        let settings = MigrationSettings {
            locations: vec!["filesystem:sql".into(), "db/data".into()],
            baseline_on_migrate: true,
            validate_on_migrate: false,
            clean_disabled: false,
            baseline_version: "0".into(),
            baseline_description: "Custom baseline".into(),
            placeholder_replacement: true,
            placeholders: HashMap::from([("env".to_string(), "test".to_string())]),
            ..MigrationSettings::default()
        };

        let config = settings.engine_config();
        assert_eq!(config.locations, settings.locations);
        assert!(config.baseline_on_migrate);
        assert!(!config.validate_on_migrate);
        assert!(!config.clean_disabled);
        assert_eq!(config.baseline_version, "0");
        assert_eq!(config.baseline_description, "Custom baseline");
        assert!(config.placeholder_replacement);
        assert_eq!(config.placeholders.get("env").map(String::as_str), Some("test"));
    }
}

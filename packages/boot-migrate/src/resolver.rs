use tracing::{debug, info};

use crate::config::{ConfigGroup, ConnectionConfig, ConnectionDescriptor, ConnectionGroup};
use crate::convert::ConverterRegistry;
use crate::error::MigrationError;
use crate::infra::db::sanitize_db_url;

/// Picks the connection used for migrations.
///
/// A direct group with a url always wins and is returned unchanged. Otherwise
/// the delegated group is converted through the registry. Neither present is
/// an error.
#[derive(Default)]
pub struct ConnectionResolver {
    registry: ConverterRegistry,
}

impl ConnectionResolver {
    pub fn new(registry: ConverterRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, config: &ConnectionConfig) -> Result<ConnectionDescriptor, MigrationError> {
        if let Some(url) = config.direct.url() {
            let (username, password) = complete(&config.direct, ConfigGroup::Direct)?;
            info!(source = "direct", url = %sanitize_db_url(url), "migration connection resolved");
            return Ok(ConnectionDescriptor::new(url, username, password));
        }

        if let Some(url) = config.delegated.url() {
            let (username, password) = complete(&config.delegated, ConfigGroup::Delegated)?;
            let converter = self.registry.find_converter(url)?;
            let descriptor = converter.convert(url, username, password)?;
            info!(
                source = "delegated",
                converter = converter.name(),
                url = %sanitize_db_url(&descriptor.url),
                "migration connection resolved"
            );
            return Ok(descriptor);
        }

        debug!("no connection group has a url");
        Err(MigrationError::NoConfigurationFound)
    }
}

fn complete(group: &ConnectionGroup, which: ConfigGroup) -> Result<(&str, &str), MigrationError> {
    group
        .credentials()
        .ok_or(MigrationError::IncompleteConfiguration { group: which })
}

use tracing::{debug, warn};

use super::DialectConverter;
use crate::config::ConnectionDescriptor;
use crate::error::MigrationError;

const DELEGATED_PREFIX: &str = "r2dbc:postgresql://";
const DIRECT_PREFIX: &str = "jdbc:postgresql://";
const SUPPORTED_OPTIONS: &[&str] = &["currentSchema", "sslmode", "sslcert", "sslkey", "sslrootcert"];

/// `r2dbc:postgresql://` to `jdbc:postgresql://`.
///
/// Host, port and path are kept as written. Query options the direct driver
/// does not understand are dropped with a warning; anything starting with
/// `ssl` is passed through.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConverter;

impl DialectConverter for PostgresConverter {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn supports(&self, url: &str) -> bool {
        url.starts_with(DELEGATED_PREFIX)
    }

    fn convert(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<ConnectionDescriptor, MigrationError> {
        let Some(rest) = url.strip_prefix(DELEGATED_PREFIX) else {
            return Err(MigrationError::UnsupportedDialect {
                dialect: super::dialect_name(url).to_string(),
            });
        };

        let converted = match rest.split_once('?') {
            Some((base, options)) => {
                let kept = retain_options(options);
                if kept.is_empty() {
                    format!("{DIRECT_PREFIX}{base}")
                } else {
                    format!("{DIRECT_PREFIX}{base}?{kept}")
                }
            }
            None => format!("{DIRECT_PREFIX}{rest}"),
        };

        debug!(converted = %converted, "delegated postgres url converted");
        Ok(ConnectionDescriptor::new(converted, username, password))
    }
}

fn retain_options(options: &str) -> String {
    options
        .split('&')
        .filter(|token| !token.trim().is_empty())
        .filter(|token| {
            let key = token.split_once('=').map_or(*token, |(key, _)| key);
            let keep = SUPPORTED_OPTIONS.contains(&key) || key.starts_with("ssl");
            if !keep {
                warn!(option = %key, "delegated url option is not supported by the direct driver and was dropped");
            }
            keep
        })
        .collect::<Vec<_>>()
        .join("&")
}

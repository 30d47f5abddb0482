use lazy_regex::regex_captures;
use tracing::debug;

use super::{DialectConverter, PostgresConverter};
use crate::error::MigrationError;

/// Ordered set of converters. The first one whose `supports` matches wins.
pub struct ConverterRegistry {
    converters: Vec<Box<dyn DialectConverter>>,
}

impl ConverterRegistry {
    /// A registry with nothing registered.
    pub fn new() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    pub fn register<C>(mut self, converter: C) -> Self
    where
        C: DialectConverter + 'static,
    {
        self.converters.push(Box::new(converter));
        self
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn find_converter(&self, url: &str) -> Result<&dyn DialectConverter, MigrationError> {
        match self.converters.iter().find(|c| c.supports(url)) {
            Some(converter) => {
                debug!(converter = converter.name(), "delegated url matched converter");
                Ok(converter.as_ref())
            }
            None => Err(MigrationError::UnsupportedDialect {
                dialect: dialect_name(url).to_string(),
            }),
        }
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new().register(PostgresConverter)
    }
}

/// The scheme token of a delegated url: `postgresql` in `r2dbc:postgresql://...`.
pub fn dialect_name(url: &str) -> &str {
    match regex_captures!(r"r2dbc:([^:]+)://", url) {
        Some((_, name)) => name,
        None => "unknown",
    }
}

//! Short-lived pools opened only for the duration of one migration attempt.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::{debug, warn};

use crate::config::ConnectionDescriptor;

const POSTGRES_PREFIX: &str = "jdbc:postgresql://";
const SQLITE_PREFIX: &str = "jdbc:sqlite:";
const CURRENT_SCHEMA: &str = "currentSchema";

// Userinfo characters that survive unencoded.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Sizing for the temporary pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 2,
            min_connections: 0,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(10),
            max_lifetime: Duration::from_secs(60),
        }
    }
}

/// A scoped connection resource. Owners must call [`ConnectionHandle::close`].
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    fn connection(&self) -> &DatabaseConnection;

    /// Liveness check bounded by `timeout`.
    async fn is_valid(&self, timeout: Duration) -> bool;

    async fn close(self) -> Result<(), DbErr>;
}

/// Given credentials, produce a closeable handle.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    type Handle: ConnectionHandle;

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Self::Handle, DbErr>;
}

#[derive(Debug, Clone, Default)]
pub struct SeaOrmConnectionFactory {
    settings: PoolSettings,
}

impl SeaOrmConnectionFactory {
    pub fn new(settings: PoolSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn connect_options(&self, descriptor: &ConnectionDescriptor) -> Result<ConnectOptions, DbErr> {
        let target = driver_target(descriptor)?;
        let mut opt = ConnectOptions::new(target.url);
        opt.max_connections(self.settings.max_connections)
            .min_connections(self.settings.min_connections)
            .connect_timeout(self.settings.connect_timeout)
            .acquire_timeout(self.settings.connect_timeout)
            .idle_timeout(self.settings.idle_timeout)
            .max_lifetime(self.settings.max_lifetime)
            .sqlx_logging(false);
        if let Some(schema) = target.schema {
            opt.set_schema_search_path(schema);
        }
        Ok(opt)
    }
}

#[async_trait]
impl ConnectionFactory for SeaOrmConnectionFactory {
    type Handle = TempPool;

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<TempPool, DbErr> {
        let opt = self.connect_options(descriptor)?;
        debug!(
            url = %sanitize_db_url(opt.get_url()),
            max_connections = self.settings.max_connections,
            "opening temporary migration pool"
        );
        let conn = Database::connect(opt).await?;
        Ok(TempPool { conn })
    }
}

/// sea-orm pool owned by exactly one migration attempt.
#[derive(Debug)]
pub struct TempPool {
    conn: DatabaseConnection,
}

#[async_trait]
impl ConnectionHandle for TempPool {
    fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    async fn is_valid(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.conn.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "connection liveness check failed");
                false
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis(), "connection liveness check timed out");
                false
            }
        }
    }

    async fn close(self) -> Result<(), DbErr> {
        self.conn.close().await
    }
}

/// Driver url plus the schema search path pulled out of its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverTarget {
    pub url: String,
    pub schema: Option<String>,
}

/// Map a `jdbc:` descriptor onto a sea-orm driver url.
pub fn driver_target(descriptor: &ConnectionDescriptor) -> Result<DriverTarget, DbErr> {
    let url = descriptor.url.trim();

    if let Some(rest) = url.strip_prefix(POSTGRES_PREFIX) {
        return Ok(postgres_target(rest, &descriptor.username, &descriptor.password));
    }

    if let Some(path) = url.strip_prefix(SQLITE_PREFIX) {
        let url = match path {
            "" => {
                return Err(DbErr::Custom(
                    "jdbc:sqlite url has no database path".to_string(),
                ))
            }
            ":memory:" => "sqlite::memory:".to_string(),
            path => format!("sqlite:{path}?mode=rwc"),
        };
        return Ok(DriverTarget { url, schema: None });
    }

    Err(DbErr::Custom(format!(
        "unsupported connection url '{}': expected jdbc:postgresql:// or jdbc:sqlite:",
        sanitize_db_url(url)
    )))
}

fn postgres_target(rest: &str, username: &str, password: &str) -> DriverTarget {
    let (location, options) = match rest.split_once('?') {
        Some((location, options)) => (location, Some(options)),
        None => (rest, None),
    };

    let mut schema = None;
    let mut kept = Vec::new();
    for token in options.into_iter().flat_map(|o| o.split('&')) {
        if token.is_empty() {
            continue;
        }
        match token.split_once('=') {
            Some((CURRENT_SCHEMA, value)) if !value.is_empty() => schema = Some(value.to_string()),
            Some((CURRENT_SCHEMA, _)) => {}
            _ => kept.push(token),
        }
    }

    let user = utf8_percent_encode(username, USERINFO);
    let pass = utf8_percent_encode(password, USERINFO);
    let mut url = format!("postgresql://{user}:{pass}@{location}");
    if !kept.is_empty() {
        url.push('?');
        url.push_str(&kept.join("&"));
    }

    DriverTarget { url, schema }
}

/// Mask the password in a connection url for logging.
pub fn sanitize_db_url(url: &str) -> String {
    let Some((auth, host)) = url.rsplit_once('@') else {
        return url.to_string();
    };
    let scheme_end = auth.find("://").map_or(0, |idx| idx + 3);
    match auth[scheme_end..].rfind(':') {
        Some(colon) => format!("{}:***@{}", &auth[..scheme_end + colon], host),
        None => url.to_string(),
    }
}

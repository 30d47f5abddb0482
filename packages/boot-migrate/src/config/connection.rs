use std::fmt;

/// Which of the two connection sources a setting belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigGroup {
    /// Synchronous driver settings given directly for migrations.
    Direct,
    /// The host's non-synchronous data-access settings.
    Delegated,
}

impl fmt::Display for ConfigGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigGroup::Direct => f.write_str("direct"),
            ConfigGroup::Delegated => f.write_str("delegated"),
        }
    }
}

/// One `{url, username, password}` group. A group whose url is blank is absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionGroup {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ConnectionGroup {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: Some(url.into()),
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    pub fn url(&self) -> Option<&str> {
        non_blank(&self.url)
    }

    /// Username and password, only when both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((non_blank(&self.username)?, non_blank(&self.password)?))
    }
}

impl fmt::Debug for ConnectionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionGroup")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Read-only input to connection resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub direct: ConnectionGroup,
    pub delegated: ConnectionGroup,
}

/// Fully resolved synchronous-driver connection string plus credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl ConnectionDescriptor {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

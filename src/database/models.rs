//! Database target models
//!
//! Describes which database a session talks to and with what credentials.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which database engine a session connects to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSelection {
    /// Bundled embedded SQLite file, opened read-only
    #[serde(alias = "sqlite")]
    Local,
    /// Remote MySQL server
    #[serde(alias = "mysql")]
    Remote,
}

impl BackendSelection {
    /// Convert the selection to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendSelection::Local => "local",
            BackendSelection::Remote => "remote",
        }
    }
}

/// SQL dialect spoken by a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// SQLite
    Sqlite,
    /// MySQL
    Mysql,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => f.write_str("sqlite"),
            Dialect::Mysql => f.write_str("mysql"),
        }
    }
}

/// Credentials for the remote MySQL backend. All four fields are required.
#[derive(Clone, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct RemoteCredentials {
    /// Server host, optionally with `:port`
    #[serde(default)]
    pub host: String,
    /// User name
    #[serde(default)]
    pub user: String,
    /// Password
    #[serde(default)]
    pub password: String,
    /// Database (schema) name
    #[serde(default)]
    pub database: String,
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl RemoteCredentials {
    /// Build credentials from the four fields
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    /// Names of the fields that are blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("host", &self.host),
            ("user", &self.user),
            ("password", &self.password),
            ("database", &self.database),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Refuse partial credentials
    pub fn validate(&self) -> Result<(), AppError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Configuration(format!(
                "Please provide all MySQL details. Missing: {}",
                missing.join(", ")
            )))
        }
    }

    /// Split `host[:port]`
    pub fn host_and_port(&self) -> Result<(String, Option<u16>), AppError> {
        let host = self.host.trim();
        match host.rsplit_once(':') {
            Some((name, port)) if !name.is_empty() && !name.ends_with(':') => {
                let port = port.parse::<u16>().map_err(|_| {
                    AppError::Configuration(format!("Invalid MySQL port: {}", port))
                })?;
                Ok((name.to_string(), Some(port)))
            }
            _ => Ok((host.to_string(), None)),
        }
    }
}

/// Full description of what to connect to; also the cache key for handles
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatabaseTarget {
    /// The bundled local database
    Local,
    /// A remote MySQL server
    Remote(RemoteCredentials),
}

impl DatabaseTarget {
    /// Combine the UI selector with optional credentials.
    ///
    /// Credentials are ignored for the local backend and required for the
    /// remote one.
    pub fn from_selection(
        selection: BackendSelection,
        credentials: Option<RemoteCredentials>,
    ) -> Self {
        match selection {
            BackendSelection::Local => DatabaseTarget::Local,
            BackendSelection::Remote => DatabaseTarget::Remote(credentials.unwrap_or_default()),
        }
    }

    /// Which backend this target selects
    pub fn selection(&self) -> BackendSelection {
        match self {
            DatabaseTarget::Local => BackendSelection::Local,
            DatabaseTarget::Remote(_) => BackendSelection::Remote,
        }
    }
}

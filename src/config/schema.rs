//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::model::validate_host;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database connection
    pub mongo: MongoConfig,
    /// Replica set identity and topology
    pub replica_set: ReplicaSetSection,
    /// Initiate and polling behaviour
    pub bootstrap: BootstrapConfig,
    /// Root credential to provision on first boot
    pub admin: AdminConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Host used for member `_id: 0`: explicit setting, else the profile default.
    pub fn member_host(&self) -> String {
        self.replica_set
            .host
            .clone()
            .unwrap_or_else(|| self.replica_set.profile.default_host().to_string())
    }

    pub fn wait_for_primary(&self) -> bool {
        self.bootstrap
            .wait_for_primary
            .unwrap_or_else(|| self.replica_set.profile.waits_for_primary())
    }

    pub fn provision_admin(&self) -> bool {
        self.bootstrap
            .provision_admin
            .unwrap_or_else(|| self.replica_set.profile.provisions_admin())
    }

    /// Reject values that would make the bootstrap meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.replica_set.name.trim().is_empty() {
            return Err(ConfigError::validation("replica_set.name", "must not be empty"));
        }
        validate_host(&self.member_host())
            .map_err(|e| ConfigError::validation("replica_set.host", e.to_string()))?;
        if self.bootstrap.max_attempts == 0 {
            return Err(ConfigError::validation(
                "bootstrap.max_attempts",
                "must be at least 1",
            ));
        }
        if self.mongo.uri.trim().is_empty() {
            return Err(ConfigError::validation("mongo.uri", "must not be empty"));
        }
        Ok(())
    }
}

/// Database connection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    /// Connection string of the member to bootstrap
    pub uri: String,
    /// Application name reported to the server
    pub app_name: String,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Server selection timeout in milliseconds
    pub server_selection_timeout_ms: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            app_name: "rs-init".to_string(),
            connect_timeout_ms: 10_000,
            server_selection_timeout_ms: 10_000,
        }
    }
}

impl MongoConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }
}

/// Bootstrap variant.
///
/// `local` runs next to the database (startup hook): it uses `localhost`,
/// waits for PRIMARY and provisions the root user. `remote` runs from a
/// sibling container: it targets the service name and only initiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Local,
    Remote,
}

impl Profile {
    pub fn default_host(&self) -> &'static str {
        match self {
            Self::Local => "localhost:27017",
            Self::Remote => "mongodb:27017",
        }
    }

    pub fn waits_for_primary(&self) -> bool {
        matches!(self, Self::Local)
    }

    pub fn provisions_admin(&self) -> bool {
        matches!(self, Self::Local)
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown profile '{other}', expected 'local' or 'remote'")),
        }
    }
}

/// Replica set section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicaSetSection {
    /// Replica set name (`_id` of the initiate document)
    pub name: String,
    /// Member host:port; falls back to the profile default
    pub host: Option<String>,
    /// Bootstrap variant
    pub profile: Profile,
}

impl Default for ReplicaSetSection {
    fn default() -> Self {
        Self {
            name: "rs0".to_string(),
            host: None,
            profile: Profile::default(),
        }
    }
}

/// Initiate and polling section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Status queries made while waiting for PRIMARY
    pub max_attempts: u32,
    /// Pause between status queries in milliseconds
    pub interval_ms: u64,
    /// Overrides the profile's wait behaviour
    pub wait_for_primary: Option<bool>,
    /// Overrides the profile's provisioning behaviour
    pub provision_admin: Option<bool>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval_ms: 1000,
            wait_for_primary: None,
            provision_admin: None,
        }
    }
}

impl BootstrapConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Root credential section. Both fields or neither.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

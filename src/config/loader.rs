//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat, Profile};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "RS_INIT";

/// Config file name
const CONFIG_FILE_NAME: &str = "rs-init.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "RS_INIT_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `RS_INIT_CONFIG` environment variable (explicit path)
    /// 2. `./rs-init.toml` (current directory)
    /// 3. `~/.config/rs-init/rs-init.toml` (XDG on Linux/macOS)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    ///
    /// Unlike [`ConfigLoader::load`], a missing file is an error here.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory
    if let Some(config_dir) = get_config_dir() {
        let app_config = config_dir.join("rs-init").join(CONFIG_FILE_NAME);
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

fn get_config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from a variable lookup.
///
/// `lookup` returns the value of a variable, or `None` when it is unset.
/// Empty container-convention values count as unset.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let prefixed = |key: &str| format!("{}_{}", ENV_PREFIX, key);

    // Container conventions
    if let Some(val) = lookup("MONGO_REPLICA_SET_NAME").filter(|v| !v.is_empty()) {
        config.replica_set.name = val;
    }
    if let Some(val) = lookup("MONGO_REPLICA_SET_HOST").filter(|v| !v.is_empty()) {
        config.replica_set.host = Some(val);
    }
    if let Some(val) = lookup("MONGO_INITDB_ROOT_USERNAME").filter(|v| !v.is_empty()) {
        config.admin.username = Some(val);
    }
    if let Some(val) = lookup("MONGO_INITDB_ROOT_PASSWORD").filter(|v| !v.is_empty()) {
        config.admin.password = Some(val);
    }

    // Prefixed overrides
    if let Some(val) = lookup(&prefixed("MONGO_URI")) {
        config.mongo.uri = val;
    }
    if let Some(val) = lookup(&prefixed("PROFILE")) {
        config.replica_set.profile = val
            .parse::<Profile>()
            .map_err(|e| ConfigError::env_parse(prefixed("PROFILE"), e))?;
    }
    if let Some(val) = lookup(&prefixed("MAX_ATTEMPTS")) {
        config.bootstrap.max_attempts = val.parse().map_err(|_| {
            ConfigError::env_parse(prefixed("MAX_ATTEMPTS"), "Invalid attempt count")
        })?;
    }
    if let Some(val) = lookup(&prefixed("INTERVAL_MS")) {
        config.bootstrap.interval_ms = val
            .parse()
            .map_err(|_| ConfigError::env_parse(prefixed("INTERVAL_MS"), "Invalid interval"))?;
    }
    if let Some(val) = lookup(&prefixed("LOG_LEVEL")) {
        config.logging.level = val;
    }
    if let Some(val) = lookup(&prefixed("LOG_FORMAT")) {
        config.logging.format = val
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::env_parse(prefixed("LOG_FORMAT"), e))?;
    }

    Ok(())
}

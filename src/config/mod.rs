//! Configuration module for the replica-set bootstrapper.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `RS_INIT_CONFIG` environment variable (explicit path)
//! 2. `./rs-init.toml` (current directory)
//! 3. `~/.config/rs-init/rs-init.toml` (XDG on Linux/macOS)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The container-convention variables are always honoured:
//! - `MONGO_REPLICA_SET_NAME`, `MONGO_REPLICA_SET_HOST`
//! - `MONGO_INITDB_ROOT_USERNAME`, `MONGO_INITDB_ROOT_PASSWORD`
//!
//! Everything else can be overridden with `RS_INIT_<KEY>`, for example
//! `RS_INIT_MONGO_URI=mongodb://db:27017` or `RS_INIT_MAX_ATTEMPTS=120`.
//!
//! # Example
//!
//! ```rust,ignore
//! use mongo_rs_init::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Replica set: {}", config.replica_set.name);
//! println!("Member host: {}", config.member_host());
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_overrides, resolve_config_path, ConfigLoader};
pub use schema::{
    AdminConfig, BootstrapConfig, Config, LogFormat, LoggingConfig, MongoConfig, Profile,
    ReplicaSetSection,
};

//! MongoDB single-node replica-set bootstrapper.
//!
//! This library holds everything the `rs-init` binary runs at container
//! startup: configuration, the database session seam, and the idempotent
//! initialization sequence.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML and environment overrides
//! - `model`: Replica-set and credential documents
//! - `session`: Database session trait, MongoDB implementation and mock
//! - `initializer`: Status check, initiate, PRIMARY wait and admin provisioning
//! - `logging`: Tracing subscriber setup
//! - `error`: Unified error handling

pub mod config;
pub mod error;
pub mod initializer;
pub mod logging;
pub mod model;
pub mod session;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult};
pub use initializer::{
    AdminOutcome, FinalState, InitError, InitSettings, InitiateOutcome, Initializer, PollPolicy,
    RecordingSleeper, RunReport, Sleeper, SkipReason, Status, TokioSleeper,
};
pub use model::{
    AdminCredential, MemberConfig, MemberState, MemberStatus, ReplicaSetConfig, ReplicaSetStatus,
    RoleGrant, TopologyError,
};
pub use session::{AdminSession, MockSession, MongoSession, ScriptedStatus, SessionError};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult, Profile};

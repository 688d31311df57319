//! Session-level error types.
//!
//! Server error codes that carry control-flow meaning for the bootstrap get
//! their own variants; everything else is kept as a generic command failure.

use thiserror::Error;

/// `NotYetInitialized`: the member has not received a replica-set config.
pub const CODE_NOT_YET_INITIALIZED: i32 = 94;

/// `AlreadyInitialized`: `replSetInitiate` was sent to a configured member.
pub const CODE_ALREADY_INITIALIZED: i32 = 23;

/// `Location51003`: `createUser` for a user that already exists.
pub const CODE_USER_EXISTS: i32 = 51003;

/// Errors produced while talking to the database.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No replica-set configuration exists yet.
    #[error("Replica set is not initialized yet")]
    NotInitialized,

    /// The member already has a replica-set configuration.
    #[error("Replica set is already initialized: {0}")]
    AlreadyInitialized(String),

    /// The user to be created already exists.
    #[error("User already exists: {0}")]
    UserExists(String),

    /// The server rejected a command.
    #[error("Command failed ({code_name}, code {code}): {message}")]
    Command {
        code: i32,
        code_name: String,
        message: String,
    },

    /// The server could not be reached or selected.
    #[error("Database unreachable: {0}")]
    Unreachable(String),

    /// A reply could not be decoded into the expected shape.
    #[error("Malformed reply: {0}")]
    Decode(String),
}

impl SessionError {
    /// Classify a server command error by its numeric code.
    pub fn from_command(
        code: i32,
        code_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        match code {
            CODE_NOT_YET_INITIALIZED => Self::NotInitialized,
            CODE_ALREADY_INITIALIZED => Self::AlreadyInitialized(message),
            CODE_USER_EXISTS => Self::UserExists(message),
            _ => Self::Command {
                code,
                code_name: code_name.into(),
                message,
            },
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable(message.into())
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

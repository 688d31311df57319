use crate::config::ConfigError;
use crate::initializer::InitError;
use crate::session::SessionError;
use std::fmt;

/// Unified application error type.
///
/// Used by the binary to report anything that ends a run early. The
/// initializer itself never returns one; it folds errors into its report.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Session(SessionError),
    Init(InitError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Session(e) => write!(f, "Database session error: {e}"),
            Self::Init(e) => write!(f, "Initialization error: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Session(e) => Some(e),
            Self::Init(e) => Some(e),
        }
    }
}

// Implement `From` conversions to allow the `?` operator to work seamlessly.
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<InitError> for AppError {
    fn from(err: InitError) -> Self {
        AppError::Init(err)
    }
}

/// Result type for the binary's top-level steps.
pub type AppResult<T> = Result<T, AppError>;

//! Core trait for the database session.
//!
//! Defines the `AdminSession` trait so the real driver and the mock can be
//! used interchangeably by the initializer.

use super::error::SessionResult;
use crate::model::{AdminCredential, ReplicaSetConfig, ReplicaSetStatus};
use async_trait::async_trait;

/// Administrative commands issued against the `admin` database.
#[async_trait]
pub trait AdminSession: Send + Sync + std::fmt::Debug {
    /// Run `replSetGetStatus`.
    ///
    /// Returns `SessionError::NotInitialized` when the member has no
    /// configuration yet.
    async fn replset_get_status(&self) -> SessionResult<ReplicaSetStatus>;

    /// Run `replSetInitiate` with the given configuration.
    ///
    /// Returns the server reply rendered as JSON for display.
    async fn replset_initiate(
        &self,
        config: &ReplicaSetConfig,
    ) -> SessionResult<serde_json::Value>;

    /// Run `createUser` for the given credential.
    async fn create_user(&self, credential: &AdminCredential) -> SessionResult<()>;

    /// Human-readable endpoint description, safe to log.
    fn endpoint(&self) -> &str;
}

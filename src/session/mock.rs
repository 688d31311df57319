//! Mock session implementation for testing.
//!
//! Provides a `MockSession` that answers bootstrap commands from a script
//! instead of a live database, and records every mutating command it sees.

use super::error::{SessionError, SessionResult, CODE_USER_EXISTS};
use super::traits::AdminSession;
use crate::model::{AdminCredential, MemberStatus, ReplicaSetConfig, ReplicaSetStatus};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One scripted answer to `replSetGetStatus`.
#[derive(Debug, Clone)]
pub enum ScriptedStatus {
    /// Reply with this status document.
    Reply(ReplicaSetStatus),
    /// Fail with `NotYetInitialized`.
    NotInitialized,
    /// Fail as if the server could not be reached.
    Unreachable(String),
    /// Fail with an arbitrary server command error.
    Command {
        code: i32,
        code_name: String,
        message: String,
    },
}

impl ScriptedStatus {
    /// `ok: 1` with a single member in the given state.
    pub fn member_state(set_name: &str, state: &str) -> Self {
        Self::Reply(ReplicaSetStatus {
            ok: 1.0,
            set_name: set_name.to_string(),
            members: vec![MemberStatus {
                id: 0,
                name: "localhost:27017".to_string(),
                state_str: state.to_string(),
            }],
        })
    }

    pub fn primary(set_name: &str) -> Self {
        Self::member_state(set_name, "PRIMARY")
    }

    pub fn unreachable(message: &str) -> Self {
        Self::Unreachable(message.to_string())
    }

    fn answer(&self) -> SessionResult<ReplicaSetStatus> {
        match self {
            Self::Reply(status) => Ok(status.clone()),
            Self::NotInitialized => Err(SessionError::NotInitialized),
            Self::Unreachable(msg) => Err(SessionError::unreachable(msg.clone())),
            Self::Command {
                code,
                code_name,
                message,
            } => Err(SessionError::from_command(
                *code,
                code_name.clone(),
                message.clone(),
            )),
        }
    }
}

#[derive(Debug)]
struct MockSessionState {
    /// Answers consumed in order by status queries.
    status_script: VecDeque<ScriptedStatus>,
    /// Answer used once the script is exhausted.
    fallback_status: ScriptedStatus,
    /// Number of status queries served.
    status_calls: usize,
    /// Every configuration submitted with `replSetInitiate`.
    initiate_log: Vec<ReplicaSetConfig>,
    /// Error to return from the next initiate instead of succeeding.
    initiate_error: Option<(i32, String, String)>,
    /// Users known to the server, in creation order.
    users: Vec<AdminCredential>,
    /// Number of `createUser` attempts, successful or not.
    create_user_calls: usize,
}

/// Mock database session.
///
/// # Example
/// ```
/// use mongo_rs_init::session::{AdminSession, MockSession, ScriptedStatus};
///
/// # tokio_test::block_on(async {
/// let session = MockSession::new();
/// session.push_status(ScriptedStatus::NotInitialized);
/// session.push_status(ScriptedStatus::primary("rs0"));
///
/// assert!(session.replset_get_status().await.is_err());
/// assert!(session.replset_get_status().await.unwrap().has_primary());
/// # });
/// ```
#[derive(Clone)]
pub struct MockSession {
    endpoint: String,
    state: Arc<Mutex<MockSessionState>>,
}

impl MockSession {
    /// A fresh server: every status query fails with `NotYetInitialized`
    /// until the script says otherwise.
    pub fn new() -> Self {
        Self::with_fallback(ScriptedStatus::NotInitialized)
    }

    /// A server whose status query answers `fallback` once the script runs out.
    pub fn with_fallback(fallback: ScriptedStatus) -> Self {
        Self {
            endpoint: "mock://localhost:27017".to_string(),
            state: Arc::new(Mutex::new(MockSessionState {
                status_script: VecDeque::new(),
                fallback_status: fallback,
                status_calls: 0,
                initiate_log: Vec::new(),
                initiate_error: None,
                users: Vec::new(),
                create_user_calls: 0,
            })),
        }
    }

    /// A server that is already a healthy single-node set.
    pub fn initialized(set_name: &str) -> Self {
        Self::with_fallback(ScriptedStatus::primary(set_name))
    }

    fn state(&self) -> MutexGuard<'_, MockSessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an answer for the next status query.
    pub fn push_status(&self, status: ScriptedStatus) {
        self.state().status_script.push_back(status);
    }

    /// Queue the same answer `count` times.
    pub fn push_status_n(&self, status: ScriptedStatus, count: usize) {
        let mut state = self.state();
        for _ in 0..count {
            state.status_script.push_back(status.clone());
        }
    }

    /// Make the next initiate fail with the given server error.
    pub fn fail_next_initiate(&self, code: i32, code_name: &str, message: &str) {
        self.state().initiate_error = Some((code, code_name.to_string(), message.to_string()));
    }

    /// Pretend a user already exists on the server.
    pub fn add_existing_user(&self, credential: AdminCredential) {
        self.state().users.push(credential);
    }

    pub fn status_calls(&self) -> usize {
        self.state().status_calls
    }

    /// Copy of every configuration submitted with `replSetInitiate`.
    pub fn initiate_log(&self) -> Vec<ReplicaSetConfig> {
        self.state().initiate_log.clone()
    }

    /// Names of users known to the server.
    pub fn usernames(&self) -> Vec<String> {
        self.state().users.iter().map(|u| u.username.clone()).collect()
    }

    pub fn users(&self) -> Vec<AdminCredential> {
        self.state().users.clone()
    }

    pub fn create_user_calls(&self) -> usize {
        self.state().create_user_calls
    }

    /// Whether any command that changes server state was issued.
    pub fn was_mutated(&self) -> bool {
        let state = self.state();
        !state.initiate_log.is_empty() || state.create_user_calls > 0
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminSession for MockSession {
    async fn replset_get_status(&self) -> SessionResult<ReplicaSetStatus> {
        let mut state = self.state();
        state.status_calls += 1;
        let next = state
            .status_script
            .pop_front()
            .unwrap_or_else(|| state.fallback_status.clone());
        next.answer()
    }

    async fn replset_initiate(
        &self,
        config: &ReplicaSetConfig,
    ) -> SessionResult<serde_json::Value> {
        let mut state = self.state();
        state.initiate_log.push(config.clone());

        if let Some((code, code_name, message)) = state.initiate_error.take() {
            return Err(SessionError::from_command(code, code_name, message));
        }
        if state.initiate_log.len() > 1 {
            return Err(SessionError::AlreadyInitialized(
                "already initialized".to_string(),
            ));
        }

        Ok(serde_json::json!({ "ok": 1.0 }))
    }

    async fn create_user(&self, credential: &AdminCredential) -> SessionResult<()> {
        let mut state = self.state();
        state.create_user_calls += 1;

        if state.users.iter().any(|u| u.username == credential.username) {
            return Err(SessionError::from_command(
                CODE_USER_EXISTS,
                "Location51003",
                format!("User \"{}@admin\" already exists", credential.username),
            ));
        }

        state.users.push(credential.clone());
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for MockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSession")
            .field("endpoint", &self.endpoint)
            .field("status_calls", &self.status_calls())
            .finish()
    }
}

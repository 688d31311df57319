//! Idempotent single-node replica-set initialization.
//!
//! The [`Initializer`] runs once per process start and walks this sequence:
//!
//! ```text
//! status query ─┬─ ok: 1 ────────────> already initialized (no mutation)
//!               ├─ not initialized ─> replSetInitiate ─> poll PRIMARY ─> createUser?
//!               └─ unreachable ─────> failed
//! ```
//!
//! Every path ends in a [`RunReport`]; nothing here aborts the process.

pub mod sleeper;

use crate::config::Config;
use crate::model::{AdminCredential, ReplicaSetConfig, ReplicaSetStatus, TopologyError};
use crate::session::{AdminSession, SessionError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};

/// Errors surfaced by individual initializer operations.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Invalid replica set topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("Replica set initiation failed: {0}")]
    Initiation(#[source] SessionError),

    #[error("Admin user provisioning failed: {0}")]
    Provision(#[source] SessionError),
}

/// Bounds for the PRIMARY wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(1),
        }
    }
}

impl PollPolicy {
    /// Upper bound on the total time spent sleeping.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Everything the initializer needs, resolved up front.
#[derive(Clone)]
pub struct InitSettings {
    pub set_name: String,
    pub member_host: String,
    pub poll: PollPolicy,
    pub wait_for_primary: bool,
    pub provision_admin: bool,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl std::fmt::Debug for InitSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitSettings")
            .field("set_name", &self.set_name)
            .field("member_host", &self.member_host)
            .field("poll", &self.poll)
            .field("wait_for_primary", &self.wait_for_primary)
            .field("provision_admin", &self.provision_admin)
            .field("admin_username", &self.admin_username)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Default for InitSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl InitSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            set_name: config.replica_set.name.clone(),
            member_host: config.member_host(),
            poll: PollPolicy {
                max_attempts: config.bootstrap.max_attempts,
                interval: config.bootstrap.interval(),
            },
            wait_for_primary: config.wait_for_primary(),
            provision_admin: config.provision_admin(),
            admin_username: config.admin.username.clone(),
            admin_password: config.admin.password.clone(),
        }
    }

    /// The document this run would submit with `replSetInitiate`.
    pub fn replica_set_config(&self) -> ReplicaSetConfig {
        ReplicaSetConfig::single_member(&self.set_name, &self.member_host)
    }
}

/// Result of a status check.
#[derive(Debug)]
pub enum Status {
    /// The set exists and reported `ok: 1`.
    Healthy(ReplicaSetStatus),
    /// No configuration yet; initiate is expected.
    NotInitialized,
    /// Anything else: connection trouble, replication disabled, auth.
    Unreachable(SessionError),
}

/// Result of a successful initiate call.
#[derive(Debug, Clone, PartialEq)]
pub enum InitiateOutcome {
    /// The server accepted the configuration; carries its reply.
    Initiated(serde_json::Value),
    /// The server already had a configuration and rejected the duplicate.
    AlreadyInitialized,
}

/// Why no credential was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Username or password not supplied.
    MissingCredentials,
    /// The active profile or configuration turned provisioning off.
    Disabled,
    /// This run did not perform the initial configuration.
    NotFirstInitialization,
    /// The run stopped before provisioning was reached.
    RunFailed,
}

/// What happened to the admin credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminOutcome {
    Created { username: String },
    Skipped(SkipReason),
    Failed(String),
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalState {
    /// The set was already configured; nothing was changed.
    AlreadyInitialized { set_name: String },
    /// Initiated and PRIMARY was observed.
    Ready,
    /// Initiated but PRIMARY was not observed within the attempt budget.
    ReadyUnconfirmed,
    /// Initiated without waiting for PRIMARY.
    Initiated,
    /// The run stopped early.
    Failed { reason: String },
}

/// Outcome of [`Initializer::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub state: FinalState,
    pub admin: AdminOutcome,
}

impl RunReport {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: FinalState::Failed {
                reason: reason.into(),
            },
            admin: AdminOutcome::Skipped(SkipReason::RunFailed),
        }
    }

    /// Whether anything went wrong, for callers that want a strict exit code.
    pub fn is_failure(&self) -> bool {
        matches!(self.state, FinalState::Failed { .. })
            || matches!(self.admin, AdminOutcome::Failed(_))
    }
}

/// Drives the bootstrap sequence against an [`AdminSession`].
#[derive(Debug)]
pub struct Initializer<S, Z = TokioSleeper> {
    session: S,
    settings: InitSettings,
    sleeper: Z,
}

impl<S: AdminSession> Initializer<S, TokioSleeper> {
    pub fn new(session: S, settings: InitSettings) -> Self {
        Self::with_sleeper(session, settings, TokioSleeper)
    }
}

impl<S: AdminSession, Z: Sleeper> Initializer<S, Z> {
    pub fn with_sleeper(session: S, settings: InitSettings, sleeper: Z) -> Self {
        Self {
            session,
            settings,
            sleeper,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn settings(&self) -> &InitSettings {
        &self.settings
    }

    /// Query `replSetGetStatus` and classify the answer.
    pub async fn check_initialized(&self) -> Status {
        match self.session.replset_get_status().await {
            Ok(status) if status.is_ok() => Status::Healthy(status),
            Ok(status) => {
                debug!(ok = status.ok, "Status reply not ok, treating as uninitialized");
                Status::NotInitialized
            }
            Err(SessionError::NotInitialized) => Status::NotInitialized,
            Err(e) => Status::Unreachable(e),
        }
    }

    /// Submit `config` with `replSetInitiate`.
    ///
    /// Only meaningful after [`Self::check_initialized`] returned
    /// `NotInitialized`. A duplicate-initiate rejection is logged and
    /// reported as [`InitiateOutcome::AlreadyInitialized`].
    pub async fn initiate(&self, config: &ReplicaSetConfig) -> Result<InitiateOutcome, InitError> {
        config.validate()?;

        match self.session.replset_initiate(config).await {
            Ok(reply) => {
                info!(reply = %reply, "replSetInitiate accepted");
                Ok(InitiateOutcome::Initiated(reply))
            }
            Err(SessionError::AlreadyInitialized(msg)) => {
                warn!(message = %msg, "Replica set was initiated concurrently, continuing");
                Ok(InitiateOutcome::AlreadyInitialized)
            }
            Err(e) => Err(InitError::Initiation(e)),
        }
    }

    /// Poll status until a member is PRIMARY or the attempts run out.
    ///
    /// Query errors count as "not ready yet". There is no pause after the
    /// last attempt, so total sleeping stays under `policy.budget()`.
    pub async fn await_primary(&self, policy: &PollPolicy) -> bool {
        for attempt in 1..=policy.max_attempts {
            match self.session.replset_get_status().await {
                Ok(status) if status.has_primary() => {
                    info!(attempt, "Replica set PRIMARY ready");
                    return true;
                }
                Ok(status) => {
                    let states: Vec<String> =
                        status.members.iter().map(|m| m.state_str.clone()).collect();
                    debug!(attempt, ?states, "No PRIMARY yet");
                }
                Err(e) => debug!(attempt, error = %e, "Status query failed while waiting"),
            }

            if attempt < policy.max_attempts {
                self.sleeper.sleep(policy.interval).await;
            }
        }

        warn!(
            attempts = policy.max_attempts,
            "PRIMARY not observed within attempt budget"
        );
        false
    }

    /// Create the root user when both username and password are given.
    ///
    /// Not idempotent: an existing user is reported as an error.
    pub async fn provision_admin(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<AdminOutcome, InitError> {
        let Some(credential) = AdminCredential::root(username, password) else {
            if username.is_some_and(|u| !u.is_empty()) || password.is_some_and(|p| !p.is_empty()) {
                warn!("Only one of admin username and password is set, skipping admin user");
            }
            return Ok(AdminOutcome::Skipped(SkipReason::MissingCredentials));
        };

        info!(username = %credential.username, "Creating admin user...");
        self.session
            .create_user(&credential)
            .await
            .map_err(InitError::Provision)?;
        info!(username = %credential.username, "Admin user created.");

        Ok(AdminOutcome::Created {
            username: credential.username,
        })
    }

    /// Run the full sequence. Errors are logged and folded into the report.
    pub async fn run(&self) -> RunReport {
        let settings = &self.settings;
        info!(
            endpoint = %self.session.endpoint(),
            set_name = %settings.set_name,
            "Checking replica set status"
        );

        match self.check_initialized().await {
            Status::Healthy(status) => {
                info!("Replica set already initialized: {}", status.set_name);
                return RunReport {
                    state: FinalState::AlreadyInitialized {
                        set_name: status.set_name,
                    },
                    admin: AdminOutcome::Skipped(SkipReason::NotFirstInitialization),
                };
            }
            Status::Unreachable(e) => {
                error!(error = %e, "Init replica error");
                return RunReport::failed(e.to_string());
            }
            Status::NotInitialized => {}
        }

        info!(host = %settings.member_host, "Initializing replica set '{}'...", settings.set_name);
        let config = settings.replica_set_config();
        let first_initialization = match self.initiate(&config).await {
            Ok(InitiateOutcome::Initiated(_)) => true,
            Ok(InitiateOutcome::AlreadyInitialized) => false,
            Err(e) => {
                error!(error = %e, "Init replica error");
                return RunReport::failed(e.to_string());
            }
        };

        let state = if !settings.wait_for_primary {
            FinalState::Initiated
        } else if self.await_primary(&settings.poll).await {
            FinalState::Ready
        } else {
            FinalState::ReadyUnconfirmed
        };

        let admin = if !first_initialization {
            AdminOutcome::Skipped(SkipReason::NotFirstInitialization)
        } else if !settings.provision_admin {
            AdminOutcome::Skipped(SkipReason::Disabled)
        } else {
            match self
                .provision_admin(
                    settings.admin_username.as_deref(),
                    settings.admin_password.as_deref(),
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Admin user error");
                    AdminOutcome::Failed(e.to_string())
                }
            }
        };

        RunReport { state, admin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MockSession, ScriptedStatus};

    fn initializer(session: MockSession) -> Initializer<MockSession, RecordingSleeper> {
        Initializer::with_sleeper(session, InitSettings::default(), RecordingSleeper::new())
    }

    #[tokio::test]
    async fn test_check_initialized_classifies_replies() {
        let session = MockSession::new();
        session.push_status(ScriptedStatus::primary("rs0"));
        session.push_status(ScriptedStatus::NotInitialized);
        session.push_status(ScriptedStatus::unreachable("connection refused"));
        session.push_status(ScriptedStatus::Command {
            code: 76,
            code_name: "NoReplicationEnabled".to_string(),
            message: "not running with --replSet".to_string(),
        });
        let init = initializer(session);

        assert!(matches!(
            init.check_initialized().await,
            Status::Healthy(s) if s.set_name == "rs0"
        ));
        assert!(matches!(init.check_initialized().await, Status::NotInitialized));
        assert!(matches!(
            init.check_initialized().await,
            Status::Unreachable(SessionError::Unreachable(_))
        ));
        assert!(matches!(
            init.check_initialized().await,
            Status::Unreachable(SessionError::Command { code: 76, .. })
        ));
    }

    #[tokio::test]
    async fn test_not_ok_reply_counts_as_uninitialized() {
        let session = MockSession::new();
        session.push_status(ScriptedStatus::Reply(ReplicaSetStatus {
            ok: 0.0,
            set_name: String::new(),
            members: Vec::new(),
        }));
        let init = initializer(session);
        assert!(matches!(init.check_initialized().await, Status::NotInitialized));
    }

    #[tokio::test]
    async fn test_initiate_rejects_invalid_topology_without_sending() {
        let init = initializer(MockSession::new());
        let cfg = ReplicaSetConfig::single_member("rs0", "localhost");

        let err = init.initiate(&cfg).await.unwrap_err();
        assert!(matches!(err, InitError::Topology(TopologyError::InvalidHost(_))));
        assert!(init.session().initiate_log().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_initiate_is_tolerated() {
        let session = MockSession::new();
        session.fail_next_initiate(23, "AlreadyInitialized", "already initialized");
        let init = initializer(session);
        let cfg = init.settings().replica_set_config();

        let outcome = init.initiate(&cfg).await.unwrap();
        assert_eq!(outcome, InitiateOutcome::AlreadyInitialized);
    }

    #[tokio::test]
    async fn test_await_primary_stops_on_first_primary() {
        let session = MockSession::new();
        session.push_status(ScriptedStatus::NotInitialized);
        session.push_status(ScriptedStatus::member_state("rs0", "STARTUP2"));
        session.push_status(ScriptedStatus::primary("rs0"));
        let sleeper = RecordingSleeper::new();
        let init = Initializer::with_sleeper(session, InitSettings::default(), sleeper.clone());

        assert!(init.await_primary(&PollPolicy::default()).await);
        assert_eq!(init.session().status_calls(), 3);
        assert_eq!(sleeper.pauses(), vec![Duration::from_secs(1); 2]);
    }

    #[tokio::test]
    async fn test_await_primary_gives_up_within_budget() {
        let session = MockSession::with_fallback(ScriptedStatus::member_state("rs0", "SECONDARY"));
        let sleeper = RecordingSleeper::new();
        let init = Initializer::with_sleeper(session, InitSettings::default(), sleeper.clone());
        let policy = PollPolicy {
            max_attempts: 5,
            interval: Duration::from_millis(200),
        };

        assert!(!init.await_primary(&policy).await);
        assert_eq!(init.session().status_calls(), 5);
        assert!(sleeper.total() <= policy.budget());
    }

    #[tokio::test]
    async fn test_provision_admin_noop_without_both_parts() {
        let init = initializer(MockSession::new());

        for (user, pass) in [(None, None), (Some("root"), None), (None, Some("pw"))] {
            let outcome = init.provision_admin(user, pass).await.unwrap();
            assert_eq!(outcome, AdminOutcome::Skipped(SkipReason::MissingCredentials));
        }
        assert_eq!(init.session().create_user_calls(), 0);
    }

    #[tokio::test]
    async fn test_provision_admin_twice_fails() {
        let init = initializer(MockSession::new());

        let first = init.provision_admin(Some("root"), Some("pw")).await.unwrap();
        assert_eq!(
            first,
            AdminOutcome::Created {
                username: "root".to_string()
            }
        );

        let err = init
            .provision_admin(Some("root"), Some("pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, InitError::Provision(SessionError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_failed_run_reports_run_failed_for_admin() {
        let session = MockSession::with_fallback(ScriptedStatus::unreachable("connection refused"));
        let report = initializer(session).run().await;

        assert!(matches!(report.state, FinalState::Failed { .. }));
        assert_eq!(report.admin, AdminOutcome::Skipped(SkipReason::RunFailed));
    }

    #[test]
    fn test_debug_output_hides_admin_password() {
        let settings = InitSettings {
            admin_username: Some("root".to_string()),
            admin_password: Some("hunter2".to_string()),
            ..InitSettings::default()
        };
        let settings_debug = format!("{:?}", settings);
        assert!(settings_debug.contains("root"));
        assert!(!settings_debug.contains("hunter2"));

        let init = Initializer::with_sleeper(MockSession::new(), settings, RecordingSleeper::new());
        assert!(!format!("{:?}", init).contains("hunter2"));
    }

    #[test]
    fn test_poll_policy_budget() {
        assert_eq!(PollPolicy::default().budget(), Duration::from_secs(60));
    }

    #[test]
    fn test_report_failure_flag() {
        let ok = RunReport {
            state: FinalState::Ready,
            admin: AdminOutcome::Skipped(SkipReason::MissingCredentials),
        };
        assert!(!ok.is_failure());
        assert!(RunReport::failed("boom").is_failure());

        let admin_failed = RunReport {
            state: FinalState::Ready,
            admin: AdminOutcome::Failed("exists".to_string()),
        };
        assert!(admin_failed.is_failure());
    }
}

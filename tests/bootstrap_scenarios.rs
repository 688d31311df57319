//! End-to-end bootstrap scenarios against the mock session.

mod common;

use common::{build, fresh_member, settings_for, settings_with_admin};
use mongo_rs_init::config::{apply_overrides, Config, Profile};
use mongo_rs_init::initializer::{AdminOutcome, FinalState, InitSettings, PollPolicy, SkipReason};
use mongo_rs_init::model::{MemberConfig, ReplicaSetConfig};
use mongo_rs_init::session::{MockSession, ScriptedStatus};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[tokio::test]
async fn test_empty_environment_fresh_database() {
    let (init, session, _) = build(fresh_member("rs0", 4), settings_for(Profile::Local));

    let report = init.run().await;

    assert_eq!(report.state, FinalState::Ready);
    assert_eq!(report.admin, AdminOutcome::Skipped(SkipReason::MissingCredentials));
    assert_eq!(
        session.initiate_log(),
        vec![ReplicaSetConfig {
            id: "rs0".to_string(),
            members: vec![MemberConfig {
                id: 0,
                host: "localhost:27017".to_string(),
            }],
        }]
    );
    assert_eq!(session.create_user_calls(), 0);
    // One status check plus five polls.
    assert_eq!(session.status_calls(), 6);
}

#[tokio::test]
async fn test_already_initialized_is_a_noop() {
    let (init, session, sleeper) = build(
        MockSession::initialized("prod"),
        settings_with_admin("root", "example"),
    );

    let report = init.run().await;

    assert_eq!(
        report.state,
        FinalState::AlreadyInitialized {
            set_name: "prod".to_string()
        }
    );
    assert!(!session.was_mutated());
    assert!(session.initiate_log().is_empty());
    assert!(sleeper.pauses().is_empty());
    assert!(!report.is_failure());
}

#[tokio::test]
async fn test_rerun_after_initialization_does_not_initiate_again() {
    let session = fresh_member("rs0", 0);
    let (first, session, _) = build(session, settings_for(Profile::Local));
    assert_eq!(first.run().await.state, FinalState::Ready);

    // The member now answers as a healthy set on every query.
    session.push_status(ScriptedStatus::primary("rs0"));
    let (second, session, _) = build(session, settings_for(Profile::Local));
    let report = second.run().await;

    assert!(matches!(report.state, FinalState::AlreadyInitialized { .. }));
    assert_eq!(session.initiate_log().len(), 1);
}

#[tokio::test]
async fn test_replica_set_name_from_environment() {
    let mut config = Config::default();
    apply_overrides(&mut config, |key| {
        (key == "MONGO_REPLICA_SET_NAME").then(|| "testset".to_string())
    })
    .unwrap();

    let (init, session, _) = build(fresh_member("testset", 0), InitSettings::from_config(&config));
    init.run().await;

    let submitted = session.initiate_log();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].id, "testset");
    assert_eq!(submitted[0].members.len(), 1);
    assert_eq!(submitted[0].members[0].id, 0);
}

#[tokio::test]
async fn test_admin_created_on_first_initialization() {
    let (init, session, _) = build(fresh_member("rs0", 1), settings_with_admin("root", "example"));

    let report = init.run().await;

    assert_eq!(report.state, FinalState::Ready);
    assert_eq!(
        report.admin,
        AdminOutcome::Created {
            username: "root".to_string()
        }
    );
    let users = session.users();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].roles[0].role, "root");
    assert_eq!(users[0].roles[0].db, "admin");
}

#[tokio::test]
async fn test_missing_password_creates_no_user() {
    let settings = InitSettings {
        admin_username: Some("root".to_string()),
        admin_password: None,
        ..settings_for(Profile::Local)
    };
    let (init, session, _) = build(fresh_member("rs0", 0), settings);

    let report = init.run().await;

    assert_eq!(report.admin, AdminOutcome::Skipped(SkipReason::MissingCredentials));
    assert_eq!(session.create_user_calls(), 0);
}

#[tokio::test]
async fn test_existing_user_is_reported_not_fatal() {
    let session = fresh_member("rs0", 0);
    session.add_existing_user(
        mongo_rs_init::model::AdminCredential::root(Some("root"), Some("old")).unwrap(),
    );
    let (init, _, _) = build(session, settings_with_admin("root", "example"));

    let report = init.run().await;

    assert_eq!(report.state, FinalState::Ready);
    assert!(matches!(report.admin, AdminOutcome::Failed(_)));
    assert!(report.is_failure());
}

#[tokio::test]
async fn test_primary_never_observed() {
    let session = MockSession::with_fallback(ScriptedStatus::member_state("rs0", "STARTUP"));
    session.push_status(ScriptedStatus::NotInitialized);
    let (init, session, sleeper) = build(session, settings_with_admin("root", "example"));

    let report = init.run().await;

    assert_eq!(report.state, FinalState::ReadyUnconfirmed);
    // 1 status check + 60 polls, 59 pauses of one second.
    assert_eq!(session.status_calls(), 61);
    assert_eq!(sleeper.pauses().len(), 59);
    assert!(sleeper.total() <= PollPolicy::default().budget());
    // Provisioning still runs once the wait is over.
    assert!(matches!(report.admin, AdminOutcome::Created { .. }));
}

#[tokio::test]
async fn test_polling_errors_are_swallowed() {
    let session = MockSession::new();
    session.push_status(ScriptedStatus::NotInitialized);
    session.push_status_n(ScriptedStatus::unreachable("socket closed"), 3);
    session.push_status(ScriptedStatus::primary("rs0"));
    let (init, _, sleeper) = build(session, settings_for(Profile::Local));

    let report = init.run().await;

    assert_eq!(report.state, FinalState::Ready);
    assert_eq!(sleeper.pauses(), vec![Duration::from_secs(1); 3]);
}

#[tokio::test]
async fn test_unreachable_database_fails_without_mutation() {
    let session = MockSession::with_fallback(ScriptedStatus::unreachable(
        "Server selection timeout: No available servers",
    ));
    let (init, session, _) = build(session, settings_with_admin("root", "example"));

    let report = init.run().await;

    assert!(matches!(report.state, FinalState::Failed { .. }));
    assert_eq!(report.admin, AdminOutcome::Skipped(SkipReason::RunFailed));
    assert!(!session.was_mutated());
}

#[tokio::test]
async fn test_initiate_rejected_for_other_reasons() {
    let session = MockSession::new();
    session.fail_next_initiate(
        93,
        "InvalidReplicaSetConfig",
        "No host described in new configuration",
    );
    let (init, session, _) = build(session, settings_with_admin("root", "example"));

    let report = init.run().await;

    match report.state {
        FinalState::Failed { reason } => assert!(reason.contains("InvalidReplicaSetConfig")),
        other => panic!("unexpected state {other:?}"),
    }
    assert_eq!(session.create_user_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_initiate_skips_admin() {
    let session = MockSession::new();
    session.push_status(ScriptedStatus::NotInitialized);
    session.push_status(ScriptedStatus::primary("rs0"));
    session.fail_next_initiate(23, "AlreadyInitialized", "already initialized");
    let (init, session, _) = build(session, settings_with_admin("root", "example"));

    let report = init.run().await;

    assert_eq!(report.state, FinalState::Ready);
    assert_eq!(
        report.admin,
        AdminOutcome::Skipped(SkipReason::NotFirstInitialization)
    );
    assert_eq!(session.create_user_calls(), 0);
}

#[tokio::test]
async fn test_remote_profile_only_initiates() {
    let session = MockSession::new();
    let settings = InitSettings {
        admin_username: Some("root".to_string()),
        admin_password: Some("example".to_string()),
        ..settings_for(Profile::Remote)
    };
    let (init, session, sleeper) = build(session, settings);

    let report = init.run().await;

    assert_eq!(report.state, FinalState::Initiated);
    assert_eq!(report.admin, AdminOutcome::Skipped(SkipReason::Disabled));
    assert_eq!(session.initiate_log()[0].members[0].host, "mongodb:27017");
    assert_eq!(session.status_calls(), 1);
    assert!(sleeper.pauses().is_empty());
}

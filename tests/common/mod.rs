//! Shared test utilities for the bootstrap integration tests.
//!
//! This module provides:
//! - Initializer construction over a mock session and recording sleeper
//! - Settings builders matching the two bootstrap profiles
//! - Scripted database states

#![allow(dead_code)]

use mongo_rs_init::config::{Config, Profile};
use mongo_rs_init::initializer::{InitSettings, Initializer, RecordingSleeper};
use mongo_rs_init::session::{MockSession, ScriptedStatus};

pub type TestInitializer = Initializer<MockSession, RecordingSleeper>;

/// Settings equivalent to an empty environment with the given profile.
pub fn settings_for(profile: Profile) -> InitSettings {
    let mut config = Config::default();
    config.replica_set.profile = profile;
    InitSettings::from_config(&config)
}

/// Local-profile settings with root credentials.
pub fn settings_with_admin(username: &str, password: &str) -> InitSettings {
    InitSettings {
        admin_username: Some(username.to_string()),
        admin_password: Some(password.to_string()),
        ..settings_for(Profile::Local)
    }
}

/// Build an initializer and hand back the shared mock and sleeper handles.
pub fn build(
    session: MockSession,
    settings: InitSettings,
) -> (TestInitializer, MockSession, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let init = Initializer::with_sleeper(session.clone(), settings, sleeper.clone());
    (init, session, sleeper)
}

/// A fresh member that turns PRIMARY after `starting_polls` non-primary answers.
pub fn fresh_member(set_name: &str, starting_polls: usize) -> MockSession {
    let session = MockSession::new();
    // Initial status check: no configuration yet.
    session.push_status(ScriptedStatus::NotInitialized);
    session.push_status_n(
        ScriptedStatus::member_state(set_name, "STARTUP2"),
        starting_polls,
    );
    session.push_status(ScriptedStatus::primary(set_name));
    session
}

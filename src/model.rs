//! Replica-set documents exchanged with the database.
//!
//! These types mirror the exact shapes of the `replSetInitiate`,
//! `replSetGetStatus` and `createUser` documents. None of them are persisted
//! here; they are built, sent once, or read once.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Role granted to the provisioned administrator.
pub const ROOT_ROLE: &str = "root";

/// Database the administrator and all bootstrap commands live in.
pub const ADMIN_DB: &str = "admin";

/// Problems with a topology document detected before it is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("Replica set name must not be empty")]
    EmptySetName,

    #[error("Replica set must have at least one member")]
    NoMembers,

    #[error("Duplicate member _id {0}")]
    DuplicateMemberId(i32),

    #[error("Invalid member host '{0}': expected host:port")]
    InvalidHost(String),
}

/// A single entry of `members` in an initiate document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberConfig {
    #[serde(rename = "_id")]
    pub id: i32,
    pub host: String,
}

/// The document submitted with `replSetInitiate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSetConfig {
    #[serde(rename = "_id")]
    pub id: String,
    pub members: Vec<MemberConfig>,
}

impl ReplicaSetConfig {
    /// One-member topology with the member at `_id: 0`.
    pub fn single_member(set_name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: set_name.into(),
            members: vec![MemberConfig {
                id: 0,
                host: host.into(),
            }],
        }
    }

    /// Check the invariants the database would otherwise reject less clearly.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.id.trim().is_empty() {
            return Err(TopologyError::EmptySetName);
        }
        if self.members.is_empty() {
            return Err(TopologyError::NoMembers);
        }

        let mut seen = Vec::with_capacity(self.members.len());
        for member in &self.members {
            if seen.contains(&member.id) {
                return Err(TopologyError::DuplicateMemberId(member.id));
            }
            seen.push(member.id);
            validate_host(&member.host)?;
        }
        Ok(())
    }
}

/// Accepts `host:port` where port is a non-zero u16.
pub fn validate_host(host: &str) -> Result<(), TopologyError> {
    let invalid = || TopologyError::InvalidHost(host.to_string());

    let (name, port) = host.rsplit_once(':').ok_or_else(invalid)?;
    if name.is_empty() {
        return Err(invalid());
    }
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(invalid()),
    }
}

/// Replication state of a member as reported in `stateStr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberState {
    Primary,
    Secondary,
    Startup,
    Startup2,
    Recovering,
    Arbiter,
    Down,
    Rollback,
    Removed,
    Unknown(String),
}

impl From<&str> for MemberState {
    fn from(s: &str) -> Self {
        match s {
            "PRIMARY" => Self::Primary,
            "SECONDARY" => Self::Secondary,
            "STARTUP" => Self::Startup,
            "STARTUP2" => Self::Startup2,
            "RECOVERING" => Self::Recovering,
            "ARBITER" => Self::Arbiter,
            "DOWN" => Self::Down,
            "ROLLBACK" => Self::Rollback,
            "REMOVED" => Self::Removed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Primary => "PRIMARY",
            Self::Secondary => "SECONDARY",
            Self::Startup => "STARTUP",
            Self::Startup2 => "STARTUP2",
            Self::Recovering => "RECOVERING",
            Self::Arbiter => "ARBITER",
            Self::Down => "DOWN",
            Self::Rollback => "ROLLBACK",
            Self::Removed => "REMOVED",
            Self::Unknown(other) => other,
        };
        f.write_str(s)
    }
}

/// One entry of `members` in a `replSetGetStatus` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStatus {
    #[serde(rename = "_id", default)]
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "stateStr")]
    pub state_str: String,
}

impl MemberStatus {
    pub fn state(&self) -> MemberState {
        MemberState::from(self.state_str.as_str())
    }
}

/// Read-only snapshot from `replSetGetStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSetStatus {
    /// Accepts both `1` and `1.0` on the wire.
    #[serde(default)]
    pub ok: f64,
    #[serde(rename = "set", default)]
    pub set_name: String,
    #[serde(default)]
    pub members: Vec<MemberStatus>,
}

impl ReplicaSetStatus {
    pub fn is_ok(&self) -> bool {
        self.ok == 1.0
    }

    pub fn has_primary(&self) -> bool {
        self.members
            .iter()
            .any(|m| m.state() == MemberState::Primary)
    }
}

/// A `{ role, db }` grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

impl RoleGrant {
    pub fn root() -> Self {
        Self {
            role: ROOT_ROLE.to_string(),
            db: ADMIN_DB.to_string(),
        }
    }
}

/// Credential created once on first-time initialization.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredential {
    pub username: String,
    pub password: String,
    pub roles: Vec<RoleGrant>,
}

impl AdminCredential {
    /// Root credential, or `None` unless both parts are present and non-empty.
    pub fn root(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Self {
                username: u.to_string(),
                password: p.to_string(),
                roles: vec![RoleGrant::root()],
            }),
            _ => None,
        }
    }
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

//! MongoDB-backed session.
//!
//! Wraps the official driver. The client always connects directly to the
//! configured member: an uninitialized member is not yet part of any set, so
//! topology discovery would never select it.

use super::error::{SessionError, SessionResult};
use super::traits::AdminSession;
use crate::config::MongoConfig;
use crate::model::{AdminCredential, ReplicaSetConfig, ReplicaSetStatus, ADMIN_DB};
use async_trait::async_trait;
use mongodb::bson::{self, doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tracing::debug;

/// Session over a live `mongod`.
#[derive(Debug, Clone)]
pub struct MongoSession {
    admin: Database,
    endpoint: String,
}

impl MongoSession {
    /// Build a client from the configured URI.
    ///
    /// The driver connects lazily; an unreachable server surfaces on the
    /// first command, not here.
    pub async fn connect(config: &MongoConfig) -> SessionResult<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.direct_connection = Some(true);
        options.app_name = Some(config.app_name.clone());
        options.connect_timeout = Some(config.connect_timeout());
        options.server_selection_timeout = Some(config.server_selection_timeout());

        let client = Client::with_options(options)?;
        let endpoint = redact_uri(&config.uri);
        debug!(endpoint = %endpoint, "MongoDB client created");

        Ok(Self {
            admin: client.database(ADMIN_DB),
            endpoint,
        })
    }

    async fn run(&self, command: Document) -> SessionResult<Document> {
        Ok(self.admin.run_command(command).await?)
    }
}

#[async_trait]
impl AdminSession for MongoSession {
    async fn replset_get_status(&self) -> SessionResult<ReplicaSetStatus> {
        let reply = self.run(doc! { "replSetGetStatus": 1 }).await?;
        bson::from_document(reply).map_err(|e| SessionError::Decode(e.to_string()))
    }

    async fn replset_initiate(
        &self,
        config: &ReplicaSetConfig,
    ) -> SessionResult<serde_json::Value> {
        let config_doc =
            bson::to_document(config).map_err(|e| SessionError::Decode(e.to_string()))?;
        let reply = self.run(doc! { "replSetInitiate": config_doc }).await?;
        serde_json::to_value(&reply).map_err(|e| SessionError::Decode(e.to_string()))
    }

    async fn create_user(&self, credential: &AdminCredential) -> SessionResult<()> {
        let roles =
            bson::to_bson(&credential.roles).map_err(|e| SessionError::Decode(e.to_string()))?;
        self.run(doc! {
            "createUser": credential.username.as_str(),
            "pwd": credential.password.as_str(),
            "roles": roles,
        })
        .await?;
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl From<mongodb::error::Error> for SessionError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Command(cmd) => {
                SessionError::from_command(cmd.code, cmd.code_name.clone(), cmd.message.clone())
            }
            _ => SessionError::unreachable(err.to_string()),
        }
    }
}

/// Replace the userinfo part of a connection string so it can be logged.
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
        None => uri.to_string(),
    }
}

//! Database session abstraction for the bootstrap commands.
//!
//! Provides the `AdminSession` trait with a MongoDB-backed implementation and
//! an in-memory mock, so the initializer can be driven without a database.

pub mod error;
pub mod mock;
pub mod mongo;
pub mod traits;

pub use error::{SessionError, SessionResult};
pub use mock::{MockSession, ScriptedStatus};
pub use mongo::{redact_uri, MongoSession};
pub use traits::AdminSession;

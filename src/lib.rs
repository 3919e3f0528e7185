//! CouchDB Rust Client SDK
//!
//! An async client for the CouchDB HTTP REST API: databases, documents,
//! attachments, security objects, views and cookie sessions.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use couchdb::{Auth, ConnectOptions, Connection};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> couchdb::Result<()> {
//!     // Connect with admin credentials
//!     let conn = Connection::with_options(
//!         ConnectOptions::new("localhost", 5984)
//!             .with_timeout(Duration::from_secs(5))
//!             .with_auth(Auth::basic("admin", "password")),
//!     )?;
//!     conn.create_db("orders", None).await?;
//!
//!     // Create a document; the empty revision means "new"
//!     let db = conn.select_db("orders");
//!     let rev = db.save(&json!({"item": "pen"}), "o1", "").await?;
//!
//!     // Read it back along with its current revision
//!     let (doc, current): (serde_json::Value, String) = db.read("o1").await?;
//!     assert_eq!(doc["item"], "pen");
//!     assert_eq!(current, rev);
//!
//!     // Every mutation needs the current revision and returns the next one
//!     let deleted = db.delete("o1", &current).await?;
//!     assert_ne!(deleted, current);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
mod connection;
mod database;
mod error;
pub mod path;
pub mod query;
pub mod revision;
mod session;
pub mod types;

pub use auth::Auth;
pub use connection::{ConnectOptions, Connection, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use database::{Attachment, Database};
pub use error::{CouchError, Error, RequestError, Result};
pub use query::QueryParams;
pub use session::{session_token, Session};
pub use types::{
  DatabaseInfo, Members, Security, ServerInfo, UserContext, UserDocument, ViewResult, ViewRow,
  WriteResponse,
};

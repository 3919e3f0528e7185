//! Wire types exchanged with the CouchDB REST API.

use serde::{Deserialize, Serialize};

/// Namespace CouchDB uses for user documents in `_users`.
pub const USER_PREFIX: &str = "org.couchdb.user:";

/// Id prefix of design documents.
pub const DESIGN_PREFIX: &str = "_design";

/// Body returned by document writes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteResponse {
  #[serde(default)]
  pub ok: bool,
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub rev: Option<String>,
}

/// Names and roles granted one level of access
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Members {
  #[serde(default, alias = "users")]
  pub names: Vec<String>,
  #[serde(default)]
  pub roles: Vec<String>,
}

/// The `_security` object of a database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
  #[serde(default)]
  pub members: Members,
  #[serde(default)]
  pub admins: Members,
}

/// Response of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
  pub couchdb: String,
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uuid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vendor: Option<serde_json::Value>,
}

/// Response of `GET /{db}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseInfo {
  pub db_name: String,
  #[serde(default)]
  pub doc_count: u64,
  #[serde(default)]
  pub doc_del_count: u64,
  /// A number on 1.x servers, an opaque string on 2.x and later.
  #[serde(default)]
  pub update_seq: serde_json::Value,
  #[serde(default)]
  pub compact_running: bool,
}

/// Authenticated user as reported by `_session`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
  pub name: Option<String>,
  #[serde(default)]
  pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionResponse {
  #[serde(default)]
  pub ok: bool,
  #[serde(rename = "userCtx", default)]
  pub user_ctx: Option<UserContext>,
  // POST /_session flattens the context into the top level
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub roles: Vec<String>,
}

impl SessionResponse {
  pub fn into_user(self) -> UserContext {
    self.user_ctx.unwrap_or(UserContext {
      name: self.name,
      roles: self.roles,
    })
  }
}

/// Document shape of a user in `_users`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
  pub name: String,
  pub password: String,
  pub roles: Vec<String>,
  #[serde(rename = "type")]
  pub kind: String,
}

impl UserDocument {
  pub fn new(name: impl Into<String>, password: impl Into<String>, roles: Vec<String>) -> Self {
    Self {
      name: name.into(),
      password: password.into(),
      roles,
      kind: "user".to_string(),
    }
  }
}

/// One row of a view response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewRow<K, V, D = serde_json::Value> {
  #[serde(default)]
  pub id: Option<String>,
  pub key: K,
  pub value: V,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub doc: Option<D>,
}

/// Response of `GET /{db}/_design/{name}/_view/{view}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewResult<K, V, D = serde_json::Value> {
  #[serde(default)]
  pub total_rows: Option<u64>,
  #[serde(default)]
  pub offset: Option<u64>,
  pub rows: Vec<ViewRow<K, V, D>>,
}

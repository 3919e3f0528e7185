//! Connection to a CouchDB server.
//!
//! [`Connection::request`] is the single choke point for HTTP traffic: it
//! builds the absolute URL, attaches credentials and headers, sends the
//! request and turns any status of 400 or above into a [`RequestError`].
//! Everything else in the crate is a thin wrapper around it.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, IF_MATCH};
use reqwest::{Body, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{instrument, Span};

use crate::auth::Auth;
use crate::database::Database;
use crate::error::{CouchError, Error, RequestError, Result};
use crate::path::{build_path, build_path_with_params};
use crate::query::QueryParams;
use crate::types::{ServerInfo, UserDocument, USER_PREFIX};

/// Port CouchDB listens on out of the box.
pub const DEFAULT_PORT: u16 = 5984;

/// Whole-request timeout used when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Connection options
#[derive(Debug, Clone)]
pub struct ConnectOptions {
  pub host: String,
  pub port: u16,
  pub tls: bool,
  pub timeout: Duration,
  pub auth: Option<Auth>,
  pub user_agent: Option<String>,
}

impl ConnectOptions {
  pub fn new(host: impl Into<String>, port: u16) -> Self {
    Self {
      host: host.into(),
      port,
      tls: false,
      timeout: DEFAULT_TIMEOUT,
      auth: None,
      user_agent: None,
    }
  }

  /// Use `https` instead of `http`.
  pub fn with_tls(mut self, tls: bool) -> Self {
    self.tls = tls;
    self
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Default credentials for every request made through the connection.
  pub fn with_auth(mut self, auth: Auth) -> Self {
    self.auth = Some(auth);
    self
  }

  pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
    self.user_agent = Some(user_agent.into());
    self
  }

  /// Reads options from the environment.
  ///
  /// | Variable | Default |
  /// |---|---|
  /// | `COUCHDB_HOST` | `localhost` |
  /// | `COUCHDB_PORT` | `5984` |
  /// | `COUCHDB_TLS` | `false` |
  /// | `COUCHDB_TIMEOUT_MS` | `30000` |
  /// | `COUCHDB_USER` / `COUCHDB_PASSWORD` | no auth |
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let mut opts = Self::default();
    if let Some(host) = lookup("COUCHDB_HOST") {
      opts.host = host;
    }
    if let Some(port) = lookup("COUCHDB_PORT") {
      opts.port = port
        .parse()
        .map_err(|_| Error::Validation(format!("COUCHDB_PORT is not a port: {}", port)))?;
    }
    if let Some(tls) = lookup("COUCHDB_TLS") {
      opts.tls = match tls.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => true,
        "0" | "false" | "no" | "" => false,
        other => {
          return Err(Error::Validation(format!("COUCHDB_TLS is not a boolean: {}", other)))
        }
      };
    }
    if let Some(ms) = lookup("COUCHDB_TIMEOUT_MS") {
      let ms: u64 = ms
        .parse()
        .map_err(|_| Error::Validation(format!("COUCHDB_TIMEOUT_MS is not a number: {}", ms)))?;
      opts.timeout = Duration::from_millis(ms);
    }
    if let Some(username) = lookup("COUCHDB_USER") {
      let password = lookup("COUCHDB_PASSWORD").unwrap_or_default();
      opts.auth = Some(Auth::basic(username, password));
    }
    Ok(opts)
  }

  /// `scheme://host:port`
  pub fn base_url(&self) -> String {
    let scheme = if self.tls { "https" } else { "http" };
    format!("{}://{}:{}", scheme, self.host, self.port)
  }
}

impl Default for ConnectOptions {
  fn default() -> Self {
    Self::new("localhost", DEFAULT_PORT)
  }
}

/// Handle on a CouchDB server.
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Connection {
  base_url: String,
  client: reqwest::Client,
  auth: Option<Auth>,
}

impl Connection {
  /// Plain `http` connection.
  pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self> {
    Self::with_options(ConnectOptions::new(host, port).with_timeout(timeout))
  }

  /// `https` connection.
  pub fn new_tls(host: &str, port: u16, timeout: Duration) -> Result<Self> {
    Self::with_options(
      ConnectOptions::new(host, port)
        .with_tls(true)
        .with_timeout(timeout),
    )
  }

  pub fn with_options(opts: ConnectOptions) -> Result<Self> {
    Self::build(&opts.base_url(), opts.timeout, opts.auth, opts.user_agent)
  }

  /// Connection to a full base URL, e.g. behind a reverse proxy prefix.
  pub fn from_url(url: &str, timeout: Duration) -> Result<Self> {
    Self::build(url, timeout, None, None)
  }

  fn build(
    raw: &str,
    timeout: Duration,
    auth: Option<Auth>,
    user_agent: Option<String>,
  ) -> Result<Self> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
      return Err(Error::InvalidUrl(format!("{}: unsupported scheme", raw)));
    }
    if url.host_str().map_or(true, str::is_empty) {
      return Err(Error::InvalidUrl(format!("{}: missing host", raw)));
    }

    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(user_agent) = user_agent {
      builder = builder.user_agent(user_agent);
    }

    Ok(Self {
      base_url: url.as_str().trim_end_matches('/').to_string(),
      client: builder.build()?,
      auth,
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn default_auth(&self) -> Option<&Auth> {
    self.auth.as_ref()
  }

  /// Issues one request. `path` must already be escaped (see
  /// [`build_path`]). `auth` overrides the connection default.
  ///
  /// Returns the open response on any status below 400; the caller owns
  /// reading or dropping its body.
  #[instrument(
    name = "couchdb_request",
    skip(self, body, headers, auth),
    fields(
      http.method = %method,
      http.url = tracing::field::Empty,
      http.status_code = tracing::field::Empty,
    )
  )]
  pub async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Body>,
    headers: Option<HeaderMap>,
    auth: Option<&Auth>,
  ) -> Result<Response> {
    let url = Url::parse(&format!("{}{}", self.base_url, path))
      .map_err(|e| Error::InvalidUrl(format!("{}{}: {}", self.base_url, path, e)))?;
    Span::current().record("http.url", url.as_str());

    let mut request = self.client.request(method.clone(), url.clone());
    if let Some(auth) = auth.or(self.auth.as_ref()) {
      request = auth.apply(request);
    }
    if let Some(headers) = headers {
      request = request.headers(headers);
    }
    if let Some(body) = body {
      request = request.body(body);
    }

    let response = request.send().await?;
    let status = response.status();
    Span::current().record("http.status_code", status.as_u16());
    tracing::debug!(status = status.as_u16(), "response received");

    if status.as_u16() >= 400 {
      return Err(request_error(method, url, response).await);
    }
    Ok(response)
  }

  /// Checks the server is reachable.
  pub async fn ping(&self) -> Result<()> {
    let response = self.request(Method::HEAD, "/", None, None, None).await?;
    discard(response).await
  }

  /// Server welcome message.
  pub async fn info(&self) -> Result<ServerInfo> {
    let response = self
      .request(Method::GET, "/", None, Some(accept_json()), None)
      .await?;
    read_json(response).await
  }

  /// Names of all databases on the server.
  pub async fn get_db_list(&self) -> Result<Vec<String>> {
    let response = self
      .request(Method::GET, "/_all_dbs", None, Some(accept_json()), None)
      .await?;
    read_json(response).await
  }

  /// Creates a database. Fails with 412 when it already exists.
  pub async fn create_db(&self, name: &str, auth: Option<&Auth>) -> Result<()> {
    let path = build_path(&[name])?;
    let response = self
      .request(Method::PUT, &path, None, Some(accept_json()), auth)
      .await?;
    discard(response).await
  }

  pub async fn delete_db(&self, name: &str, auth: Option<&Auth>) -> Result<()> {
    let path = build_path(&[name])?;
    let response = self
      .request(Method::DELETE, &path, None, Some(accept_json()), auth)
      .await?;
    discard(response).await
  }

  /// Server-generated unique ids.
  pub async fn uuids(&self, count: usize) -> Result<Vec<String>> {
    #[derive(Deserialize)]
    struct Uuids {
      uuids: Vec<String>,
    }

    let params = QueryParams::new().param("count", count.to_string());
    let path = build_path_with_params(&params, &["_uuids"])?;
    let response = self
      .request(Method::GET, &path, None, Some(accept_json()), None)
      .await?;
    let body: Uuids = read_json(response).await?;
    Ok(body.uuids)
  }

  /// Selects a database. No request is made; a wrong name shows up as 404
  /// on the first operation.
  pub fn select_db(&self, name: impl Into<String>) -> Database {
    Database::new(self.clone(), name.into())
  }

  /// Adds a plain user to `_users` and returns the user document's revision.
  ///
  /// Users with custom fields can be written with the ordinary document
  /// methods on the `_users` database.
  pub async fn add_user(
    &self,
    username: &str,
    password: &str,
    roles: Vec<String>,
    auth: Option<&Auth>,
  ) -> Result<String> {
    let user = UserDocument::new(username, password, roles);
    let id = format!("{}{}", USER_PREFIX, username);
    self.users_db(auth).save(&user, &id, "").await
  }

  /// Deletes a user document and returns the deletion revision.
  pub async fn delete_user(&self, username: &str, rev: &str, auth: Option<&Auth>) -> Result<String> {
    let id = format!("{}{}", USER_PREFIX, username);
    self.users_db(auth).delete(&id, rev).await
  }

  fn users_db(&self, auth: Option<&Auth>) -> Database {
    let db = self.select_db("_users");
    match auth {
      Some(auth) => db.with_auth(auth.clone()),
      None => db,
    }
  }

  /// Reads one server configuration value.
  pub async fn get_config(&self, section: &str, option: &str, auth: Option<&Auth>) -> Result<String> {
    let path = build_path(&["_config", section, option])?;
    let response = self
      .request(Method::GET, &path, None, Some(accept_json()), auth)
      .await?;
    read_json(response).await
  }

  /// Sets a configuration value and returns the previous one.
  pub async fn set_config(
    &self,
    section: &str,
    option: &str,
    value: &str,
    auth: Option<&Auth>,
  ) -> Result<String> {
    let path = build_path(&["_config", section, option])?;
    let body = encode_json(&value)?;
    let response = self
      .request(Method::PUT, &path, Some(body), Some(json_headers()), auth)
      .await?;
    read_json(response).await
  }

  /// Removes a configuration value and returns what it was.
  pub async fn delete_config(&self, section: &str, option: &str, auth: Option<&Auth>) -> Result<String> {
    let path = build_path(&["_config", section, option])?;
    let response = self
      .request(Method::DELETE, &path, None, Some(accept_json()), auth)
      .await?;
    read_json(response).await
  }
}

/// Builds the error for a status of 400 or above. HEAD responses have no
/// body, so their code and reason stay empty.
async fn request_error(method: Method, url: Url, response: Response) -> Error {
  let status = response.status();
  let mut payload = CouchError::default();

  if method != Method::HEAD {
    match response.bytes().await {
      Ok(body) => match serde_json::from_slice::<CouchError>(&body) {
        Ok(parsed) => payload = parsed,
        Err(e) => {
          tracing::warn!(error = %e, "undecodable error body");
          payload.reason = String::from_utf8_lossy(&body).trim().to_string();
        }
      },
      Err(e) => tracing::warn!(error = %e, "could not read error body"),
    }
  }

  RequestError {
    status,
    method,
    url: url.to_string(),
    error: payload.error,
    reason: payload.reason,
  }
  .into()
}

pub(crate) fn accept_json() -> HeaderMap {
  let mut headers = HeaderMap::new();
  headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
  headers
}

pub(crate) fn json_headers() -> HeaderMap {
  let mut headers = accept_json();
  headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
  headers
}

/// Inserts a header from caller-supplied text.
pub(crate) fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
  let value = HeaderValue::from_str(value)
    .map_err(|_| Error::Validation(format!("invalid {} header value: {:?}", name, value)))?;
  headers.insert(name, value);
  Ok(())
}

/// `If-Match: rev`, skipped for an empty revision.
pub(crate) fn if_match(headers: &mut HeaderMap, rev: &str) -> Result<()> {
  if rev.is_empty() {
    return Ok(());
  }
  insert_header(headers, IF_MATCH, rev)
}

pub(crate) fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Body> {
  Ok(Body::from(serde_json::to_vec(value)?))
}

pub(crate) fn decode_json<T: DeserializeOwned>(
  body: &[u8],
  id: Option<&str>,
  rev: Option<&str>,
) -> Result<T> {
  serde_json::from_slice(body).map_err(|e| Error::Decode {
    message: e.to_string(),
    id: id.map(str::to_string),
    rev: rev.map(str::to_string),
  })
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
  let body = response.bytes().await?;
  decode_json(&body, None, None)
}

/// Reads the body to the end so the pooled connection can be reused.
pub(crate) async fn discard(response: Response) -> Result<()> {
  response.bytes().await?;
  Ok(())
}

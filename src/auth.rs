//! Request credentials.
//!
//! Every operation takes the effective [`Auth`] and hands it to the request
//! pipeline, which calls [`Auth::apply`] on the outgoing request. Nothing here
//! fails: bad credentials come back from the server as 401/403.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::RequestBuilder;
use sha2::Sha256;

pub const WWW_AUTHENTICATE_HINT: &str = "X-CouchDB-WWW-Authenticate";
pub const PROXY_USERNAME: &str = "X-Auth-CouchDB-UserName";
pub const PROXY_ROLES: &str = "X-Auth-CouchDB-Roles";
pub const PROXY_TOKEN: &str = "X-Auth-CouchDB-Token";

/// Cookie name CouchDB uses for session tokens.
pub const SESSION_COOKIE: &str = "AuthSession";

type HmacSha256 = Hmac<Sha256>;

/// Credentials attached to a request.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
  /// HTTP Basic. An empty username and password sends no header at all.
  Basic { username: String, password: String },
  /// A ready-made `Authorization` value, e.g. forwarded from a proxy.
  PassThrough(String),
  /// Session token from [`Connection::create_session`](crate::Connection::create_session).
  Cookie(String),
  /// CouchDB proxy authentication. The token is only sent when a secret is set.
  Proxy {
    username: String,
    roles: Vec<String>,
    secret: Option<String>,
  },
}

impl Auth {
  pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
    Self::Basic {
      username: username.into(),
      password: password.into(),
    }
  }

  pub fn pass_through(header: impl Into<String>) -> Self {
    Self::PassThrough(header.into())
  }

  pub fn cookie(token: impl Into<String>) -> Self {
    Self::Cookie(token.into())
  }

  pub fn proxy(username: impl Into<String>, roles: Vec<String>, secret: Option<String>) -> Self {
    Self::Proxy {
      username: username.into(),
      roles,
      secret,
    }
  }

  /// User name carried by these credentials, when the variant has one.
  pub fn username(&self) -> Option<&str> {
    match self {
      Auth::Basic { username, .. } | Auth::Proxy { username, .. } => Some(username),
      Auth::PassThrough(_) | Auth::Cookie(_) => None,
    }
  }

  /// Adds the credential headers to an outgoing request.
  pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
    match self {
      Auth::Basic { username, password } => {
        if username.is_empty() && password.is_empty() {
          return request;
        }
        request.header(AUTHORIZATION, basic_header(username, password))
      }
      Auth::PassThrough(header) => request.header(AUTHORIZATION, header.as_str()),
      Auth::Cookie(token) => request
        .header(COOKIE, format!("{}={}", SESSION_COOKIE, token))
        .header(WWW_AUTHENTICATE_HINT, "Cookie"),
      Auth::Proxy {
        username,
        roles,
        secret,
      } => {
        let request = request
          .header(PROXY_USERNAME, username.as_str())
          .header(PROXY_ROLES, roles.join(","));
        match secret.as_deref().and_then(|s| proxy_token(s, username)) {
          Some(token) => request.header(PROXY_TOKEN, token),
          None => request,
        }
      }
    }
  }
}

// Keep secrets out of logs and panic messages.
impl std::fmt::Debug for Auth {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Auth::Basic { username, .. } => f
        .debug_struct("Basic")
        .field("username", username)
        .field("password", &"***")
        .finish(),
      Auth::PassThrough(_) => f.debug_tuple("PassThrough").field(&"***").finish(),
      Auth::Cookie(_) => f.debug_tuple("Cookie").field(&"***").finish(),
      Auth::Proxy { username, roles, .. } => f
        .debug_struct("Proxy")
        .field("username", username)
        .field("roles", roles)
        .finish_non_exhaustive(),
    }
  }
}

/// `Basic base64(username:password)`.
pub fn basic_header(username: &str, password: &str) -> String {
  format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

/// Hex HMAC-SHA256 of the user name keyed with the proxy secret.
pub fn proxy_token(secret: &str, username: &str) -> Option<String> {
  let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
    Ok(mac) => mac,
    Err(e) => {
      tracing::warn!(error = %e, "proxy secret rejected, sending no token");
      return None;
    }
  };
  mac.update(username.as_bytes());
  Some(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::header::HeaderMap;

  fn applied(auth: &Auth) -> HeaderMap {
    let request = reqwest::Client::new().get("http://localhost:5984/");
    auth.apply(request).build().unwrap().headers().clone()
  }

  #[test]
  fn test_basic_header() {
    let headers = applied(&Auth::basic("adminuser", "password"));
    let expected = format!("Basic {}", STANDARD.encode("adminuser:password"));
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), expected.as_str());
    assert_eq!(
      headers.get(AUTHORIZATION).unwrap(),
      "Basic YWRtaW51c2VyOnBhc3N3b3Jk"
    );
  }

  #[test]
  fn test_empty_basic_sends_nothing() {
    let headers = applied(&Auth::basic("", ""));
    assert!(headers.get(AUTHORIZATION).is_none());
  }

  #[test]
  fn test_basic_with_only_username_is_sent() {
    let headers = applied(&Auth::basic("joe", ""));
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic am9lOg==");
  }

  #[test]
  fn test_pass_through_is_verbatim() {
    let headers = applied(&Auth::pass_through("Bearer abc.def"));
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc.def");
  }

  #[test]
  fn test_cookie_sets_session_and_hint() {
    let headers = applied(&Auth::cookie("dG9rZW4"));
    assert_eq!(headers.get(COOKIE).unwrap(), "AuthSession=dG9rZW4");
    assert_eq!(headers.get(WWW_AUTHENTICATE_HINT).unwrap(), "Cookie");
    assert!(headers.get(AUTHORIZATION).is_none());
  }

  #[test]
  fn test_proxy_headers() {
    let auth = Auth::proxy(
      "bob",
      vec!["admins".to_string(), "ops".to_string()],
      Some("s3cret".to_string()),
    );
    let headers = applied(&auth);
    assert_eq!(headers.get(PROXY_USERNAME).unwrap(), "bob");
    assert_eq!(headers.get(PROXY_ROLES).unwrap(), "admins,ops");
    let token = headers.get(PROXY_TOKEN).unwrap().to_str().unwrap();
    assert_eq!(token.len(), 64);
    assert_eq!(Some(token.to_string()), proxy_token("s3cret", "bob"));
  }

  #[test]
  fn test_proxy_without_secret_has_no_token() {
    let headers = applied(&Auth::proxy("bob", Vec::new(), None));
    assert!(headers.get(PROXY_TOKEN).is_none());
    assert_eq!(headers.get(PROXY_ROLES).unwrap(), "");
  }

  #[test]
  fn test_username() {
    assert_eq!(Auth::basic("joe", "pw").username(), Some("joe"));
    assert_eq!(Auth::proxy("bob", Vec::new(), None).username(), Some("bob"));
    assert_eq!(Auth::cookie("t").username(), None);
  }

  #[test]
  fn test_debug_hides_secrets() {
    let rendered = format!("{:?}", Auth::basic("joe", "hunter2"));
    assert!(rendered.contains("joe"));
    assert!(!rendered.contains("hunter2"));
    assert!(!format!("{:?}", Auth::cookie("tok")).contains("tok"));
  }
}

//! Cookie sessions (`/_session`).

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, SET_COOKIE};
use reqwest::{Body, Method};

use crate::auth::{Auth, SESSION_COOKIE};
use crate::connection::{accept_json, discard, read_json, Connection};
use crate::error::{Error, Result};
use crate::types::{SessionResponse, UserContext};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A logged-in session.
#[derive(Clone)]
pub struct Session {
  pub token: String,
  pub user: UserContext,
}

impl Session {
  /// Cookie credentials for subsequent requests.
  pub fn auth(&self) -> Auth {
    Auth::Cookie(self.token.clone())
  }
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("token", &"***")
      .field("user", &self.user)
      .finish()
  }
}

impl Connection {
  /// Logs in with a name and password and returns the session token.
  pub async fn create_session(&self, username: &str, password: &str) -> Result<Session> {
    let form = format!(
      "name={}&password={}",
      urlencoding::encode(username),
      urlencoding::encode(password)
    );
    let mut headers = accept_json();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));

    // Credentials travel in the form; no default auth on login.
    let none = Auth::basic("", "");
    let response = self
      .request(
        Method::POST,
        "/_session",
        Some(Body::from(form)),
        Some(headers),
        Some(&none),
      )
      .await?;

    let token = session_token(response.headers())
      .ok_or_else(|| Error::Protocol("login response set no AuthSession cookie".to_string()))?;
    let unreadable = |message: String| Error::Session {
      message,
      token: token.clone(),
    };
    let body = response
      .bytes()
      .await
      .map_err(|e| unreadable(e.to_string()))?;
    let body: SessionResponse =
      serde_json::from_slice(&body).map_err(|e| unreadable(e.to_string()))?;
    tracing::debug!(user = ?body.name, "session created");

    Ok(Session {
      token,
      user: body.into_user(),
    })
  }

  /// The user the given credentials authenticate as.
  pub async fn get_session(&self, auth: Option<&Auth>) -> Result<UserContext> {
    let response = self
      .request(Method::GET, "/_session", None, Some(accept_json()), auth)
      .await?;
    let body: SessionResponse = read_json(response).await?;
    Ok(body.into_user())
  }

  /// Logs out.
  pub async fn destroy_session(&self, auth: &Auth) -> Result<()> {
    let response = self
      .request(
        Method::DELETE,
        "/_session",
        None,
        Some(accept_json()),
        Some(auth),
      )
      .await?;
    discard(response).await
  }
}

/// Value of the `AuthSession` cookie among the `Set-Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
  let prefix = format!("{}=", SESSION_COOKIE);
  headers
    .get_all(SET_COOKIE)
    .iter()
    .filter_map(|value| value.to_str().ok())
    .filter_map(|cookie| cookie.split(';').next())
    .map(str::trim)
    .find_map(|pair| pair.strip_prefix(prefix.as_str()))
    .filter(|token| !token.is_empty())
    .map(str::to_string)
}

//! Session login/logout tests against a mock CouchDB.

use std::time::Duration;

use couchdb::{Auth, ConnectOptions, Connection, Error};
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const TOKEN: &str = "am9lOjY1QjI3NjFDOn1zW9vJ8J3bXqA";

fn no_authorization(req: &Request) -> bool {
  !req.headers.contains_key("authorization")
}

#[tokio::test]
async fn test_session_lifecycle() {
  let server = MockServer::start().await;
  let conn = Connection::with_options(
    ConnectOptions::new("127.0.0.1", server.address().port())
      .with_timeout(Duration::from_secs(5))
      .with_auth(Auth::basic("admin", "secret")),
  )
  .unwrap();

  Mock::given(method("POST"))
    .and(path("/_session"))
    .and(header("Content-Type", "application/x-www-form-urlencoded"))
    .and(body_string("name=joe&password=p%40ss%20word"))
    .and(no_authorization)
    .respond_with(
      ResponseTemplate::new(200)
        .insert_header(
          "Set-Cookie",
          format!("AuthSession={}; Version=1; Path=/; HttpOnly", TOKEN).as_str(),
        )
        .set_body_json(json!({"ok": true, "name": "joe", "roles": ["ops"]})),
    )
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/_session"))
    .and(header("Cookie", format!("AuthSession={}", TOKEN).as_str()))
    .and(no_authorization)
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "ok": true,
      "userCtx": {"name": "joe", "roles": ["ops"]},
      "info": {"authenticated": "cookie"}
    })))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("DELETE"))
    .and(path("/_session"))
    .and(header("Cookie", format!("AuthSession={}", TOKEN).as_str()))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
    .expect(1)
    .mount(&server)
    .await;

  let session = conn.create_session("joe", "p@ss word").await.unwrap();
  assert_eq!(session.token, TOKEN);
  assert_eq!(session.user.name.as_deref(), Some("joe"));
  assert_eq!(session.user.roles, vec!["ops".to_string()]);

  let auth = session.auth();
  let user = conn.get_session(Some(&auth)).await.unwrap();
  assert_eq!(user.name.as_deref(), Some("joe"));

  conn.destroy_session(&auth).await.unwrap();
}

#[tokio::test]
async fn test_bad_login_is_unauthorized() {
  let server = MockServer::start().await;
  let conn = Connection::from_url(&server.uri(), Duration::from_secs(5)).unwrap();

  Mock::given(method("POST"))
    .and(path("/_session"))
    .respond_with(ResponseTemplate::new(401).set_body_json(json!({
      "error": "unauthorized",
      "reason": "Name or password is incorrect."
    })))
    .mount(&server)
    .await;

  let err = conn.create_session("joe", "wrong").await.unwrap_err();
  let req = err.as_request_error().unwrap();
  assert!(req.is_unauthorized());
  assert_eq!(req.error, "unauthorized");
  assert_eq!(req.reason, "Name or password is incorrect.");
}

#[tokio::test]
async fn test_login_without_cookie_is_protocol_error() {
  let server = MockServer::start().await;
  let conn = Connection::from_url(&server.uri(), Duration::from_secs(5)).unwrap();

  Mock::given(method("POST"))
    .and(path("/_session"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "name": "joe"})))
    .mount(&server)
    .await;

  let err = conn.create_session("joe", "pw").await.unwrap_err();
  assert!(matches!(err, Error::Protocol(_)));
}

#[tokio::test]
async fn test_anonymous_session() {
  let server = MockServer::start().await;
  let conn = Connection::from_url(&server.uri(), Duration::from_secs(5)).unwrap();

  Mock::given(method("GET"))
    .and(path("/_session"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "ok": true,
      "userCtx": {"name": null, "roles": []}
    })))
    .mount(&server)
    .await;

  let user = conn.get_session(None).await.unwrap();
  assert!(user.name.is_none());
  assert!(user.roles.is_empty());
}

#[tokio::test]
async fn test_unreadable_login_body_keeps_token() {
  let server = MockServer::start().await;
  let conn = Connection::from_url(&server.uri(), Duration::from_secs(5)).unwrap();

  Mock::given(method("POST"))
    .and(path("/_session"))
    .respond_with(
      ResponseTemplate::new(200)
        .insert_header("Set-Cookie", "AuthSession=tok123; Version=1; Path=/; HttpOnly")
        .set_body_raw("<html>ok</html>", "text/html"),
    )
    .mount(&server)
    .await;

  match conn.create_session("joe", "pw").await.unwrap_err() {
    Error::Session { token, .. } => assert_eq!(token, "tok123"),
    e => panic!("Expected Session error, got: {:?}", e),
  }
}

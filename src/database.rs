//! Database and document operations.
//!
//! Every mutation takes the caller's idea of the current revision (`""` for a
//! new document), sends it as `If-Match`, and returns the revision the server
//! assigned. Passing a stale revision fails with a 409 conflict.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, ACCEPT, CONTENT_TYPE, CONTENT_LENGTH};
use reqwest::{Body, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::Auth;
use crate::connection::{
  accept_json, decode_json, discard, encode_json, if_match, insert_header, json_headers,
  read_json, Connection,
};
use crate::error::{Error, Result};
use crate::path::{build_path, build_path_with_params};
use crate::query::QueryParams;
use crate::revision;
use crate::types::{DatabaseInfo, Security, WriteResponse, DESIGN_PREFIX};

const DESTINATION: HeaderName = HeaderName::from_static("destination");

/// A named database on a [`Connection`].
#[derive(Debug, Clone)]
pub struct Database {
  name: String,
  connection: Connection,
  auth: Option<Auth>,
}

impl Database {
  pub(crate) fn new(connection: Connection, name: String) -> Self {
    Self {
      name,
      connection,
      auth: None,
    }
  }

  /// Credentials for every request on this database, overriding the
  /// connection default.
  pub fn with_auth(mut self, auth: Auth) -> Self {
    self.auth = Some(auth);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn connection(&self) -> &Connection {
    &self.connection
  }

  /// User name of the effective credentials.
  pub fn username(&self) -> Option<&str> {
    self
      .auth
      .as_ref()
      .or(self.connection.default_auth())
      .and_then(Auth::username)
  }

  async fn send(
    &self,
    method: Method,
    path: &str,
    body: Option<Body>,
    headers: HeaderMap,
  ) -> Result<Response> {
    self
      .connection
      .request(method, path, body, Some(headers), self.auth.as_ref())
      .await
  }

  pub async fn info(&self) -> Result<DatabaseInfo> {
    let path = build_path(&[self.name.as_str()])?;
    let response = self.send(Method::GET, &path, None, accept_json()).await?;
    read_json(response).await
  }

  /// `HEAD /{db}`; a 404 is `Ok(false)`.
  pub async fn exists(&self) -> Result<bool> {
    let path = build_path(&[self.name.as_str()])?;
    match self.send(Method::HEAD, &path, None, HeaderMap::new()).await {
      Ok(response) => {
        discard(response).await?;
        Ok(true)
      }
      Err(e) if e.is_not_found() => Ok(false),
      Err(e) => Err(e),
    }
  }

  /// Saves a document under `id`.
  ///
  /// Pass `""` as `rev` to create it; to update, pass the current revision.
  /// Returns the new revision.
  pub async fn save<T: Serialize + ?Sized>(&self, doc: &T, id: &str, rev: &str) -> Result<String> {
    if id.is_empty() {
      return Err(Error::Validation("no document id specified".to_string()));
    }
    self.save_at(&[self.name.as_str(), id], doc, rev).await
  }

  async fn save_at<T: Serialize + ?Sized>(
    &self,
    segments: &[&str],
    doc: &T,
    rev: &str,
  ) -> Result<String> {
    let path = build_path(segments)?;
    let mut headers = json_headers();
    if_match(&mut headers, rev)?;
    let body = encode_json(doc)?;
    let response = self.send(Method::PUT, &path, Some(body), headers).await?;
    revision::from_response(response).await
  }

  /// Creates a document with a server-generated id. Returns `(id, rev)`.
  pub async fn create<T: Serialize + ?Sized>(&self, doc: &T) -> Result<(String, String)> {
    let path = build_path(&[self.name.as_str()])?;
    let body = encode_json(doc)?;
    let response = self.send(Method::POST, &path, Some(body), json_headers()).await?;

    let headers = response.headers().clone();
    let body = response.bytes().await?;
    let rev = match revision::require(&headers, &body) {
      Ok(rev) => rev,
      Err(err) => {
        // keep a server-assigned id even without a revision
        let id = serde_json::from_slice::<WriteResponse>(&body)
          .ok()
          .and_then(|w| w.id)
          .filter(|id| !id.is_empty());
        return Err(match id {
          Some(id) => Error::Decode {
            message: err.to_string(),
            id: Some(id),
            rev: None,
          },
          None => err,
        });
      }
    };
    let written: WriteResponse = decode_json(&body, None, Some(&rev))?;
    match written.id.filter(|id| !id.is_empty()) {
      Some(id) => Ok((id, rev)),
      None => Err(Error::Decode {
        message: "response carries no document id".to_string(),
        id: None,
        rev: Some(rev),
      }),
    }
  }

  /// Reads a document and its current revision.
  ///
  /// The whole JSON body is decoded into `T`, including `_id` and `_rev`
  /// when `T` asks for them.
  pub async fn read<T: DeserializeOwned>(&self, id: &str) -> Result<(T, String)> {
    self.read_with_params(id, &QueryParams::new()).await
  }

  /// [`read`](Self::read) with query parameters such as `rev` or `conflicts`.
  pub async fn read_with_params<T: DeserializeOwned>(
    &self,
    id: &str,
    params: &QueryParams,
  ) -> Result<(T, String)> {
    if id.is_empty() {
      return Err(Error::Validation("no document id specified".to_string()));
    }
    let path = build_path_with_params(params, &[self.name.as_str(), id])?;
    let response = self.send(Method::GET, &path, None, accept_json()).await?;

    let etag = revision::from_etag(response.headers());
    let body = response.bytes().await?;
    let value: serde_json::Value = decode_json(&body, Some(id), etag.as_deref())?;
    let rev = etag
      .or_else(|| {
        value
          .get("_rev")
          .and_then(serde_json::Value::as_str)
          .map(str::to_string)
      })
      .filter(|rev| !rev.is_empty())
      .ok_or_else(revision::missing)?;

    let doc = serde_json::from_value(value).map_err(|e| Error::Decode {
      message: e.to_string(),
      id: Some(id.to_string()),
      rev: Some(rev.clone()),
    })?;
    Ok((doc, rev))
  }

  /// Marks a document deleted. CouchDB assigns a revision to the deletion,
  /// which is returned.
  pub async fn delete(&self, id: &str, rev: &str) -> Result<String> {
    if id.is_empty() {
      return Err(Error::Validation("no document id specified".to_string()));
    }
    let path = build_path(&[self.name.as_str(), id])?;
    let mut headers = accept_json();
    if_match(&mut headers, rev)?;
    let response = self.send(Method::DELETE, &path, None, headers).await?;
    revision::from_response(response).await
  }

  /// Copies a document to `to_id` and returns the new document's revision.
  /// `from_rev` may be empty to copy the latest revision.
  pub async fn copy(&self, from_id: &str, from_rev: &str, to_id: &str) -> Result<String> {
    if from_id.is_empty() || to_id.is_empty() {
      return Err(Error::Validation(
        "source and destination ids must be specified".to_string(),
      ));
    }
    let path = build_path(&[self.name.as_str(), from_id])?;
    let mut headers = accept_json();
    if_match(&mut headers, from_rev)?;
    insert_header(&mut headers, DESTINATION, to_id)?;

    let copy = Method::from_bytes(b"COPY")
      .map_err(|e| Error::Validation(format!("COPY method: {}", e)))?;
    let response = self.send(copy, &path, None, headers).await?;
    revision::from_response(response).await
  }

  /// Stores an attachment on a document. `doc_rev` is the parent document's
  /// current revision; the document's new revision is returned.
  pub async fn save_attachment(
    &self,
    doc_id: &str,
    doc_rev: &str,
    name: &str,
    mime_type: &str,
    content: impl Into<Body>,
  ) -> Result<String> {
    let path = build_path(&[self.name.as_str(), doc_id, name])?;
    let mut headers = accept_json();
    insert_header(&mut headers, CONTENT_TYPE, mime_type)?;
    if_match(&mut headers, doc_rev)?;
    let response = self
      .send(Method::PUT, &path, Some(content.into()), headers)
      .await?;
    revision::from_response(response).await
  }

  /// Opens an attachment. The returned [`Attachment`] owns the response
  /// stream; dropping it closes the stream.
  pub async fn get_attachment(
    &self,
    doc_id: &str,
    doc_rev: &str,
    mime_type: &str,
    name: &str,
  ) -> Result<Attachment> {
    let path = build_path(&[self.name.as_str(), doc_id, name])?;
    let mut headers = HeaderMap::new();
    if !mime_type.is_empty() {
      insert_header(&mut headers, ACCEPT, mime_type)?;
    }
    if_match(&mut headers, doc_rev)?;
    let response = self.send(Method::GET, &path, None, headers).await?;
    Ok(Attachment { response })
  }

  pub async fn delete_attachment(&self, doc_id: &str, doc_rev: &str, name: &str) -> Result<String> {
    let path = build_path(&[self.name.as_str(), doc_id, name])?;
    let mut headers = accept_json();
    if_match(&mut headers, doc_rev)?;
    let response = self.send(Method::DELETE, &path, None, headers).await?;
    revision::from_response(response).await
  }

  pub async fn get_security(&self) -> Result<Security> {
    let path = build_path(&[self.name.as_str(), "_security"])?;
    let response = self.send(Method::GET, &path, None, accept_json()).await?;
    read_json(response).await
  }

  pub async fn save_security(&self, security: &Security) -> Result<()> {
    let path = build_path(&[self.name.as_str(), "_security"])?;
    let body = encode_json(security)?;
    let response = self
      .send(Method::PUT, &path, Some(body), json_headers())
      .await?;
    discard(response).await
  }

  /// Saves `_design/{name}`. Pass `""` as `rev` for a new design document.
  pub async fn save_design_doc<T: Serialize + ?Sized>(
    &self,
    name: &str,
    design_doc: &T,
    rev: &str,
  ) -> Result<String> {
    self
      .save_at(&[self.name.as_str(), DESIGN_PREFIX, name], design_doc, rev)
      .await
  }

  /// Queries a view. `T` is usually a [`ViewResult`](crate::ViewResult).
  pub async fn get_view<T: DeserializeOwned>(
    &self,
    design_doc: &str,
    view: &str,
    params: Option<&QueryParams>,
  ) -> Result<T> {
    let params = params.cloned().unwrap_or_default();
    let path = build_path_with_params(
      &params,
      &[self.name.as_str(), DESIGN_PREFIX, design_doc, "_view", view],
    )?;
    let response = self.send(Method::GET, &path, None, accept_json()).await?;
    read_json(response).await
  }

  /// Runs a list function over a view and returns its rendered output.
  pub async fn get_list(
    &self,
    design_doc: &str,
    list: &str,
    view: &str,
    params: Option<&QueryParams>,
  ) -> Result<String> {
    let params = params.cloned().unwrap_or_default();
    let path = build_path_with_params(
      &params,
      &[self.name.as_str(), DESIGN_PREFIX, design_doc, "_list", list, view],
    )?;
    let response = self.send(Method::GET, &path, None, HeaderMap::new()).await?;
    Ok(response.text().await?)
  }
}

/// An attachment body still being received.
#[derive(Debug)]
pub struct Attachment {
  response: Response,
}

impl Attachment {
  pub fn content_type(&self) -> Option<&str> {
    self
      .response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
  }

  pub fn content_length(&self) -> Option<u64> {
    self
      .response
      .headers()
      .get(CONTENT_LENGTH)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.parse().ok())
  }

  /// Reads the whole attachment into memory.
  pub async fn bytes(self) -> Result<Bytes> {
    Ok(self.response.bytes().await?)
  }

  /// Streams the attachment in chunks as they arrive.
  pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> {
    self
      .response
      .bytes_stream()
      .map(|chunk| chunk.map_err(Error::from))
  }
}

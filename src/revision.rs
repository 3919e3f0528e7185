//! Revision extraction from successful responses.
//!
//! CouchDB reports the new revision of a document in the `ETag` header
//! (quoted) and, for most writes, as `rev` in the JSON body. The header is
//! read first; the body is the fallback. A success carrying neither is a
//! malformed response.

use bytes::Bytes;
use reqwest::header::{HeaderMap, ETAG};
use reqwest::Response;

use crate::error::{Error, Result};
use crate::types::WriteResponse;

/// Strips one leading and one trailing `"`.
pub fn strip_quotes(etag: &str) -> &str {
    let etag = etag.strip_prefix('"').unwrap_or(etag);
    etag.strip_suffix('"').unwrap_or(etag)
}

/// Revision from the `ETag` header, if present and non-empty.
pub fn from_etag(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(ETAG)?.to_str().ok()?;
    let rev = strip_quotes(value.trim());
    if rev.is_empty() {
        None
    } else {
        Some(rev.to_string())
    }
}

/// Revision from a `{"ok": true, "id": .., "rev": ..}` body.
pub fn from_write_body(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<WriteResponse>(body)
        .ok()
        .and_then(|w| w.rev)
        .filter(|rev| !rev.is_empty())
}

/// Revision of a mutation: header first, then body.
pub fn require(headers: &HeaderMap, body: &[u8]) -> Result<String> {
    if let Some(rev) = from_etag(headers) {
        tracing::debug!(rev = %rev, "revision from ETag");
        return Ok(rev);
    }
    if let Some(rev) = from_write_body(body) {
        tracing::debug!(rev = %rev, "revision from response body");
        return Ok(rev);
    }
    Err(missing())
}

/// Reads a mutation response to the end and extracts its revision.
pub(crate) async fn from_response(response: Response) -> Result<String> {
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(Error::from);
    settle(&headers, body)
}

/// Revision of a mutation whose body may have failed to arrive. The status
/// line already reported success, so an `ETag` revision stands on its own.
fn settle(headers: &HeaderMap, body: Result<Bytes>) -> Result<String> {
    match body {
        Ok(body) => require(headers, &body),
        Err(err) => match from_etag(headers) {
            Some(rev) => {
                tracing::warn!(rev = %rev, error = %err, "response body lost after ETag revision");
                Ok(rev)
            }
            None => Err(err),
        },
    }
}

pub(crate) fn missing() -> Error {
    Error::Protocol("server reported success but returned no revision".to_string())
}

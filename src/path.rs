//! Resource path assembly.
//!
//! Each logical segment (database, document id, attachment name, ...) is
//! percent-encoded on its own, so ids containing `/`, `?` or `#` stay one
//! segment on the wire.

use crate::error::{Error, Result};
use crate::query::QueryParams;

/// Joins escaped segments into `/a/b/c`.
///
/// Empty segments are rejected, as are `.` and `..`: URL normalization
/// would fold them into the parent resource, even percent-encoded.
pub fn build_path(segments: &[&str]) -> Result<String> {
    let mut path = String::new();
    for segment in segments {
        if segment.is_empty() {
            return Err(Error::Validation(format!(
                "empty path segment in {:?}",
                segments
            )));
        }
        if *segment == "." || *segment == ".." {
            return Err(Error::Validation(format!(
                "dot path segment {:?} in {:?}",
                segment, segments
            )));
        }
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
    }
    if path.is_empty() {
        path.push('/');
    }
    Ok(path)
}

/// Like [`build_path`], followed by `?query` when `params` is non-empty.
pub fn build_path_with_params(params: &QueryParams, segments: &[&str]) -> Result<String> {
    let mut path = build_path(segments)?;
    if !params.is_empty() {
        path.push('?');
        path.push_str(&params.to_query_string());
    }
    Ok(path)
}

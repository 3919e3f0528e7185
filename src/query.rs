//! Query-string parameters for document reads and views
//!
//! Provides a fluent builder for the parameters CouchDB accepts on `GET`
//! requests. Key-like parameters are JSON-encoded, as the server expects.

use serde::Serialize;

use crate::error::Result;

/// Ordered list of query parameters
///
/// # Example
/// ```
/// use couchdb::QueryParams;
///
/// let params = QueryParams::new()
///     .start_key(&"a").unwrap()
///     .end_key(&"z").unwrap()
///     .limit(10)
///     .include_docs(true);
///
/// assert_eq!(params.to_query_string(), "startkey=%22a%22&endkey=%22z%22&limit=10&include_docs=true");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw parameter; repeated keys are kept in order
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    fn json_param<T: Serialize + ?Sized>(self, key: &str, value: &T) -> Result<Self> {
        let encoded = serde_json::to_string(value)?;
        Ok(self.param(key, encoded))
    }

    /// Only rows matching this key
    pub fn key<T: Serialize + ?Sized>(self, key: &T) -> Result<Self> {
        self.json_param("key", key)
    }

    /// Only rows matching one of these keys
    pub fn keys<T: Serialize>(self, keys: &[T]) -> Result<Self> {
        self.json_param("keys", keys)
    }

    pub fn start_key<T: Serialize + ?Sized>(self, key: &T) -> Result<Self> {
        self.json_param("startkey", key)
    }

    pub fn end_key<T: Serialize + ?Sized>(self, key: &T) -> Result<Self> {
        self.json_param("endkey", key)
    }

    pub fn limit(self, n: usize) -> Self {
        self.param("limit", n.to_string())
    }

    pub fn skip(self, n: usize) -> Self {
        self.param("skip", n.to_string())
    }

    pub fn descending(self, yes: bool) -> Self {
        self.param("descending", yes.to_string())
    }

    pub fn include_docs(self, yes: bool) -> Self {
        self.param("include_docs", yes.to_string())
    }

    pub fn inclusive_end(self, yes: bool) -> Self {
        self.param("inclusive_end", yes.to_string())
    }

    pub fn reduce(self, yes: bool) -> Self {
        self.param("reduce", yes.to_string())
    }

    pub fn group(self, yes: bool) -> Self {
        self.param("group", yes.to_string())
    }

    pub fn group_level(self, level: u32) -> Self {
        self.param("group_level", level.to_string())
    }

    /// Read a specific document revision
    pub fn rev(self, rev: impl Into<String>) -> Self {
        self.param("rev", rev)
    }

    /// Include the revision history of a document
    pub fn revs(self, yes: bool) -> Self {
        self.param("revs", yes.to_string())
    }

    /// Include conflicting revisions of a document
    pub fn conflicts(self, yes: bool) -> Self {
        self.param("conflicts", yes.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Percent-encoded `k=v&k=v` form, without the leading `?`
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_params() {
        let params = QueryParams::new();
        assert!(params.is_empty());
        assert_eq!(params.to_query_string(), "");
    }

    #[test]
    fn test_keys_are_json_encoded() {
        let params = QueryParams::new().key(&json!(["a", 1])).unwrap();
        assert_eq!(params.pairs()[0], ("key".to_string(), r#"["a",1]"#.to_string()));
        assert_eq!(params.to_query_string(), "key=%5B%22a%22%2C1%5D");
    }

    #[test]
    fn test_order_is_preserved() {
        let params = QueryParams::new()
            .descending(true)
            .limit(5)
            .skip(2)
            .reduce(false);
        assert_eq!(
            params.to_query_string(),
            "descending=true&limit=5&skip=2&reduce=false"
        );
    }

    #[test]
    fn test_document_read_params() {
        let params = QueryParams::new().rev("2-abc").revs(true).conflicts(true);
        assert_eq!(params.to_query_string(), "rev=2-abc&revs=true&conflicts=true");
    }

    #[test]
    fn test_from_iterator() {
        let params: QueryParams = vec![("a b", "c&d")].into_iter().collect();
        assert_eq!(params.to_query_string(), "a%20b=c%26d");
    }
}

//! CouchDB Rust SDK - Query Parameter and Path Tests

use couchdb::path::{build_path, build_path_with_params};
use couchdb::{Error, QueryParams};
use serde_json::json;

#[test]
fn test_view_range_query() {
    let params = QueryParams::new()
        .start_key(&json!(["2024", 1]))
        .unwrap()
        .end_key(&json!(["2024", {}]))
        .unwrap()
        .inclusive_end(false)
        .descending(false);

    let pairs = params.pairs();
    assert_eq!(pairs[0].1, r#"["2024",1]"#);
    assert_eq!(pairs[1].1, r#"["2024",{}]"#);
    assert_eq!(pairs[2], ("inclusive_end".to_string(), "false".to_string()));
}

#[test]
fn test_keys_query() {
    let params = QueryParams::new().keys(&["a", "b"]).unwrap();
    assert_eq!(params.to_query_string(), "keys=%5B%22a%22%2C%22b%22%5D");
}

#[test]
fn test_grouped_reduce() {
    let params = QueryParams::new().reduce(true).group(true).group_level(2);
    assert_eq!(params.to_query_string(), "reduce=true&group=true&group_level=2");
}

#[test]
fn test_include_docs_with_paging() {
    let params = QueryParams::new().include_docs(true).limit(10).skip(20);
    assert_eq!(
        build_path_with_params(&params, &["orders", "_design", "by_date", "_view", "all"]).unwrap(),
        "/orders/_design/by_date/_view/all?include_docs=true&limit=10&skip=20"
    );
}

#[test]
fn test_attachment_path() {
    assert_eq!(
        build_path(&["orders", "o1", "receipt 2024.pdf"]).unwrap(),
        "/orders/o1/receipt%202024.pdf"
    );
}

#[test]
fn test_missing_database_name() {
    assert!(matches!(build_path(&["", "o1"]), Err(Error::Validation(_))));
}

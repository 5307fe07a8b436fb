//! Shared test fixtures and helper utilities.
//!
//! Provides canned backend responses and a mock search server for the
//! integration tests.
#![allow(dead_code)]

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Index queried by default.
pub const INDEX: &str = "lclslogs";

/// Newest line, as the backend returns it first.
pub const NEWEST_LINE: &str = "Dec  6 10:31:00 psana101 monit[6494]: Cannot create socket";

/// Oldest line, as the backend returns it last.
pub const OLDEST_LINE: &str = "Dec  6 10:30:00 psana101 cron[2]: job started";

/// A `_count` response reporting `count` documents.
pub fn count_response(count: u64) -> Value {
    json!({ "count": count, "_shards": { "total": 1, "successful": 1, "failed": 0 } })
}

/// A `_search` response with the given lines, newest first.
pub fn search_response(lines: &[&str]) -> Value {
    let hits: Vec<Value> = lines
        .iter()
        .map(|line| json!({ "_index": INDEX, "_source": { "src": line, "date": "2018-12-06" } }))
        .collect();
    json!({ "hits": { "total": { "value": hits.len() }, "hits": hits } })
}

/// A `_search` response where `psana101` is highlighted in every line.
pub fn highlighted_response(lines: &[&str]) -> Value {
    let hits: Vec<Value> = lines
        .iter()
        .map(|line| {
            json!({
                "_source": { "src": line },
                "highlight": { "src": [line.replace("psana101", "<em>psana101</em>")] }
            })
        })
        .collect();
    json!({ "hits": { "hits": hits } })
}

/// Mount a mock answering `endpoint` with `body`, expecting `calls` requests.
pub async fn mount(server: &MockServer, endpoint: &str, body: Value, calls: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/{INDEX}/{endpoint}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

/// Mount mocks that fail the test if any request reaches the server.
pub async fn forbid_requests(server: &MockServer) {
    mount(server, "_count", count_response(0), 0).await;
    mount(server, "_search", search_response(&[]), 0).await;
}

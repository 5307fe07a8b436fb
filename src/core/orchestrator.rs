//! Request construction and response extraction for the search backend.
//!
//! Every request combines the user's free-text query with a wildcard
//! match and a range filter on the date field, so filtered and unfiltered
//! searches share one code path:
//!
//! ```text
//! { "query": { "bool": {
//!     "must":   { "query_string": { "default_field": "src", "query": "* AND ( <q> )" } },
//!     "filter": { "range": { "date": { "gt": <start ms>, "lt": <end ms> } } } } } }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::core::backend::{Operation, SearchBackend};
use crate::core::policy::SearchWindowPolicy;
use crate::core::result::{ResultLine, SearchResult};
use crate::core::window::TimeRange;
use crate::error::ElasticoError;

/// Names of the document fields the queries refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFields {
    /// Field holding the full log line; the default field for queries.
    pub text: String,
    /// Field holding the timestamp of the line.
    pub date: String,
}

impl Default for IndexFields {
    fn default() -> Self {
        Self {
            text: "src".to_string(),
            date: "date".to_string(),
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Newest lines first.
    #[default]
    TimeDescending,
    /// The backend's relevance ranking.
    Relevance,
}

/// Presentation options that do not affect which lines match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOptions {
    /// Result ordering.
    pub sort: SortMode,
    /// Ask the backend to delimit matched spans.
    pub highlight: bool,
}

/// A fully specified, bounded fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    query: String,
    size: u32,
    range: TimeRange,
    options: SearchOptions,
}

impl SearchRequest {
    /// Build a request for at most `size` lines.
    pub fn new(query: &str, size: u32, range: TimeRange, options: SearchOptions) -> Self {
        Self {
            query: query.to_string(),
            size,
            range,
            options,
        }
    }

    /// Maximum number of lines requested.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The time filter.
    pub fn range(&self) -> TimeRange {
        self.range
    }
}

/// Number of documents the backend reports for a query and time filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchCount(pub u64);

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
    #[serde(default)]
    highlight: HashMap<String, Vec<String>>,
}

/// Wrap the user's query so it always runs against the wildcard match.
fn compose_query(query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        "*".to_string()
    } else {
        format!("* AND ( {query} )")
    }
}

/// Issues count and fetch requests and extracts result lines.
pub struct QueryOrchestrator<'a, B: SearchBackend> {
    backend: &'a B,
    fields: &'a IndexFields,
}

impl<'a, B: SearchBackend> QueryOrchestrator<'a, B> {
    /// Create an orchestrator over `backend` for an index with `fields`.
    pub fn new(backend: &'a B, fields: &'a IndexFields) -> Self {
        Self { backend, fields }
    }

    fn filtered_query(&self, query: &str, range: TimeRange) -> Value {
        json!({
            "bool": {
                "must": {
                    "query_string": {
                        "default_field": self.fields.text,
                        "query": compose_query(query),
                    }
                },
                "filter": {
                    "range": {
                        (self.fields.date.as_str()): {
                            "gt": range.gt_millis,
                            "lt": range.lt_millis,
                        }
                    }
                }
            }
        })
    }

    /// The body of a count request: query and time filter only.
    pub fn count_body(&self, query: &str, range: TimeRange) -> Value {
        json!({ "query": self.filtered_query(query, range) })
    }

    /// The body of a fetch request.
    pub fn search_body(&self, request: &SearchRequest) -> Value {
        let mut body = Map::new();
        body.insert(
            "query".to_string(),
            self.filtered_query(&request.query, request.range),
        );
        body.insert("size".to_string(), json!(request.size));

        if request.options.sort == SortMode::TimeDescending {
            body.insert(
                "sort".to_string(),
                json!({ (self.fields.date.as_str()): { "order": "desc" } }),
            );
        }
        if request.options.highlight {
            // A single unfragmented highlight keeps the whole line.
            body.insert(
                "highlight".to_string(),
                json!({ "fields": { (self.fields.text.as_str()): { "number_of_fragments": 0 } } }),
            );
        }

        Value::Object(body)
    }

    fn failure(&self, operation: Operation, reason: String, raw: &str) -> ElasticoError {
        ElasticoError::BackendQueryFailure {
            url: self.backend.describe(operation),
            reason,
            response: Some(raw.to_string()),
        }
    }

    /// Ask the backend how many documents match `query` within `range`.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticoError::BackendQueryFailure`] if the request fails or
    /// the response carries no count.
    pub fn count(&self, query: &str, range: TimeRange) -> Result<MatchCount, ElasticoError> {
        let body = self.count_body(query, range);
        tracing::debug!(body = %body, "count query");

        let raw = self.backend.execute(Operation::Count, &body)?;
        tracing::debug!(response = %raw, "count query result");

        let parsed: CountResponse = serde_json::from_str(&raw).map_err(|e| {
            self.failure(
                Operation::Count,
                format!("response has no document count: {e}"),
                &raw,
            )
        })?;

        Ok(MatchCount(parsed.count))
    }

    /// Issue exactly one fetch and return its lines in backend order.
    ///
    /// In highlight mode a hit without a highlight fragment falls back to
    /// its plain line, so both modes return the same lines.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticoError::BackendQueryFailure`] if the request fails,
    /// the body cannot be parsed, or a hit lacks the text field.
    pub fn fetch(&self, request: &SearchRequest) -> Result<SearchResult, ElasticoError> {
        let body = self.search_body(request);
        tracing::debug!(body = %body, "search query");

        let raw = self.backend.execute(Operation::Search, &body)?;
        let parsed: SearchResponse = serde_json::from_str(&raw).map_err(|e| {
            self.failure(
                Operation::Search,
                format!("response has no search hits: {e}"),
                &raw,
            )
        })?;

        let field = self.fields.text.as_str();
        let mut lines = Vec::with_capacity(parsed.hits.hits.len());
        for (position, mut hit) in parsed.hits.hits.into_iter().enumerate() {
            let highlighted = request
                .options
                .highlight
                .then(|| hit.highlight.remove(field))
                .flatten()
                .and_then(|fragments| fragments.into_iter().next());

            let line = match highlighted {
                Some(fragment) => ResultLine::Highlighted(fragment),
                None => match hit.source.remove(field) {
                    Some(Value::String(line)) => ResultLine::Plain(line),
                    _ => {
                        return Err(self.failure(
                            Operation::Search,
                            format!("hit {position} has no '{field}' text field"),
                            &raw,
                        ));
                    }
                },
            };
            lines.push(line);
        }

        let result = SearchResult::new(lines);
        tracing::debug!(lines = result.len(), "search returned");
        Ok(result)
    }

    /// Run a complete search: plan the size under `policy`, then fetch.
    ///
    /// When the policy refuses the window no fetch is issued.
    ///
    /// # Errors
    ///
    /// Returns any error from planning or fetching.
    pub fn search(
        &self,
        query: &str,
        policy: &SearchWindowPolicy,
        options: SearchOptions,
        now: DateTime<FixedOffset>,
    ) -> Result<SearchResult, ElasticoError> {
        let plan = policy.plan(self, query, now)?;
        let request = SearchRequest::new(query, plan.size, plan.range, options);
        tracing::debug!(
            size = request.size(),
            count = ?plan.count.map(|count| count.0),
            gt = request.range().gt_millis,
            lt = request.range().lt_millis,
            "fetching lines"
        );
        self.fetch(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fake::FakeBackend;

    const RANGE: TimeRange = TimeRange {
        gt_millis: 1_544_120_000_000,
        lt_millis: 1_544_292_800_000,
    };

    fn search_response() -> String {
        json!({
            "hits": { "hits": [
                {
                    "_source": { "src": "Dec  6 10:31:00 psana101 monit[1]: socket refused" },
                    "highlight": { "src": ["Dec  6 10:31:00 <em>psana101</em> monit[1]: socket refused"] }
                },
                {
                    "_source": { "src": "Dec  6 10:30:00 psana101 cron[2]: job started" },
                    "highlight": { "src": ["Dec  6 10:30:00 <em>psana101</em> cron[2]: job started"] }
                }
            ]}
        })
        .to_string()
    }

    fn request(options: SearchOptions) -> SearchRequest {
        SearchRequest::new("psana101", 2, RANGE, options)
    }

    #[test]
    fn test_compose_query_wraps_user_query() {
        assert_eq!(compose_query("psana101"), "* AND ( psana101 )");
        assert_eq!(
            compose_query("nmingott AND machine:*metric*"),
            "* AND ( nmingott AND machine:*metric* )"
        );
    }

    #[test]
    fn test_compose_query_blank_matches_everything() {
        assert_eq!(compose_query("   "), "*");
    }

    #[test]
    fn test_count_body_has_no_sort_highlight_or_size() {
        let backend = FakeBackend::new();
        let fields = IndexFields::default();
        let body = QueryOrchestrator::new(&backend, &fields).count_body("monit", RANGE);

        assert_eq!(
            body,
            json!({
                "query": { "bool": {
                    "must": { "query_string": { "default_field": "src", "query": "* AND ( monit )" } },
                    "filter": { "range": { "date": {
                        "gt": 1_544_120_000_000_i64,
                        "lt": 1_544_292_800_000_i64
                    } } }
                } }
            })
        );
    }

    #[test]
    fn test_search_body_time_sorted_with_highlight() {
        let backend = FakeBackend::new();
        let fields = IndexFields::default();
        let body = QueryOrchestrator::new(&backend, &fields).search_body(&request(SearchOptions {
            sort: SortMode::TimeDescending,
            highlight: true,
        }));

        assert_eq!(body["size"], 2);
        assert_eq!(body["sort"]["date"]["order"], "desc");
        assert_eq!(body["highlight"]["fields"]["src"]["number_of_fragments"], 0);
        assert_eq!(body["query"]["bool"]["filter"]["range"]["date"]["gt"], RANGE.gt_millis);
    }

    #[test]
    fn test_search_body_relevance_without_highlight() {
        let backend = FakeBackend::new();
        let fields = IndexFields::default();
        let body = QueryOrchestrator::new(&backend, &fields).search_body(&request(SearchOptions {
            sort: SortMode::Relevance,
            highlight: false,
        }));

        assert!(body.get("sort").is_none());
        assert!(body.get("highlight").is_none());
    }

    #[test]
    fn test_custom_field_names_are_used() {
        let backend = FakeBackend::new();
        let fields = IndexFields {
            text: "message".to_string(),
            date: "@timestamp".to_string(),
        };
        let body = QueryOrchestrator::new(&backend, &fields).search_body(&request(SearchOptions {
            sort: SortMode::TimeDescending,
            highlight: true,
        }));

        assert_eq!(
            body["query"]["bool"]["must"]["query_string"]["default_field"],
            "message"
        );
        assert!(body["query"]["bool"]["filter"]["range"]["@timestamp"].is_object());
        assert!(body["sort"]["@timestamp"].is_object());
        assert!(body["highlight"]["fields"]["message"].is_object());
    }

    #[test]
    fn test_count_parses_document_count() {
        let backend = FakeBackend::new().respond(
            Operation::Count,
            r#"{"count":19,"_shards":{"total":5,"successful":5,"skipped":0,"failed":0}}"#,
        );
        let fields = IndexFields::default();
        let count = QueryOrchestrator::new(&backend, &fields)
            .count("monit", RANGE)
            .unwrap();
        assert_eq!(count, MatchCount(19));
        assert_eq!(backend.requests().len(), 1);
    }

    #[test]
    fn test_count_without_count_field_fails_with_raw_response() {
        let backend = FakeBackend::new().respond(Operation::Count, r#"{"error":"index_not_found"}"#);
        let fields = IndexFields::default();
        let err = QueryOrchestrator::new(&backend, &fields)
            .count("monit", RANGE)
            .unwrap_err();
        assert!(matches!(
            err,
            ElasticoError::BackendQueryFailure { response: Some(raw), .. } if raw.contains("index_not_found")
        ));
    }

    #[test]
    fn test_fetch_returns_plain_lines_in_backend_order() {
        let backend = FakeBackend::new().respond(Operation::Search, &search_response());
        let fields = IndexFields::default();
        let result = QueryOrchestrator::new(&backend, &fields)
            .fetch(&request(SearchOptions::default()))
            .unwrap();

        assert_eq!(
            result.lines(),
            &[
                ResultLine::Plain("Dec  6 10:31:00 psana101 monit[1]: socket refused".to_string()),
                ResultLine::Plain("Dec  6 10:30:00 psana101 cron[2]: job started".to_string()),
            ]
        );
    }

    #[test]
    fn test_fetch_highlighted_lines_match_plain_text() {
        let fields = IndexFields::default();

        let plain_backend = FakeBackend::new().respond(Operation::Search, &search_response());
        let plain = QueryOrchestrator::new(&plain_backend, &fields)
            .fetch(&request(SearchOptions {
                highlight: false,
                ..SearchOptions::default()
            }))
            .unwrap();

        let marked_backend = FakeBackend::new().respond(Operation::Search, &search_response());
        let marked = QueryOrchestrator::new(&marked_backend, &fields)
            .fetch(&request(SearchOptions {
                highlight: true,
                ..SearchOptions::default()
            }))
            .unwrap();

        assert_eq!(plain.len(), marked.len());
        assert!(matches!(marked.lines()[0], ResultLine::Highlighted(_)));
        for (a, b) in plain.lines().iter().zip(marked.lines()) {
            assert_eq!(a.text(), b.text());
        }
    }

    #[test]
    fn test_fetch_highlight_falls_back_to_source_line() {
        let response = json!({
            "hits": { "hits": [
                { "_source": { "src": "matched on another field" } }
            ]}
        })
        .to_string();
        let backend = FakeBackend::new().respond(Operation::Search, &response);
        let fields = IndexFields::default();
        let result = QueryOrchestrator::new(&backend, &fields)
            .fetch(&request(SearchOptions {
                highlight: true,
                ..SearchOptions::default()
            }))
            .unwrap();

        assert_eq!(
            result.lines(),
            &[ResultLine::Plain("matched on another field".to_string())]
        );
    }

    #[test]
    fn test_fetch_empty_hits() {
        let backend = FakeBackend::new().respond(Operation::Search, r#"{"hits":{"hits":[]}}"#);
        let fields = IndexFields::default();
        let result = QueryOrchestrator::new(&backend, &fields)
            .fetch(&request(SearchOptions::default()))
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_fetch_missing_hits_is_backend_failure() {
        let backend = FakeBackend::new().respond(Operation::Search, r#"{"took":3}"#);
        let fields = IndexFields::default();
        let err = QueryOrchestrator::new(&backend, &fields)
            .fetch(&request(SearchOptions::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            ElasticoError::BackendQueryFailure { response: Some(raw), .. } if raw == r#"{"took":3}"#
        ));
    }

    #[test]
    fn test_fetch_hit_without_text_field_is_backend_failure() {
        let backend = FakeBackend::new()
            .respond(Operation::Search, r#"{"hits":{"hits":[{"_source":{"other":"x"}}]}}"#);
        let fields = IndexFields::default();
        let err = QueryOrchestrator::new(&backend, &fields)
            .fetch(&request(SearchOptions::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            ElasticoError::BackendQueryFailure { reason, .. } if reason.contains("'src'")
        ));
    }

    #[test]
    fn test_fetch_unparsable_body_is_backend_failure() {
        let backend = FakeBackend::new().respond(Operation::Search, "<html>502 Bad Gateway</html>");
        let fields = IndexFields::default();
        let err = QueryOrchestrator::new(&backend, &fields)
            .fetch(&request(SearchOptions::default()))
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_BACKEND_ERROR);
    }

    // --- Count-then-fetch ---

    fn fixed_now() -> DateTime<FixedOffset> {
        use chrono::TimeZone;
        crate::core::window::index_offset()
            .with_ymd_and_hms(2018, 12, 10, 8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_search_in_window_fetches_counted_lines() {
        let backend = FakeBackend::new()
            .respond(Operation::Count, r#"{"count":2}"#)
            .respond(Operation::Search, &search_response());
        let fields = IndexFields::default();
        let policy =
            SearchWindowPolicy::from_options(None, Some("2018-dec-06__2018-dec-08"), fixed_now())
                .unwrap();

        let result = QueryOrchestrator::new(&backend, &fields)
            .search("psana101", &policy, SearchOptions::default(), fixed_now())
            .unwrap();

        assert_eq!(result.len(), 2);
        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, Operation::Count);
        assert_eq!(requests[1].0, Operation::Search);
        assert_eq!(requests[1].1["size"], 2);
        assert_eq!(
            requests[0].1["query"], requests[1].1["query"],
            "count and fetch must share query and filter"
        );
    }

    #[test]
    fn test_search_over_ceiling_issues_no_fetch() {
        let backend = FakeBackend::new().respond(Operation::Count, r#"{"count":10000}"#);
        let fields = IndexFields::default();
        let policy = SearchWindowPolicy::from_options(None, Some("2d"), fixed_now()).unwrap();

        let err = QueryOrchestrator::new(&backend, &fields)
            .search("*", &policy, SearchOptions::default(), fixed_now())
            .unwrap_err();

        assert!(matches!(err, ElasticoError::ResultSetTooLarge { count: 10_000, .. }));
        assert_eq!(backend.requests().len(), 1);
    }

    #[test]
    fn test_search_with_limit_uses_unfiltered_range() {
        let backend = FakeBackend::new().respond(Operation::Search, &search_response());
        let fields = IndexFields::default();

        QueryOrchestrator::new(&backend, &fields)
            .search(
                "psana101",
                &SearchWindowPolicy::Limit(20),
                SearchOptions::default(),
                fixed_now(),
            )
            .unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        let range = &requests[0].1["query"]["bool"]["filter"]["range"]["date"];
        assert_eq!(range["gt"], 0);
        assert_eq!(range["lt"], fixed_now().timestamp_millis());
        assert_eq!(requests[0].1["size"], 20);
    }

    #[test]
    fn test_fetch_propagates_transport_failure() {
        let backend = FakeBackend::new().fail(Operation::Search, "connection timed out");
        let fields = IndexFields::default();
        let err = QueryOrchestrator::new(&backend, &fields)
            .fetch(&request(SearchOptions::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            ElasticoError::BackendQueryFailure { reason, .. } if reason == "connection timed out"
        ));
    }
}

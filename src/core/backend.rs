//! Transport to the Elasticsearch-style search backend.
//!
//! [`SearchBackend`] is the seam between query construction and the
//! network: it takes a JSON request body and returns the raw response
//! body. [`HttpBackend`] implements it with a blocking `reqwest` client;
//! tests substitute an in-memory fake.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use serde_json::Value;
use zeroize::Zeroizing;

use crate::error::ElasticoError;

/// Largest response body accepted, in bytes.
///
/// Ten thousand log lines with highlighting comfortably fit.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The backend operation a request body is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Count matching documents (`_count`).
    Count,
    /// Fetch matching documents (`_search`).
    Search,
}

impl Operation {
    /// The endpoint path segment for this operation.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Count => "_count",
            Self::Search => "_search",
        }
    }
}

/// Executes requests against a search backend.
pub trait SearchBackend {
    /// Send `body` to the endpoint for `operation` and return the raw
    /// response body.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticoError::BackendQueryFailure`] on transport errors
    /// or a non-success status.
    fn execute(&self, operation: Operation, body: &Value) -> Result<String, ElasticoError>;

    /// A display-safe description of where requests go, for diagnostics.
    fn describe(&self, operation: Operation) -> String;
}

/// HTTP basic-auth credentials.
///
/// The password is zeroized on drop and redacted from `Debug` output.
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: Zeroizing<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Connection settings for [`HttpBackend`].
#[derive(Debug)]
pub struct BackendConfig {
    /// Base URL of the cluster, e.g. `http://psmetric04:9200`.
    pub base_url: String,
    /// Index (or index pattern) to search.
    pub index: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Optional basic-auth credentials.
    pub credentials: Option<Credentials>,
}

/// A [`SearchBackend`] speaking JSON over HTTP.
#[derive(Debug)]
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    index_url: reqwest::Url,
    timeout: Duration,
    credentials: Option<Credentials>,
}

impl HttpBackend {
    /// Build a backend from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticoError::InvalidBackendUrl`] if the base URL is not
    /// an `http` or `https` URL, and [`ElasticoError::BackendQueryFailure`]
    /// if the HTTP client cannot be created.
    pub fn new(config: BackendConfig) -> Result<Self, ElasticoError> {
        let index_url = build_index_url(&config.base_url, &config.index)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ElasticoError::BackendQueryFailure {
                url: redacted_url(&index_url),
                reason: transport_reason(&e, config.timeout),
                response: None,
            })?;

        Ok(Self {
            client,
            index_url,
            timeout: config.timeout,
            credentials: config.credentials,
        })
    }

    fn endpoint_url(&self, operation: Operation) -> reqwest::Url {
        let mut url = self.index_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(operation.endpoint());
        }
        url
    }
}

impl SearchBackend for HttpBackend {
    fn execute(&self, operation: Operation, body: &Value) -> Result<String, ElasticoError> {
        let url = self.endpoint_url(operation);
        let display_url = redacted_url(&url);
        let failure = |reason: String, response: Option<String>| {
            ElasticoError::BackendQueryFailure {
                url: display_url.clone(),
                reason,
                response,
            }
        };

        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(
                &credentials.username,
                Some(credentials.password.as_str()),
            );
        }

        tracing::debug!(url = %display_url, "sending backend request");
        let response = request
            .send()
            .map_err(|e| failure(transport_reason(&e, self.timeout), None))?;

        let status = response.status();
        let text = read_capped_body(response).map_err(|reason| failure(reason, None))?;

        if !status.is_success() {
            return Err(failure(
                format!("server returned HTTP {}", status.as_u16()),
                Some(text),
            ));
        }

        Ok(text)
    }

    fn describe(&self, operation: Operation) -> String {
        redacted_url(&self.endpoint_url(operation))
    }
}

/// Parse the base URL and append the index as a path segment.
fn build_index_url(base_url: &str, index: &str) -> Result<reqwest::Url, ElasticoError> {
    let mut url = match reqwest::Url::parse(base_url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
        Ok(parsed) => {
            return Err(ElasticoError::InvalidBackendUrl {
                url: redacted_url(&parsed),
                reason: format!(
                    "only http and https URLs are supported (got scheme '{}')",
                    parsed.scheme()
                ),
            });
        }
        Err(_) => {
            return Err(ElasticoError::InvalidBackendUrl {
                url: base_url.to_string(),
                reason: "not a valid URL".to_string(),
            });
        }
    };

    if index.is_empty() || index.contains('/') {
        return Err(ElasticoError::InvalidBackendUrl {
            url: redacted_url(&url),
            reason: format!("invalid index name '{index}'"),
        });
    }

    if url.cannot_be_a_base() {
        return Err(ElasticoError::InvalidBackendUrl {
            url: redacted_url(&url),
            reason: "URL cannot have a path".to_string(),
        });
    }

    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(index);
    }
    Ok(url)
}

/// Read the whole body as text, refusing anything over [`MAX_BODY_BYTES`].
fn read_capped_body(response: reqwest::blocking::Response) -> Result<String, String> {
    let mut body = Vec::new();
    response
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut body)
        .map_err(|e| format!("connection dropped while reading the response ({})", e.kind()))?;

    if body.len() as u64 > MAX_BODY_BYTES {
        return Err(format!(
            "response body is larger than {} MiB",
            MAX_BODY_BYTES / (1024 * 1024)
        ));
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// A short reason for a transport failure.
///
/// `reqwest` errors embed the full request URL, credentials included, so
/// only the error kind is reported.
fn transport_reason(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("no response within {}s", timeout.as_secs())
    } else if err.is_connect() {
        "could not connect to the backend".to_string()
    } else if err.is_redirect() {
        "redirect loop".to_string()
    } else if err.is_builder() {
        "could not set up the HTTP client".to_string()
    } else {
        "request was not completed".to_string()
    }
}

/// The URL with user info, query and fragment removed.
fn redacted_url(url: &reqwest::Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.set_fragment(None);
    // Only fails for URLs that cannot carry user info at all.
    shown.set_username("").ok();
    shown.set_password(None).ok();
    shown.to_string()
}

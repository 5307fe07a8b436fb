//! Deciding how many lines to fetch.
//!
//! A search is bounded either by an explicit line limit or by a time
//! window. For a window the number of matching lines is unknown, so the
//! backend is first asked for a count; the fetch then asks for exactly
//! that many lines, or the search is refused when the count reaches the
//! hard ceiling.

use chrono::{DateTime, FixedOffset};

use crate::core::backend::SearchBackend;
use crate::core::orchestrator::{MatchCount, QueryOrchestrator};
use crate::core::time_expression::resolve_time_expression;
use crate::core::window::{TimeRange, TimeWindow};
use crate::error::ElasticoError;

/// Hard ceiling on the number of lines a single search may return.
pub const MAX_RESULT_LINES: u32 = 10_000;

/// Number of lines fetched when neither a limit nor a window is given.
pub const DEFAULT_LIMIT: u32 = 20;

/// How the size of a search is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchWindowPolicy {
    /// Fetch at most this many lines, without a time filter.
    Limit(u32),
    /// Fetch every line within the window.
    Window(TimeWindow),
}

/// The outcome of applying a policy: what to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    /// Number of lines to request.
    pub size: u32,
    /// Time filter for the fetch.
    pub range: TimeRange,
    /// The count reported by the backend, in window mode.
    pub count: Option<MatchCount>,
}

impl SearchWindowPolicy {
    /// Build a policy from the command-line options.
    ///
    /// The conflict check runs before the time expression is parsed.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticoError::ConflictingParameters`] if both options are
    /// given, [`ElasticoError::InvalidLimit`] for an out-of-range limit, or
    /// any error from resolving the time expression.
    pub fn from_options(
        limit: Option<u64>,
        time_expression: Option<&str>,
        now: DateTime<FixedOffset>,
    ) -> Result<Self, ElasticoError> {
        match (limit, time_expression) {
            (Some(_), Some(_)) => Err(ElasticoError::ConflictingParameters),
            (Some(limit), None) => Self::limit(limit),
            (None, Some(expression)) => Ok(Self::Window(resolve_time_expression(expression, now)?)),
            (None, None) => Ok(Self::Limit(DEFAULT_LIMIT)),
        }
    }

    /// An explicit-limit policy.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticoError::InvalidLimit`] unless `1 <= limit <= 10000`.
    pub fn limit(limit: u64) -> Result<Self, ElasticoError> {
        match u32::try_from(limit) {
            Ok(value) if (1..=MAX_RESULT_LINES).contains(&value) => Ok(Self::Limit(value)),
            _ => Err(ElasticoError::InvalidLimit {
                value: limit,
                max: MAX_RESULT_LINES,
            }),
        }
    }

    /// Decide the fetch size, counting first when bounded by a window.
    ///
    /// In limit mode no request is made and the range is the permissive
    /// `(0, now)` filter.
    ///
    /// # Errors
    ///
    /// Returns [`ElasticoError::ResultSetTooLarge`] when the window holds
    /// [`MAX_RESULT_LINES`] or more matches, or a backend error from the
    /// count request.
    pub fn plan<B: SearchBackend>(
        &self,
        orchestrator: &QueryOrchestrator<'_, B>,
        query: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<FetchPlan, ElasticoError> {
        match self {
            Self::Limit(size) => Ok(FetchPlan {
                size: *size,
                range: TimeRange::unfiltered(now),
                count: None,
            }),
            Self::Window(window) => {
                let range = TimeRange::from(window);
                tracing::debug!(
                    gt = range.gt_millis,
                    lt = range.lt_millis,
                    "time filter in epoch milliseconds"
                );
                let count = orchestrator.count(query, range)?;
                let size = admit(count)?;
                tracing::debug!(count = count.0, "documents in time window");
                Ok(FetchPlan {
                    size,
                    range,
                    count: Some(count),
                })
            }
        }
    }
}

/// Turn a count into a fetch size, refusing counts at or over the ceiling.
fn admit(count: MatchCount) -> Result<u32, ElasticoError> {
    match u32::try_from(count.0) {
        Ok(size) if size < MAX_RESULT_LINES => Ok(size),
        _ => Err(ElasticoError::ResultSetTooLarge {
            count: count.0,
            max: MAX_RESULT_LINES,
        }),
    }
}

//! Time windows and the millisecond ranges sent to the backend.
//!
//! All instants are normalized to a single fixed UTC offset before they
//! are compared, so two windows built from the same wall-clock values
//! are always equal regardless of the machine's local time zone.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};

/// Seconds west of UTC for the fixed offset used by the log index (`-08:00`).
const INDEX_OFFSET_WEST_SECS: i32 = 8 * 3600;

/// The fixed UTC offset all time points are normalized to.
pub fn index_offset() -> FixedOffset {
    FixedOffset::west_opt(INDEX_OFFSET_WEST_SECS).expect("-08:00 is a valid UTC offset")
}

/// Convert a time point to the index offset.
///
/// The instant is preserved; only the offset used to express it changes.
/// Normalizing an already-normalized value is a no-op.
pub fn normalize(point: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    point.with_timezone(&index_offset())
}

/// The current instant, expressed at the index offset.
pub fn now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&index_offset())
}

/// A non-empty, ordered interval between two instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl TimeWindow {
    /// Build a window from two endpoints given in any order.
    ///
    /// Both endpoints are normalized; the earlier one becomes the start.
    /// Returns `None` when both endpoints are the same instant.
    pub fn ordered(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> Option<Self> {
        let (a, b) = (normalize(a), normalize(b));
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { start: a, end: b }),
            std::cmp::Ordering::Greater => Some(Self { start: b, end: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The earlier endpoint.
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    /// The later endpoint.
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Millisecond epoch bounds for the backend's range filter.
///
/// Both bounds are exclusive: documents stamped exactly on a bound are
/// not matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Exclusive lower bound, in milliseconds since the epoch.
    pub gt_millis: i64,
    /// Exclusive upper bound, in milliseconds since the epoch.
    pub lt_millis: i64,
}

impl TimeRange {
    /// The permissive range used when no window was requested: `(0, now)`.
    pub fn unfiltered(now: DateTime<FixedOffset>) -> Self {
        Self {
            gt_millis: 0,
            lt_millis: now.timestamp_millis(),
        }
    }
}

impl From<&TimeWindow> for TimeRange {
    fn from(window: &TimeWindow) -> Self {
        Self {
            gt_millis: window.start.timestamp_millis(),
            lt_millis: window.end.timestamp_millis(),
        }
    }
}

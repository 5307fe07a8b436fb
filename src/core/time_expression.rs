//! Resolution of human-friendly time expressions into time windows.
//!
//! Supports two grammars:
//! - Relative: `2d`, `5h`, `10m` (from that long ago until now)
//! - Compound: `<lhs>__<rhs>`, where `lhs` is a point in time and `rhs`
//!   is either another point or a signed delta such as `+2d` or `-30m`
//!
//! Points are written with three-letter month names, e.g.
//! `2018-dec-06-10:30`, `dec-06-10:30`, `2018-dec-06`, `dec-06` (or
//! `06-dec`) and `10:30`. Missing parts default to the current year and
//! date. A missing time of day defaults to the start of the day for the
//! window start and to its last second for the window end.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, FixedOffset, Month, NaiveDate, TimeDelta, TimeZone};
use regex::{Captures, Regex};

use crate::core::duration::parse_duration;
use crate::core::window::{TimeWindow, index_offset, normalize};
use crate::error::ElasticoError;

/// Month name and day in either order: `dec-06` or `06-dec`.
///
/// Any three word characters are taken as a month so that a misspelt
/// name is reported as a bad date rather than an unknown format.
const DATE: &str = r"(?P<date>\w{3}-\d{1,2}|\d{1,2}-\w{3})";
const YEAR: &str = r"(?P<year>\d{4})";
const TIME: &str = r"(?P<hour>\d{1,2}):(?P<minute>\d{1,2})";

fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^{pattern}$")).expect("time pattern is a valid regex")
}

static RELATIVE_WINDOW: LazyLock<Regex> = LazyLock::new(|| anchored(r"\d+[mhd]"));
static SIGNED_DELTA: LazyLock<Regex> =
    LazyLock::new(|| anchored(r"(?P<sign>[+-])(?P<amount>\d+[mhd])"));

static YEAR_DATE_TIME: LazyLock<Regex> = LazyLock::new(|| anchored(&format!("{YEAR}-{DATE}-{TIME}")));
static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| anchored(&format!("{DATE}-{TIME}")));
static YEAR_DATE: LazyLock<Regex> = LazyLock::new(|| anchored(&format!("{YEAR}-{DATE}")));
static DATE_ONLY: LazyLock<Regex> = LazyLock::new(|| anchored(DATE));
static TIME_ONLY: LazyLock<Regex> = LazyLock::new(|| anchored(TIME));

/// Which end of the window a point describes.
///
/// Decides the time of day used when a point names only a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBoundary {
    /// Midnight, `00:00:00`.
    Start,
    /// The last second of the day, `23:59:59`.
    End,
}

impl DayBoundary {
    fn hms(self) -> (u32, u32, u32) {
        match self {
            Self::Start => (0, 0, 0),
            Self::End => (23, 59, 59),
        }
    }

    fn opposite(self) -> Self {
        match self {
            Self::Start => Self::End,
            Self::End => Self::Start,
        }
    }
}

/// The accepted shapes of an absolute point, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointPattern {
    YearDateTime,
    DateTime,
    YearDate,
    Date,
    Time,
}

impl PointPattern {
    const PRIORITY: [Self; 5] = [
        Self::YearDateTime,
        Self::DateTime,
        Self::YearDate,
        Self::Date,
        Self::Time,
    ];

    fn regex(self) -> &'static Regex {
        match self {
            Self::YearDateTime => &YEAR_DATE_TIME,
            Self::DateTime => &DATE_TIME,
            Self::YearDate => &YEAR_DATE,
            Self::Date => &DATE_ONLY,
            Self::Time => &TIME_ONLY,
        }
    }
}

/// The fields of a point as written, before defaults are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PointFields<'a> {
    year: Option<&'a str>,
    date: Option<&'a str>,
    hour: Option<&'a str>,
    minute: Option<&'a str>,
}

impl<'a> PointFields<'a> {
    fn from_captures(caps: &Captures<'a>) -> Self {
        let field = |name: &str| caps.name(name).map(|m| m.as_str());
        Self {
            year: field("year"),
            date: field("date"),
            hour: field("hour"),
            minute: field("minute"),
        }
    }

    /// Match `input` against each pattern in priority order.
    fn match_first(input: &'a str) -> Option<Self> {
        PointPattern::PRIORITY
            .iter()
            .find_map(|pattern| pattern.regex().captures(input))
            .map(|caps| Self::from_captures(&caps))
    }

    fn has_time(&self) -> bool {
        self.hour.is_some()
    }

    /// Fill in defaults and build a concrete instant at the index offset.
    fn resolve(
        &self,
        now: DateTime<FixedOffset>,
        boundary: DayBoundary,
    ) -> Result<DateTime<FixedOffset>, String> {
        let today = now.date_naive();

        let year = match self.year {
            Some(year) => year
                .parse::<i32>()
                .map_err(|_| format!("invalid year '{year}'"))?,
            None => today.year(),
        };

        let (month, day) = match self.date {
            Some(date) => parse_month_day(date)?,
            None => (today.month(), today.day()),
        };

        let (hour, minute, second) = match (self.hour, self.minute) {
            (Some(hour), Some(minute)) => (parse_number(hour)?, parse_number(minute)?, 0),
            _ => boundary.hms(),
        };

        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| format!("{year}-{month:02}-{day:02} is not a valid date"))?
            .and_hms_opt(hour, minute, second)
            .ok_or_else(|| format!("{hour:02}:{minute:02} is not a valid time of day"))?;

        index_offset()
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| format!("{naive} cannot be represented"))
    }
}

/// Split `dec-06` or `06-dec` into a month number and a day.
fn parse_month_day(date: &str) -> Result<(u32, u32), String> {
    let (first, second) = date
        .split_once('-')
        .ok_or_else(|| format!("invalid date '{date}'"))?;

    let (month_name, day) = if second.bytes().all(|b| b.is_ascii_digit()) {
        (first, second)
    } else {
        (second, first)
    };

    let month = month_name
        .parse::<Month>()
        .map_err(|_| format!("unknown month name '{month_name}'"))?;

    Ok((month.number_from_month(), parse_number(day)?))
}

fn parse_number(digits: &str) -> Result<u32, String> {
    digits
        .parse::<u32>()
        .map_err(|_| format!("invalid number '{digits}'"))
}

/// Why a single side of a compound expression failed.
enum PointError {
    /// The text matches none of the accepted shapes.
    Unrecognized,
    /// The shape is fine but the values are not a real date or time.
    Invalid(String),
}

fn resolve_point(
    input: &str,
    now: DateTime<FixedOffset>,
    boundary: DayBoundary,
) -> Result<(PointFields<'_>, DateTime<FixedOffset>), PointError> {
    let fields = PointFields::match_first(input).ok_or(PointError::Unrecognized)?;
    let point = fields.resolve(now, boundary).map_err(PointError::Invalid)?;
    Ok((fields, point))
}

/// Resolve a time expression into an ordered, non-empty window.
///
/// `now` is the reference instant used for relative windows and for
/// defaulting the year and date of partial points.
///
/// # Errors
///
/// - [`ElasticoError::MalformedTimeExpression`] if the expression (or one
///   side of a compound expression) has an unknown shape.
/// - [`ElasticoError::DateParseFailure`] for unknown month names or
///   impossible dates and times.
/// - [`ElasticoError::EmptyTimeWindow`] if both ends are the same instant.
pub fn resolve_time_expression(
    expression: &str,
    now: DateTime<FixedOffset>,
) -> Result<TimeWindow, ElasticoError> {
    let now = normalize(now);
    let (a, b) = resolve_endpoints(expression, now)?;

    let window = TimeWindow::ordered(a, b).ok_or_else(|| ElasticoError::EmptyTimeWindow {
        expression: expression.to_string(),
    })?;

    tracing::debug!(
        expression,
        start = %window.start().to_rfc3339(),
        end = %window.end().to_rfc3339(),
        "resolved time window"
    );

    Ok(window)
}

fn resolve_endpoints(
    expression: &str,
    now: DateTime<FixedOffset>,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), ElasticoError> {
    let malformed = |reason: String| ElasticoError::MalformedTimeExpression {
        expression: expression.to_string(),
        reason,
    };
    let invalid = |reason: String| ElasticoError::DateParseFailure {
        expression: expression.to_string(),
        reason,
    };
    let point_error = |side: &str, input: &str, err: PointError| match err {
        PointError::Unrecognized => malformed(format!("'{input}' is not a recognized {side}")),
        PointError::Invalid(reason) => invalid(reason),
    };

    if RELATIVE_WINDOW.is_match(expression) {
        let seconds = parse_duration(expression)?;
        let start = shift(now, -seconds).ok_or_else(|| invalid(out_of_range(expression)))?;
        return Ok((start, now));
    }

    let Some((lhs, rhs)) = expression.rsplit_once("__") else {
        return Err(malformed(
            "expected '<N><m|h|d>' or '<start>__<end>'".to_string(),
        ));
    };
    let (lhs, rhs) = (lhs.trim(), rhs.trim());

    let (lhs_fields, lhs_point) = resolve_point(lhs, now, DayBoundary::Start)
        .map_err(|e| point_error("start time", lhs, e))?;

    if let Some(caps) = SIGNED_DELTA.captures(rhs) {
        let seconds = parse_duration(&caps["amount"])?;
        let signed = if &caps["sign"] == "-" { -seconds } else { seconds };
        let rhs_point = shift(lhs_point, signed).ok_or_else(|| invalid(out_of_range(rhs)))?;
        return Ok((lhs_point, rhs_point));
    }

    let (rhs_fields, rhs_point) = resolve_point(rhs, now, DayBoundary::End)
        .map_err(|e| point_error("end time or delta", rhs, e))?;

    if rhs_point >= lhs_point {
        return Ok((lhs_point, rhs_point));
    }

    // The right-hand side is the earlier instant: it now describes the
    // window start, so date-only points take the opposite day boundary.
    let swap = |fields: PointFields<'_>, point, boundary: DayBoundary| {
        if fields.has_time() {
            Ok(point)
        } else {
            fields.resolve(now, boundary.opposite()).map_err(invalid)
        }
    };
    let new_end = swap(lhs_fields, lhs_point, DayBoundary::Start)?;
    let new_start = swap(rhs_fields, rhs_point, DayBoundary::End)?;
    Ok((new_start, new_end))
}

fn shift(point: DateTime<FixedOffset>, seconds: i64) -> Option<DateTime<FixedOffset>> {
    point.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

fn out_of_range(input: &str) -> String {
    format!("'{input}' moves the time outside the supported range")
}

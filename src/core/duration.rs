//! Relative duration tokens such as `10m`, `5h` or `2d`.

use crate::error::ElasticoError;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// Parse a `<digits><unit>` token into a number of seconds.
///
/// The unit is one of `m` (minutes), `h` (hours) or `d` (days). The token
/// carries no sign; callers decide whether the duration is added or
/// subtracted.
///
/// # Errors
///
/// Returns [`ElasticoError::MalformedDuration`] if the token does not match
/// the pattern, the unit is unknown, or the value overflows.
pub fn parse_duration(token: &str) -> Result<i64, ElasticoError> {
    let malformed = || ElasticoError::MalformedDuration {
        token: token.to_string(),
    };

    let unit = token.chars().last().ok_or_else(malformed)?;
    let digits = &token[..token.len() - unit.len_utf8()];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let multiplier = match unit {
        'm' => SECONDS_PER_MINUTE,
        'h' => SECONDS_PER_HOUR,
        'd' => SECONDS_PER_DAY,
        _ => return Err(malformed()),
    };

    digits
        .parse::<i64>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .ok_or_else(malformed)
}

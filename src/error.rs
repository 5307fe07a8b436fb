//! Domain error types for elastico.
//!
//! All business-logic errors are defined here using `thiserror`.
//! These errors are converted to user-friendly messages and exit
//! statuses at the CLI boundary.

use thiserror::Error;

/// Exit status for errors caused by the user's input.
pub const EXIT_INPUT_ERROR: u8 = 1;

/// Exit status for dates that have a valid shape but cannot be parsed
/// (unknown month names, impossible calendar dates).
pub const EXIT_DATE_PARSE_ERROR: u8 = 3;

/// Exit status for failures talking to the search backend.
pub const EXIT_BACKEND_ERROR: u8 = 4;

/// Errors that can occur while resolving a time window or querying
/// the search backend.
#[derive(Debug, Error)]
pub enum ElasticoError {
    /// A relative duration token is not of the form `<N><unit>`.
    #[error("malformed duration '{token}': expected <number><m|h|d>, e.g. '10m', '5h', '2d'")]
    MalformedDuration {
        /// The offending token.
        token: String,
    },

    /// The time expression does not match any recognized shape.
    #[error("time format not recognized in '{expression}': {reason}")]
    MalformedTimeExpression {
        /// The full time expression given on the command line.
        expression: String,
        /// Which part of the expression failed to match.
        reason: String,
    },

    /// The time expression has a valid shape but names an impossible date.
    #[error("failed to parse date in '{expression}': {reason} (check e.g. month names)")]
    DateParseFailure {
        /// The full time expression given on the command line.
        expression: String,
        /// Description of the parsing failure.
        reason: String,
    },

    /// Both ends of the time window resolve to the same instant.
    #[error("the time interval '{expression}' is empty, the search would return nothing")]
    EmptyTimeWindow {
        /// The full time expression given on the command line.
        expression: String,
    },

    /// A line limit and a time window were both requested.
    #[error(
        "parameters '--limit' and '--time' are conflicting and can't be put on the same query"
    )]
    ConflictingParameters,

    /// The explicit line limit is outside the accepted range.
    #[error("invalid limit {value}: the number of lines must be between 1 and {max}")]
    InvalidLimit {
        /// The rejected value.
        value: u64,
        /// The maximum accepted value.
        max: u32,
    },

    /// The time window contains more documents than may be fetched.
    #[error(
        "the number of log lines to get would be {count}; please refine your search criteria, \
         the maximum number of lines allowed in output is {max}"
    )]
    ResultSetTooLarge {
        /// Number of matching documents reported by the backend.
        count: u64,
        /// The hard ceiling.
        max: u32,
    },

    /// The backend request failed or returned an unusable response.
    #[error("search request to '{url}' failed: {reason}")]
    BackendQueryFailure {
        /// The sanitized endpoint URL.
        url: String,
        /// Description of the failure.
        reason: String,
        /// The raw response body, when one was received.
        response: Option<String>,
    },

    /// The configured backend URL is unusable.
    #[error("invalid backend URL '{url}': {reason}")]
    InvalidBackendUrl {
        /// The URL as configured (sanitized when parseable).
        url: String,
        /// Description of the problem.
        reason: String,
    },

    /// The environment variable name is not usable.
    #[error("invalid environment variable name '{name}'")]
    InvalidEnvVarName {
        /// The rejected name.
        name: String,
    },

    /// The specified environment variable is not set.
    #[error("environment variable '{name}' is not set")]
    EnvVarNotFound {
        /// Name of the missing environment variable.
        name: String,
    },
}

impl ElasticoError {
    /// The process exit status the CLI should use for this error.
    ///
    /// Input errors and backend errors map to different statuses so
    /// scripts can tell a typo apart from an unreachable server.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::DateParseFailure { .. } => EXIT_DATE_PARSE_ERROR,
            Self::BackendQueryFailure { .. } | Self::InvalidBackendUrl { .. } => EXIT_BACKEND_ERROR,
            Self::MalformedDuration { .. }
            | Self::MalformedTimeExpression { .. }
            | Self::EmptyTimeWindow { .. }
            | Self::ConflictingParameters
            | Self::InvalidLimit { .. }
            | Self::ResultSetTooLarge { .. }
            | Self::InvalidEnvVarName { .. }
            | Self::EnvVarNotFound { .. } => EXIT_INPUT_ERROR,
        }
    }
}

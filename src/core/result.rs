//! Result lines returned by a search.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Matches a highlighted span as delimited by the backend.
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<em>(.*?)</em>").expect("emphasis pattern is a valid regex"));

/// A single log line from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLine {
    /// The stored line, verbatim.
    Plain(String),
    /// The stored line with matched spans wrapped in `<em>…</em>`.
    Highlighted(String),
}

impl ResultLine {
    /// The line with emphasis markers removed.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Plain(line) => Cow::Borrowed(line),
            Self::Highlighted(line) => EMPHASIS.replace_all(line, "$1"),
        }
    }

    /// Rewrite each highlighted span with `emphasize`.
    ///
    /// Plain lines are returned unchanged.
    pub fn render_with<F>(&self, emphasize: F) -> Cow<'_, str>
    where
        F: Fn(&str) -> String,
    {
        match self {
            Self::Plain(line) => Cow::Borrowed(line),
            Self::Highlighted(line) => {
                EMPHASIS.replace_all(line, |caps: &Captures<'_>| emphasize(&caps[1]))
            }
        }
    }
}

/// The ordered lines of one search, in the order the backend returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    lines: Vec<ResultLine>,
}

impl SearchResult {
    /// Wrap an ordered list of lines.
    pub fn new(lines: Vec<ResultLine>) -> Self {
        Self { lines }
    }

    /// The lines in backend order (newest or most relevant first).
    pub fn lines(&self) -> &[ResultLine] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the search returned nothing.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

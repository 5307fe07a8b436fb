//! Printing search results.
//!
//! The backend returns the newest (or most relevant) line first; lines
//! are printed in reverse so the newest ends up at the bottom of the
//! terminal, next to the prompt.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use crate::core::result::SearchResult;

/// How result lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per result; highlighted spans in bold.
    Text,
    /// A JSON array of strings, without emphasis markers.
    Json,
}

/// Write `result` to `out`, oldest line first.
///
/// # Errors
///
/// Returns any I/O error from the writer.
pub fn write_lines<W: Write>(
    out: &mut W,
    result: &SearchResult,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for line in result.lines().iter().rev() {
                let rendered = line.render_with(|span| span.bold().to_string());
                writeln!(out, "{rendered}")?;
            }
        }
        OutputFormat::Json => {
            let texts: Vec<_> = result.lines().iter().rev().map(|line| line.text()).collect();
            serde_json::to_writer_pretty(&mut *out, &texts)?;
            writeln!(out)?;
        }
    }
    out.flush()
}

/// Print `result` to stdout.
///
/// A closed pipe (e.g. `elastico ... | head`) is not an error.
///
/// # Errors
///
/// Returns any other I/O error.
pub fn print_lines(result: &SearchResult, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    match write_lines(&mut out, result, format) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

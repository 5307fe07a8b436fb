//! CLI argument definitions for elastico.
//!
//! Uses `clap` derive macros to define the command-line interface.
//! Boolean switches come in pairs where the uppercase letter undoes the
//! lowercase one (`-s`/`-S`, `-h`/`-H`); the last one given wins.
//!
//! Because `-h` means "highlight", the short help flag is disabled. Use
//! `--help`, or pass `-h` as the only argument, to read the manual.

use std::ffi::OsString;

use clap::{ArgAction, Parser};

use crate::core::backend::DEFAULT_TIMEOUT_SECS;
use crate::core::orchestrator::{IndexFields, SearchOptions, SortMode};

/// Long help: index layout and usage examples.
const MANUAL: &str = "\
QUERY SYNTAX:
  The query uses the Lucene query syntax, almost identical to the one
  accepted by Kibana. Booleans must be uppercase (AND, OR, NOT) and
  parentheses group them. Quote the query so the shell does not expand
  '*', '?' or '~'.

  By default the query runs against the 'src' field of each document,
  which holds the log line as it was recorded, e.g.
    \"Dec  5 14:57:27 psana1507 monit[6494]: Cannot create socket to [psmonit]:8020\"
  Other fields can be named explicitly: date, machine, service, message, file.

TIME WINDOWS (-t):
  2d, 5h, 10m                     the last 2 days, 5 hours, 10 minutes
  2018-dec-06-10:30__+2d          two days starting at 10:30 on Dec 6, 2018
  2018-dec-06-10:30__-1h          the hour before
  2018-dec-06-10:30__2018-dec-08  until the end of Dec 8
  dec-06__15-dec                  Dec 6 to Dec 15 (whole days) of this year
  09:00__+30m                     half an hour from 09:00 today

  Times are read at UTC-08:00. A window fetches every matching line, up to
  10000; '-l' and '-t' cannot be combined.

EXAMPLES:
  elastico psana101                                   search a machine name
  elastico 'omar~'                                    approximate user name
  elastico 'psana*'                                   psana101, psana103, ...
  elastico 'nmingott AND machine:(*metric* OR *ana*)' booleans and grouping
  elastico -l 200 'machine:psmetric01'                last 200 lines of a machine
  elastico -S 'ana*'                                  most relevant lines first
  elastico -h -l 20 wilko                             highlight matches
  elastico -t 2018-dec-06__+1d 'service:cron'         one day of cron lines
  elastico -h | less -R                               read this manual

EXIT STATUS:
  0 success, 1 invalid input or too many results, 2 invalid arguments,
  3 unparsable date, 4 backend failure.";

/// Search and display log lines from Elasticsearch.
#[derive(Debug, Parser)]
#[command(name = "elastico")]
#[command(version, about, long_about = None)]
#[command(disable_help_flag = true, after_long_help = MANUAL)]
pub struct Cli {
    /// Print help (the full manual with '--help').
    #[arg(long, action = ArgAction::HelpLong)]
    pub help: Option<bool>,

    /// Maximum number of lines to retrieve (1 to 10000, default 20).
    #[arg(short = 'l', long, value_name = "NUM")]
    pub limit: Option<u64>,

    /// Only retrieve lines within this time window, e.g. "2d" or
    /// "dec-06__15-dec". Retrieves every matching line.
    #[arg(short = 't', long = "time", value_name = "EXPR")]
    pub time: Option<String>,

    /// Sort lines by time (default).
    #[arg(short = 's', long = "sort", overrides_with = "relevance")]
    pub sort: bool,

    /// Sort lines by relevance instead of time.
    #[arg(short = 'S', long, overrides_with = "sort")]
    pub relevance: bool,

    /// Highlight the matched words of the default field.
    #[arg(short = 'h', long, overrides_with = "no_highlight")]
    pub highlight: bool,

    /// Do not highlight matched words (default).
    #[arg(short = 'H', long, overrides_with = "highlight")]
    pub no_highlight: bool,

    /// Print the queries and intermediate values to stderr.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Output the lines as a JSON array (machine-readable).
    #[arg(long)]
    pub json: bool,

    /// Base URL of the Elasticsearch cluster.
    #[arg(
        long,
        env = "ELASTICO_URL",
        value_name = "URL",
        default_value = "http://psmetric04:9200"
    )]
    pub url: String,

    /// Index (or index pattern) to search.
    #[arg(long, env = "ELASTICO_INDEX", value_name = "NAME", default_value = "lclslogs")]
    pub index: String,

    /// Field holding the log line; the default field of the query.
    #[arg(long, value_name = "FIELD", default_value = "src")]
    pub field: String,

    /// Field holding the timestamp of each line.
    #[arg(long, value_name = "FIELD", default_value = "date")]
    pub date_field: String,

    /// User name for HTTP basic authentication.
    #[arg(long, env = "ELASTICO_USER", value_name = "USER")]
    pub user: Option<String>,

    /// Read the basic-auth password from the specified environment variable.
    #[arg(long, value_name = "VAR_NAME", requires = "user")]
    pub password_env: Option<String>,

    /// HTTP request timeout in seconds.
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// The Lucene query string.
    #[arg(value_name = "QUERY")]
    pub query: String,
}

impl Cli {
    /// Sort and highlight preferences.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            sort: if self.relevance {
                SortMode::Relevance
            } else {
                SortMode::TimeDescending
            },
            highlight: self.highlight,
        }
    }

    /// Names of the queried document fields.
    pub fn index_fields(&self) -> IndexFields {
        IndexFields {
            text: self.field.clone(),
            date: self.date_field.clone(),
        }
    }
}

/// Whether the arguments ask for the manual: `-h` and nothing else.
pub fn is_manual_request<I>(args: I) -> bool
where
    I: IntoIterator<Item = OsString>,
{
    let rest: Vec<OsString> = args.into_iter().skip(1).collect();
    rest.len() == 1 && rest[0] == "-h"
}

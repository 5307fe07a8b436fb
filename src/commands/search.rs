//! Handler for a search invocation.
//!
//! Builds the immutable configuration from the parsed arguments, decides
//! the search bounds, runs the count-then-fetch sequence against the
//! HTTP backend and prints the lines.

use std::time::Duration;

use anyhow::Result;
use zeroize::Zeroizing;

use crate::cli::Cli;
use crate::core::backend::{BackendConfig, Credentials, HttpBackend};
use crate::core::orchestrator::QueryOrchestrator;
use crate::core::policy::SearchWindowPolicy;
use crate::core::window;
use crate::display::lines::{OutputFormat, print_lines};
use crate::error::ElasticoError;

/// Execute a search with the given arguments.
pub fn execute(cli: &Cli) -> Result<()> {
    let now = window::now();

    // Input errors are reported before any connection is attempted.
    let policy = SearchWindowPolicy::from_options(cli.limit, cli.time.as_deref(), now)?;
    if let SearchWindowPolicy::Window(window) = &policy {
        tracing::debug!(%window, "time window");
    }

    let backend = HttpBackend::new(backend_config(cli)?)?;
    let fields = cli.index_fields();
    let result = QueryOrchestrator::new(&backend, &fields).search(
        &cli.query,
        &policy,
        cli.search_options(),
        now,
    )?;

    if result.is_empty() {
        tracing::debug!(query = %cli.query, "no matching lines");
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    print_lines(&result, format)?;
    Ok(())
}

fn backend_config(cli: &Cli) -> Result<BackendConfig, ElasticoError> {
    let credentials = match &cli.user {
        Some(username) => Some(Credentials {
            username: username.clone(),
            password: match &cli.password_env {
                Some(name) => read_env_var(name)?,
                None => Zeroizing::new(String::new()),
            },
        }),
        None => None,
    };

    Ok(BackendConfig {
        base_url: cli.url.clone(),
        index: cli.index.clone(),
        timeout: Duration::from_secs(cli.timeout),
        credentials,
    })
}

/// Read a secret from the named environment variable.
fn read_env_var(name: &str) -> Result<Zeroizing<String>, ElasticoError> {
    if name.is_empty() || name.contains('=') || name.contains('\0') {
        return Err(ElasticoError::InvalidEnvVarName {
            name: name.to_string(),
        });
    }
    std::env::var(name)
        .map(Zeroizing::new)
        .map_err(|_| ElasticoError::EnvVarNotFound {
            name: name.to_string(),
        })
}

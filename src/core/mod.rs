//! Core search logic.
//!
//! This module contains the domain logic separated from CLI concerns:
//! resolving time expressions, deciding how many lines to fetch, and
//! talking to the search backend. Everything here is testable without
//! the CLI layer or a live backend.

pub mod backend;
pub mod duration;
pub mod orchestrator;
pub mod policy;
pub mod result;
pub mod time_expression;
pub mod window;

#[cfg(test)]
pub mod fake;

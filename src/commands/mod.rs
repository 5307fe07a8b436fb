//! Command handlers.
//!
//! Each handler exposes a single `execute` function that receives the
//! parsed arguments.

pub mod search;

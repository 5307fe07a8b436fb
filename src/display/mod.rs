//! Terminal display and formatting utilities.

pub mod lines;

//! In-memory [`SearchBackend`] for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::Value;

use crate::core::backend::{Operation, SearchBackend};
use crate::error::ElasticoError;

/// Replays scripted responses and records every request it receives.
///
/// Panics if a request arrives for a different operation than the next
/// scripted response, or when the script is exhausted.
#[derive(Debug, Default)]
pub struct FakeBackend {
    script: RefCell<VecDeque<(Operation, Result<String, String>)>>,
    requests: RefCell<Vec<(Operation, Value)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response body.
    pub fn respond(self, operation: Operation, body: &str) -> Self {
        self.script
            .borrow_mut()
            .push_back((operation, Ok(body.to_string())));
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, operation: Operation, reason: &str) -> Self {
        self.script
            .borrow_mut()
            .push_back((operation, Err(reason.to_string())));
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<(Operation, Value)> {
        self.requests.borrow().clone()
    }
}

impl SearchBackend for FakeBackend {
    fn execute(&self, operation: Operation, body: &Value) -> Result<String, ElasticoError> {
        self.requests.borrow_mut().push((operation, body.clone()));

        let (expected, outcome) = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected {operation:?} request: {body}"));
        assert_eq!(expected, operation, "request sent to the wrong endpoint");

        outcome.map_err(|reason| ElasticoError::BackendQueryFailure {
            url: self.describe(operation),
            reason,
            response: None,
        })
    }

    fn describe(&self, operation: Operation) -> String {
        format!("fake://backend/{}", operation.endpoint())
    }
}

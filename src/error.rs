//! Error taxonomy for the harness
//!
//! Assertion-level problems (timeouts, driver failures inside a scenario,
//! missing fixtures) are captured into report outcomes by the runner. Only
//! setup failures travel all the way up as `HarnessError`.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using the harness error
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Failure reported by the browser driver collaborator
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("{action} on '{selector}' failed: {message}")]
    Element {
        action: &'static str,
        selector: String,
        message: String,
    },

    #[error("Evaluation failed: {0}")]
    Evaluate(String),

    #[error("Screenshot to {path} failed: {message}")]
    Screenshot { path: PathBuf, message: String },

    #[error("Page session closed")]
    SessionClosed,

    #[error("{0}")]
    Other(String),
}

impl DriverError {
    pub fn element(action: &'static str, selector: &str, message: impl ToString) -> Self {
        DriverError::Element {
            action,
            selector: selector.to_string(),
            message: message.to_string(),
        }
    }
}

/// Outcome of a bounded condition wait that did not succeed
#[derive(Error, Debug, Clone)]
pub enum WaitError {
    #[error("Condition not met after {}ms (timeout {}ms)", .elapsed.as_millis(), .timeout.as_millis())]
    Timeout { elapsed: Duration, timeout: Duration },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Errors that abort a harness run or a suite load
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to bind asset server on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Fixture not found: {}", .0.display())]
    FixtureMissing(PathBuf),

    #[error("Invalid suite: {0}")]
    Suite(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}


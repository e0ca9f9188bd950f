//! Error types for the stacking harness.
//!
//! Only unrecoverable conditions live here. Stacking violations are not
//! errors: they are recorded per check in the scenario report and the run
//! continues (see [`crate::verify::Violation`]).

use thiserror::Error;

/// Unrecoverable harness failures.
///
/// A `Setup` or `Channel` error aborts the whole run before or between
/// checks; the process exits with a status distinct from an assertion
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// Test initialization failed; the environment is not ready.
    #[error("test setup failed: {0}")]
    Setup(String),

    /// The command or query channel to the window manager broke.
    #[error("window manager channel failure: {0}")]
    Channel(String),

    /// An I/O error talking to an external tool.
    #[error("I/O error: {0}")]
    Io(String),
}

/// A type alias for `Result<T, HarnessError>`.
pub type HarnessResult<T> = Result<T, HarnessError>;

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err.to_string())
    }
}

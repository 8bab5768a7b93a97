//! Error types for reblock-host

use thiserror::Error;

/// Result type for reblock-host operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving a request
#[derive(Debug, Error)]
pub enum Error {
    /// The state blob was written by an incompatible host version
    #[error("state version {found} is incompatible with this worker (expected {expected})")]
    IncompatibleState { expected: u32, found: u32 },

    /// The state envelope could not be encoded or decoded
    #[error("state envelope error: {0}")]
    Envelope(#[from] bincode::Error),

    /// Configuration could not be read or parsed
    #[error("config error: {0}")]
    Config(String),

    /// The log subscriber could not be installed
    #[error("logging error: {0}")]
    Logging(String),

    /// Response export failed
    #[error("export error: {0}")]
    Export(String),

    /// Render error
    #[error("core error: {0}")]
    Core(#[from] reblock_core::Error),
}

impl Error {
    /// Get the core error if the render itself failed
    pub fn core(&self) -> Option<&reblock_core::Error> {
        match self {
            Error::Core(err) => Some(err),
            _ => None,
        }
    }
}

// Compile-time check that Error is Send + Sync so hosts can move it across tasks.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}

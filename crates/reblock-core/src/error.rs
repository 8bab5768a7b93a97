//! Error types for reblock-core

use crate::capability::CapabilityError;
use crate::identity::{CellId, ComponentKey};
use thiserror::Error;

/// Core error type
///
/// Every variant is fatal for the render that produced it: the caller gets no
/// tree, no effects and no new state.
#[derive(Error, Debug)]
pub enum Error {
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("render restarted {restarts} times with {pending} initializer(s) still pending (limit {limit})")]
    RestartLimit {
        limit: u32,
        restarts: u32,
        pending: usize,
    },

    #[error("state decode error: {0}")]
    Decode(#[from] bincode::Error),

    #[error("form submission rejected: {0}")]
    Form(#[from] FormError),

    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("component error: {0}")]
    Component(String),
}

impl Error {
    /// Create a component error from any message
    pub fn component(message: impl Into<String>) -> Self {
        Error::Component(message.into())
    }

    /// Get the usage error if this is one
    pub fn usage(&self) -> Option<&UsageError> {
        match self {
            Error::Usage(usage) => Some(usage),
            _ => None,
        }
    }
}

/// Misuse of the component API
///
/// Each variant carries the component key (and cell index where relevant) of
/// the offending component.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UsageError {
    #[error("duplicate key {key} among children of {parent}")]
    DuplicateKey {
        parent: ComponentKey,
        key: ComponentKey,
    },

    #[error("invalid explicit key {key:?} under {parent}")]
    InvalidKey { parent: ComponentKey, key: String },

    #[error("invalid component or element name {name:?} under {parent}")]
    InvalidName { parent: ComponentKey, name: String },

    #[error("cell {cell} declared as {declared} but holds {stored} state (cells declared out of order?)")]
    CellKindMismatch {
        cell: CellId,
        declared: &'static str,
        stored: &'static str,
    },

    #[error("cell {cell} written while its render walk is executing")]
    WriteDuringRender { cell: CellId },

    #[error("timer {cell} started twice without an intervening stop")]
    TimerAlreadyStarted { cell: CellId },

    #[error("timer {cell} started while timer {running} of the same component is running")]
    ConcurrentTimer { cell: CellId, running: CellId },

    #[error("timer {cell} has invalid duration {duration_ms}ms (minimum {minimum_ms}ms)")]
    InvalidDuration {
        cell: CellId,
        duration_ms: u64,
        minimum_ms: u64,
    },

    #[error("cell {cell} does not exist in this render")]
    UnknownCell { cell: CellId },
}

/// Submitted form values that do not match the form's schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("field {field}: expected {expected}, got {got}")]
    InvalidField {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("field {field}: {value:?} is not one of the options")]
    UnknownOption { field: String, value: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

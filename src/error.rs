//! Unified error types for the pick-by-light station.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! controller's log-and-fail policy uniform. Commands on the controller
//! surface never propagate these to adapters as panics: they are logged
//! and folded into a boolean result, with `try_*` twins for callers that
//! need the reason.

use core::fmt;

use crate::app::PortNumber;

// ---------------------------------------------------------------------------
// Top-level station error
// ---------------------------------------------------------------------------

/// Every fallible operation in the station funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The port number is not part of the registry.
    NotFound(PortNumber),
    /// A caller passed something the operation cannot accept
    /// (non-positive pick amount, closed activity sink, malformed content).
    InvalidArgument(String),
    /// Static configuration is missing or inconsistent. Fatal at startup.
    Configuration(String),
    /// A file could not be read, written, or decoded.
    Io(String),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(port) => write!(f, "port number {port} does not exist"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Configuration(msg) => write!(f, "configuration: {msg}"),
            Self::Io(msg) => write!(f, "I/O: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Io(format!("malformed document: {e}"))
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Station-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

//! Error types for the bufreg core library
//!
//! Every failure the registry can report is a variant here. Short transfers
//! (buffer full, end of data) are not errors and never show up in this enum.

use thiserror::Error;

use crate::key::InternKey;

/// Main error type for registry operations
#[derive(Error, Debug)]
pub enum Error {
    /// The key was never issued, or its buffer has already been destroyed
    #[error("Unknown handle: {key} does not refer to a live buffer")]
    UnknownHandle { key: InternKey },

    /// Backing storage for a new buffer could not be reserved
    #[error("Allocation failed: could not reserve {requested} bytes ({reason})")]
    AllocationFailed { requested: u64, reason: String },

    /// A configured capacity limit would be exceeded
    #[error(
        "Capacity limit: requested {requested} bytes with {reserved} already reserved, limit is {limit} ({limit_name})"
    )]
    CapacityLimit {
        requested: u64,
        reserved: u64,
        limit: u64,
        limit_name: &'static str,
    },

    /// Offset-based I/O addressed a position outside the valid region
    #[error("Invalid offset {offset}: buffer length is {length}")]
    InvalidOffset { offset: u64, length: u64 },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// IO errors (configuration files)
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing errors (configuration files)
    #[error("TOML error: {message}")]
    Toml {
        message: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error means the caller referenced a dead or fabricated handle
    pub fn is_unknown_handle(&self) -> bool {
        matches!(self, Error::UnknownHandle { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml {
            message: err.to_string(),
            source: err,
        }
    }
}

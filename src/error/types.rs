//! Custom error types with exit codes

use thiserror::Error;

/// Main error type for svn-sparse operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SparseError {
    /// Configuration Error - missing profile, bad settings or malformed build configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Remote Error - a Subversion operation failed
    #[error("Remote error: {message}")]
    Remote { message: String },

    /// Filesystem Error - local state could not be inspected
    #[error("Filesystem error: {message}")]
    Filesystem { message: String },

    /// Cancelled - an interrupt was observed before the run completed
    #[error("Operation cancelled")]
    Cancelled,
}

impl SparseError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } => 1,
            Self::Remote { .. } => 2,
            Self::Filesystem { .. } => 3,
            Self::Cancelled => 130,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a remote error
    #[inline]
    pub fn remote<S: Into<String>>(message: S) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Create a filesystem error
    #[inline]
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }
}

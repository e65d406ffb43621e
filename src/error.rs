//! Error types for the ytgrab library.

use thiserror::Error;

/// Errors that can occur while resolving or downloading a link.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend could not resolve the URL at all.
    #[error("Invalid link {url}: {reason}")]
    InvalidLink {
        /// The link as supplied by the user.
        url: String,
        /// Backend diagnostic.
        reason: String,
    },

    /// The requested quality/format is not available for this media.
    #[error("Requested format '{selector}' is not available: {reason}")]
    UnsatisfiableFormat {
        /// The format selector that could not be satisfied.
        selector: String,
        /// Backend diagnostic.
        reason: String,
    },

    /// A required external transcoding binary is not installed.
    #[error(
        "{0} is not installed or not found in PATH. Please install it and add it to your system PATH."
    )]
    MissingTranscoder(String),

    /// Any other backend failure (process crash, network, post-processing).
    #[error("Backend error: {0}")]
    Backend(String),

    /// The persisted configuration record could not be parsed.
    #[error("Corrupted config file {path}: {reason}")]
    CorruptConfig {
        /// Path of the config file.
        path: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// I/O error during file or process operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend produced JSON we could not decode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if the failure was caused by an unsatisfiable format selector.
    #[must_use]
    pub const fn is_format_failure(&self) -> bool {
        matches!(self, Self::UnsatisfiableFormat { .. })
    }

    /// Returns true if a download that failed with this error may be retried
    /// with a relaxed selector.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UnsatisfiableFormat { .. } | Self::Backend(_))
    }
}

/// A specialized `Result` type for ytgrab operations.
pub type Result<T> = std::result::Result<T, Error>;

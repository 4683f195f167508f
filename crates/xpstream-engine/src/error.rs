//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: xpstream_core::config::ConfigError,
    },

    /// Reading from the host or writing replies failed.
    #[error("host I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A reply could not be encoded.
    #[error("reply encoding error: {source}")]
    Encode {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The maintenance task panicked or was cancelled.
    #[error("maintenance task failed: {message}")]
    Maintenance {
        /// Description of the failure.
        message: String,
    },
}

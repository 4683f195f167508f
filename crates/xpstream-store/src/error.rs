//! Error types for stats persistence.

/// Errors that can occur reading or writing the stats file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file could not be read, written or renamed.
    #[error("stats file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file content is not a JSON object.
    #[error("stats file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

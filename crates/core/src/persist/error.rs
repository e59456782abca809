use thiserror::Error;

/// Failure reported by a remote or local deck store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the identifier.
    #[error("deck {0} not found")]
    NotFound(String),
    /// The store cannot be reached or is disabled.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    /// The remote answered with a non-success status.
    #[error("remote store rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Body or reason returned by the remote.
        message: String,
    },
    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Record was readable but inconsistent.
    #[error("invalid record: {0}")]
    Invalid(String),
}

impl StoreError {
    /// Whether the error means the record simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

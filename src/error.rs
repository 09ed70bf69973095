// Error types for the listing engine
//
// InvalidArgument is a client error; Store is a dependency failure the
// presentation layer is expected to degrade around.

use thiserror::Error;

/// Result type for listing operations
pub type Result<T> = std::result::Result<T, ListingError>;

#[derive(Error, Debug)]
pub enum ListingError {
    /// Unknown archive/category token or an unusable period
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Metadata store failure (connectivity, SQL, row decoding)
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Stored data that violates an upstream precondition
    #[error("Data error: {0}")]
    Data(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ListingError {
    /// True for errors caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, ListingError::InvalidArgument(_))
    }

    /// True when the metadata store itself failed
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ListingError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let bad = ListingError::InvalidArgument("xx.ZZ".to_string());
        assert!(bad.is_client_error());
        assert!(!bad.is_unavailable());

        let down = ListingError::from(rusqlite::Error::InvalidQuery);
        assert!(down.is_unavailable());
        assert!(!down.is_client_error());
    }

    #[test]
    fn test_display() {
        let err = ListingError::InvalidArgument("xx.ZZ".to_string());
        assert_eq!(err.to_string(), "Invalid argument: xx.ZZ");
    }
}

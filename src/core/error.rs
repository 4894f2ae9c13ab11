use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Remote '{collection}' unavailable at page {page}: {reason}")]
    FetchUnavailable {
        collection: String,
        page: u32,
        reason: String,
    },

    #[error("Fetch of '{collection}' cancelled before page {page}")]
    FetchCancelled { collection: String, page: u32 },

    #[error("Malformed remote item in '{collection}': {reason}")]
    MalformedRemoteItem { collection: String, reason: String },

    #[error("'{id}' not found in '{collection}'")]
    NotFound { collection: String, id: String },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    pub fn not_found(collection: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.into(),
        }
    }

    pub fn malformed(collection: &str, reason: impl Into<String>) -> Self {
        Self::MalformedRemoteItem {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that mean the remote could not be read, as opposed to
    /// the remote answering with something we reject.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchUnavailable { .. } | Self::FetchCancelled { .. }
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for CacheError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    #[error("Credential rejected (status {status}): {body}")]
    Unauthorized { status: u16, body: String },

    /// The store does not offer the requested capability.
    ///
    /// This is the only kind callers treat as a trigger for a fallback path.
    #[error("Capability not supported: {0}")]
    Unsupported(String),

    #[error("Store rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Unexpected store response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Unreachable(e.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid store URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

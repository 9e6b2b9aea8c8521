use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpriteError {
    #[error("Empty resource key")]
    EmptyKey,

    #[error("Fetch failed for {key}: {reason}")]
    FetchFailed { key: String, reason: String },

    #[error("Decode failed for {key}: {reason}")]
    DecodeFailed { key: String, reason: String },

    #[error("Persist failed for {key}: {reason}")]
    PersistFailed { key: String, reason: String },

    #[error("Callback failed: {0}")]
    CallbackFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SpriteError {
    pub(crate) fn fetch(key: &str, reason: impl ToString) -> Self {
        Self::FetchFailed {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(key: &str, reason: impl ToString) -> Self {
        Self::DecodeFailed {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn persist(key: &str, reason: impl ToString) -> Self {
        Self::PersistFailed {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpriteError>;

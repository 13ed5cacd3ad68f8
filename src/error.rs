//! Error types shared by the adventure core.
//!
//! Player-facing outcomes never surface these: the reducer recovers locally
//! and the session boundary turns anything unexpected into a log line.
//! These are for programming and content-authoring mistakes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A caller handed in something that can never be valid (e.g. an empty
    /// candidate list).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Engine configuration failed validation.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Static content or config JSON could not be parsed.
    #[error("Content parse error: {0}")]
    Content(#[from] serde_json::Error),

    /// A reputation choice index outside the offered options.
    #[error("Unknown choice {index} (event offers {len})")]
    UnknownChoice { index: usize, len: usize },

    /// A granted item could not be normalized into an inventory entry.
    #[error("Item normalization failed: {0}")]
    ItemNormalization(String),
}

impl CoreError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

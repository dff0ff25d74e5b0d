use thiserror::Error;

/// Errors surfaced to the feed controller
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    MediaRejected(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Text for the inline error banner.
    pub fn banner(&self) -> String {
        match self {
            ClientError::Transport(_) | ClientError::Decode(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

use thiserror::Error;

/// Errors surfaced by the chat core.
///
/// None of these are fatal to a session: transport and decode failures become
/// an error turn in the transcript, and the submission guards simply reject input.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message is empty")]
    EmptyMessage,

    #[error("a request is already being processed")]
    Busy,
}

pub type Result<T> = std::result::Result<T, ChatError>;

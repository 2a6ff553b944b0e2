use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BoardError {
    /// Message shown to the user in a transient notification.
    ///
    /// Server rejections carry a message meant for people, so it is passed
    /// through untouched. Everything else keeps its category prefix.
    pub fn user_message(&self) -> String {
        match self {
            BoardError::Rejected(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for BoardError {
    fn from(err: std::io::Error) -> Self {
        BoardError::Io(err.to_string())
    }
}

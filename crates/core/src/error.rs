//! Error types for the core library.

use thiserror::Error;

/// Main error type for the core library.
#[derive(Error, Debug)]
pub enum Error {
    /// Nickname cannot be used on the wire
    #[error("invalid nickname: {0}")]
    InvalidNickname(String),

    /// Frame matched neither the text nor the command shape
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Message body was empty
    #[error("message content cannot be empty")]
    EmptyMessage,

    /// Message body exceeds the configured limit
    #[error("message content exceeds maximum length of {max} bytes (got {len})")]
    MessageTooLong { len: usize, max: usize },

    /// Message body starts with a token reserved by the protocol
    #[error("message content cannot start with reserved prefix {0}")]
    ReservedPrefix(&'static str),

    /// No log holds a message with this id
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// Only messages we authored can be edited or deleted mesh-wide
    #[error("message {0} was not sent by this node")]
    NotOwnMessage(String),

    /// File transfer error
    #[error("transfer error: {0}")]
    Transfer(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The node event loop has shut down
    #[error("mesh node is no longer running")]
    NodeStopped,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

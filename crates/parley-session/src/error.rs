//! Error types for parley-session

use thiserror::Error;

/// Result type alias using parley-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a turn or a session operation
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the wire layer (transport failure, bad status, bad content type)
    #[error(transparent)]
    Client(#[from] parley_client::Error),

    /// `send` was called with a blank message
    #[error("Message must not be empty")]
    EmptyMessage,

    /// The service reported an error frame mid-stream
    #[error("{0}")]
    Stream(String),

    /// The stream ended without a `done` or `error` event
    #[error("Stream ended before the response completed")]
    Protocol,

    /// The turn was aborted by the caller
    #[error("Request aborted")]
    Aborted,

    /// The conversation store failed
    #[error("Persistence error: {0}")]
    Persistence(String),
}

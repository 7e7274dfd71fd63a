//! Client error types.

use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] rdtp_protocol::ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection lost")]
    Disconnected,

    #[error("server did not respond")]
    Timeout,

    #[error("a request is already in flight")]
    RequestInFlight,

    #[error("not logged in")]
    NotAuthenticated,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{0}")]
    Application(String),

    #[error("malformed response: {0}")]
    BadResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// Returns whether the connection and session remain usable after this
    /// error (a subsequent request may succeed without reconnecting).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::Timeout
                | ClientError::Protocol(_)
                | ClientError::RequestInFlight
                | ClientError::NotAuthenticated
                | ClientError::Auth(_)
                | ClientError::Application(_)
                | ClientError::BadResponse(_)
        )
    }
}

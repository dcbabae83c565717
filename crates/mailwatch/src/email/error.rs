//! Mail adapter error types.

use thiserror::Error;

/// Errors that end one account's poll attempt.
#[derive(Error, Debug)]
pub enum FetchError {
    /// TCP connection could not be established or broke mid-session.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS handshake failed.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// The server rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The server sent a malformed or unexpected reply.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// A single message's metadata could not be parsed. Adapters recover from
    /// this locally by skipping the message.
    #[error("Failed to parse message: {0}")]
    ParseError(String),

    /// No adapter is registered for the account's protocol.
    #[error("No fetcher registered for protocol {0}")]
    UnsupportedProtocol(crate::model::Protocol),
}

impl FetchError {
    /// Short classification used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::ConnectionFailed(_) | FetchError::TlsError(_) => "connect",
            FetchError::AuthenticationFailed(_) => "auth",
            FetchError::ProtocolError(_) => "protocol",
            FetchError::ParseError(_) => "parse",
            FetchError::UnsupportedProtocol(_) => "config",
        }
    }
}

impl From<async_native_tls::Error> for FetchError {
    fn from(err: async_native_tls::Error) -> Self {
        FetchError::TlsError(err.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::ConnectionFailed(err.to_string())
    }
}

/// Result type for mail adapter operations.
pub type Result<T> = std::result::Result<T, FetchError>;

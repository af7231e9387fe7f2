//! Error types for the gateway

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failure to establish an IRC connection
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The TLS handshake with the IRC server failed
    #[error("TLS handshake failed: {0}")]
    Tls(String),
    /// The address was not `host:port`
    #[error("invalid server address: {0}")]
    Address(String),
    /// Connecting timed out
    #[error("connection to {0} timed out")]
    Timeout(String),
    /// Underlying socket error
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ConnectError {
    /// Whether the failure happened during the TLS handshake
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

/// Failure to write to an established IRC connection
#[derive(Error, Debug)]
pub enum IrcError {
    /// The connection's writer task has exited
    #[error("IRC connection closed")]
    Closed,
}

/// Failure to download or extract a DCC transfer
#[derive(Error, Debug)]
pub enum DccError {
    /// The event text did not contain a usable DCC SEND offer
    #[error("invalid DCC SEND string: {0}")]
    Parse(String),
    /// Socket or file error
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The sender closed the connection before the advertised size arrived
    #[error("incomplete transfer: received {received} of {expected} bytes")]
    Incomplete { received: u64, expected: u64 },
    /// The sender went quiet before the advertised size arrived
    #[error("transfer stalled: received {received} of {expected} bytes")]
    Stalled { received: u64, expected: u64 },
    /// The downloaded archive could not be extracted
    #[error("archive error: {0}")]
    Archive(String),
}

/// Failure of a terminal-mode search or download
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command-line options
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Irc(#[from] IrcError),
    #[error(transparent)]
    Dcc(#[from] DccError),
    /// Local file or terminal error
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// Reading from the IRC server failed
    #[error("lost connection to the IRC server: {0}")]
    Lost(#[source] io::Error),
    /// The IRC server closed the connection
    #[error("IRC server closed the connection")]
    Disconnected,
    /// The file server is offline
    #[error("server is not available, try another one")]
    BadServer,
    /// Nobody answered in time
    #[error("no answer within {0:?}")]
    TimedOut(Duration),
}

impl CliError {
    /// Whether the IRC connection is unusable after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Irc(_) | Self::Lost(_) | Self::Disconnected)
    }
}

/// Errors that end a client connection
#[derive(Error, Debug)]
pub enum ServerError {
    /// WebSocket transport error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// Underlying I/O error
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A response could not be encoded
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Protocol definitions for the bookgate WebSocket API
//!
//! Every frame is a JSON object tagged with `messageType`. Client requests carry
//! a kind-specific `payload` object; server responses are flat records that
//! optionally carry a `notificationType` for the client's toast styling.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Message kinds shared by requests and responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Status,
    Connect,
    Search,
    Download,
}

/// Severity of a status notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Success,
    Notify,
    Danger,
}

/// Raw inbound envelope, before the payload is decoded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub message_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Connect to an IRC server and join a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Server address in `host:port` form
    pub address: String,
    /// Channel name without the leading `#`
    pub channel: String,
    #[serde(rename = "enableTLS", default)]
    pub enable_tls: bool,
}

/// Send a query to the search bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// Ask a file server for a book by its identifier (conventionally `!server ...`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub book: String,
}

/// Decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Connect(ConnectionRequest),
    Search(SearchRequest),
    Download(DownloadRequest),
}

/// Reasons an inbound frame could not be turned into a [`Request`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid request envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("unknown request type: {0}")]
    UnknownType(String),
    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Request {
    /// Decode a text frame into a typed request
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let envelope: RequestEnvelope = serde_json::from_str(text).map_err(DecodeError::Envelope)?;
        Self::from_envelope(envelope)
    }

    /// Decode the payload of an already-parsed envelope
    pub fn from_envelope(envelope: RequestEnvelope) -> Result<Self, DecodeError> {
        let RequestEnvelope {
            message_type,
            payload,
        } = envelope;

        match message_type.as_str() {
            "CONNECT" => serde_json::from_value(payload)
                .map(Request::Connect)
                .map_err(|source| DecodeError::Payload {
                    kind: "CONNECT",
                    source,
                }),
            "SEARCH" => serde_json::from_value(payload)
                .map(Request::Search)
                .map_err(|source| DecodeError::Payload {
                    kind: "SEARCH",
                    source,
                }),
            "DOWNLOAD" => serde_json::from_value(payload)
                .map(Request::Download)
                .map_err(|source| DecodeError::Payload {
                    kind: "DOWNLOAD",
                    source,
                }),
            _ => Err(DecodeError::UnknownType(message_type)),
        }
    }
}

/// A single parsed line from a search-results listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetail {
    /// File server nickname (without the `!`)
    pub server: String,
    pub author: String,
    pub title: String,
    /// File extension, e.g. `epub`
    pub format: String,
    /// Human readable size as reported by the server, may be empty
    pub size: String,
    /// The complete line, usable verbatim as a download identifier
    pub full: String,
}

/// A search-results line that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub line: String,
    pub error: String,
}

impl ParseError {
    pub fn new(line: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            error: error.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.line)
    }
}

/// Server response messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// IRC connection established
    Connection {
        name: String,
        title: String,
        detail: String,
    },
    /// Informational notification
    Status {
        level: NotificationType,
        title: String,
        detail: Option<String>,
    },
    /// Parsed search results
    SearchResults {
        results: Vec<BookDetail>,
        parse_errors: Vec<ParseError>,
    },
    /// A requested book finished downloading
    DownloadReady { filename: String },
    /// Request or event failure
    Error { message: String },
    /// Search rejected by the global rate limit
    RateLimited { seconds_remaining: u64 },
}

impl Response {
    /// Successful connection to `host` and `#channel` as `name`
    pub fn connection(host: &str, channel: &str, name: &str) -> Self {
        Self::Connection {
            name: name.to_string(),
            title: format!("Connection established to {} #{}", host, channel),
            detail: format!("IRC username {}", name),
        }
    }

    pub fn status(level: NotificationType, title: impl Into<String>) -> Self {
        Self::Status {
            level,
            title: title.into(),
            detail: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Flatten into the on-the-wire record
    pub fn to_wire(&self) -> WireResponse {
        let mut wire = WireResponse::new(MessageType::Status);
        match self {
            Self::Connection {
                name,
                title,
                detail,
            } => {
                wire.message_type = MessageType::Connect;
                wire.notification_type = Some(NotificationType::Success);
                wire.title = Some(title.clone());
                wire.detail = Some(detail.clone());
                wire.name = Some(name.clone());
            }
            Self::Status {
                level,
                title,
                detail,
            } => {
                wire.notification_type = Some(*level);
                wire.title = Some(title.clone());
                wire.detail = detail.clone();
            }
            Self::SearchResults {
                results,
                parse_errors,
            } => {
                wire.message_type = MessageType::Search;
                wire.results = Some(results.clone());
                wire.parse_errors = Some(parse_errors.clone());
            }
            Self::DownloadReady { filename } => {
                wire.message_type = MessageType::Download;
                wire.filename = Some(filename.clone());
            }
            Self::Error { message } => {
                wire.notification_type = Some(NotificationType::Danger);
                wire.title = Some(message.clone());
            }
            Self::RateLimited { seconds_remaining } => {
                wire.notification_type = Some(NotificationType::Danger);
                wire.title = Some(format!(
                    "Please wait {} seconds to submit another search.",
                    seconds_remaining
                ));
            }
        }
        wire
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

/// Flat JSON shape of every outbound frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<NotificationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<BookDetail>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_errors: Option<Vec<ParseError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl WireResponse {
    fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            notification_type: None,
            title: None,
            detail: None,
            name: None,
            results: None,
            parse_errors: None,
            filename: None,
        }
    }
}

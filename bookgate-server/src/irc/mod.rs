//! IRC protocol plumbing
//!
//! [`IrcConnection`] is a cheap, cloneable write handle feeding the
//! connection's writer task; [`IrcReader`] yields raw lines for the session's
//! reader task. Both come from a [`Connector`].

mod client;
pub mod events;
mod tls;

pub use client::IrcConnector;
pub use events::{Event, EventClassifier, EventKind};

use std::fmt;
use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use bookgate_common::protocol::ConnectionRequest;

use crate::error::{ConnectError, IrcError};

/// CTCP delimiter
pub const CTCP: char = '\x01';

/// Establishes IRC connections for sessions
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `request.address`, register as `nick` and join the channel
    async fn connect(
        &self,
        nick: &str,
        request: &ConnectionRequest,
    ) -> Result<(IrcConnection, IrcReader), ConnectError>;
}

/// Write handle to an IRC connection
#[derive(Debug, Clone)]
pub struct IrcConnection {
    nick: String,
    channel: String,
    tx: mpsc::UnboundedSender<String>,
}

impl IrcConnection {
    /// Wrap the sending side of a connection's outbound line queue.
    ///
    /// `channel` is given without the leading `#`.
    pub fn new(nick: &str, channel: &str, tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            nick: nick.to_string(),
            channel: channel.trim_start_matches('#').to_string(),
            tx,
        }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a raw protocol line (without CRLF)
    pub fn send_raw(&self, line: impl Into<String>) -> Result<(), IrcError> {
        let line: String = line.into();
        let line = line.replace(['\r', '\n'], " ");
        self.tx.send(line).map_err(|_| IrcError::Closed)
    }

    /// Send a message to the joined channel
    pub fn send_message(&self, text: &str) -> Result<(), IrcError> {
        self.send_raw(format!("PRIVMSG #{} :{}", self.channel, text))
    }

    pub fn send_notice(&self, target: &str, text: &str) -> Result<(), IrcError> {
        self.send_raw(format!("NOTICE {} :{}", target, text))
    }

    /// Answer a server PING
    pub fn pong(&self, token: &str) -> Result<(), IrcError> {
        self.send_raw(format!("PONG :{}", token))
    }

    /// Ask the search bot for `query`
    pub fn search(&self, bot: &str, query: &str) -> Result<(), IrcError> {
        self.send_message(&format!("@{} {}", bot, query))
    }

    /// Ask a file server for a book; `book` is the `!server ...` identifier
    pub fn request_download(&self, book: &str) -> Result<(), IrcError> {
        self.send_message(book)
    }

    /// Reply to a CTCP VERSION request contained in `line`.
    ///
    /// Returns `Ok(false)` when the line carries no sender to reply to.
    pub fn send_version_info(&self, line: &str, version: &str) -> Result<bool, IrcError> {
        let Some(sender) = message_sender(line) else {
            return Ok(false);
        };
        self.send_notice(sender, &format!("{CTCP}VERSION {}{CTCP}", version))?;
        Ok(true)
    }
}

/// Nickname in a `:nick!user@host ...` prefix
pub fn message_sender(line: &str) -> Option<&str> {
    let prefix = line.strip_prefix(':')?.split(' ').next()?;
    let nick = prefix.split('!').next()?;
    (!nick.is_empty()).then_some(nick)
}

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;

/// Line reader over the receiving side of an IRC connection
pub struct IrcReader {
    inner: BufReader<BoxedRead>,
    buf: Vec<u8>,
}

impl IrcReader {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            inner: BufReader::new(Box::new(reader)),
            buf: Vec::with_capacity(512),
        }
    }

    /// Next line without its CRLF, or `None` at end of stream.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than failing the read.
    /// Cancel safe: a partially read line is kept and completed by the next call.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.inner.read_until(b'\n', &mut self.buf).await?;
        if self.buf.is_empty() {
            return Ok(None);
        }
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Ok(Some(line))
    }
}

impl fmt::Debug for IrcReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrcReader")
            .field("buffered", &self.buf.len())
            .finish_non_exhaustive()
    }
}

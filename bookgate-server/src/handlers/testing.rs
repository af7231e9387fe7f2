//! Shared test utilities for handler and event tests

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use bookgate_common::protocol::{ConnectionRequest, Response};

use super::HandlerContext;
use crate::config::ServerConfig;
use crate::dcc::Fetcher;
use crate::error::{ConnectError, DccError};
use crate::events::EventHandlerTable;
use crate::irc::{Connector, IrcConnection, IrcReader};
use crate::session::ClientSession;
use crate::state::ServerState;

/// Nickname every test session uses
pub const TEST_NICK: &str = "reader_1";

/// What the fake fetcher does with the next transfer
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Write `contents` to `dest_dir/name` and return that path
    File { name: String, contents: String },
    /// Fail with an I/O error carrying this message
    Fail(String),
}

impl FetchOutcome {
    pub fn file(name: &str, contents: &str) -> Self {
        Self::File {
            name: name.to_string(),
            contents: contents.to_string(),
        }
    }
}

/// Fetcher that produces files locally instead of speaking DCC
#[derive(Debug)]
pub struct FakeFetcher {
    outcome: Mutex<FetchOutcome>,
}

impl FakeFetcher {
    pub fn new(outcome: FetchOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
        }
    }

    pub fn set(&self, outcome: FetchOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn download_and_extract(&self, dest_dir: &Path, _text: &str) -> Result<PathBuf, DccError> {
        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            FetchOutcome::File { name, contents } => {
                tokio::fs::create_dir_all(dest_dir).await?;
                let path = dest_dir.join(name);
                tokio::fs::write(&path, contents).await?;
                Ok(path)
            }
            FetchOutcome::Fail(message) => Err(DccError::Io(io::Error::other(message))),
        }
    }
}

/// How the fake connector answers connection attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Accept,
    Refuse,
    TlsFailure,
}

/// Server side of a fake IRC connection
pub struct FakeIrc {
    /// Lines the session queued for the IRC server
    pub sent: mpsc::UnboundedReceiver<String>,
    /// Write here to feed lines to the session's reader
    pub server: DuplexStream,
}

/// Connector that hands out in-memory connections
pub struct FakeConnector {
    outcome: Mutex<ConnectOutcome>,
    connections: Mutex<Vec<FakeIrc>>,
}

impl FakeConnector {
    pub fn new(outcome: ConnectOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn set(&self, outcome: ConnectOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    /// Take the oldest connection handed out so far
    pub fn take_connection(&self) -> Option<FakeIrc> {
        let mut connections = self.connections.lock().unwrap();
        (!connections.is_empty()).then(|| connections.remove(0))
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        nick: &str,
        request: &ConnectionRequest,
    ) -> Result<(IrcConnection, IrcReader), ConnectError> {
        let outcome = *self.outcome.lock().unwrap();
        match outcome {
            ConnectOutcome::Accept => {
                let (tx, sent) = mpsc::unbounded_channel();
                let (client, server) = tokio::io::duplex(64 * 1024);
                self.connections
                    .lock()
                    .unwrap()
                    .push(FakeIrc { sent, server });
                Ok((
                    IrcConnection::new(nick, &request.channel, tx),
                    IrcReader::new(client),
                ))
            }
            ConnectOutcome::Refuse => Err(ConnectError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            ConnectOutcome::TlsFailure => Err(ConnectError::Tls(
                "received corrupt message of type InvalidContentType".to_string(),
            )),
        }
    }
}

/// Test context that owns everything a handler needs
pub struct TestContext {
    pub state: Arc<ServerState>,
    pub session: Arc<ClientSession>,
    pub rx: mpsc::UnboundedReceiver<Response>,
    pub connector: Arc<FakeConnector>,
    pub fetcher: Arc<FakeFetcher>,
    pub temp_dir: TempDir,
}

impl TestContext {
    pub fn handler_context(&self) -> HandlerContext<'_> {
        HandlerContext {
            session: &self.session,
            state: &self.state,
        }
    }

    /// Directory the fake fetcher writes into
    pub fn books_dir(&self) -> PathBuf {
        self.state.config.books_dir()
    }

    /// Detached IRC write handle and the queue it feeds
    pub fn irc_connection(&self) -> (IrcConnection, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (IrcConnection::new(TEST_NICK, "ebooks", tx), rx)
    }

    /// Event table bound to this session and a fresh IRC handle
    pub fn event_table(&self) -> (EventHandlerTable, mpsc::UnboundedReceiver<String>) {
        let (irc, rx) = self.irc_connection();
        (
            EventHandlerTable::new(self.session.clone(), self.state.clone(), irc),
            rx,
        )
    }

    /// Every response queued so far
    pub fn drain(&mut self) -> Vec<Response> {
        let mut responses = Vec::new();
        while let Ok(response) = self.rx.try_recv() {
            responses.push(response);
        }
        responses
    }

    /// Wait for the next response
    pub async fn recv(&mut self) -> Response {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("timed out waiting for a response")
            .expect("response queue closed")
    }
}

pub fn test_config(download_dir: &Path, search_interval: Duration) -> ServerConfig {
    ServerConfig {
        listen: "127.0.0.1:0".parse().unwrap(),
        name: Some(TEST_NICK.to_string()),
        download_dir: download_dir.to_path_buf(),
        log: false,
        search_bot: "search".to_string(),
        search_interval,
        user_agent: "bookgate test".to_string(),
    }
}

/// Context with an accepting connector, a failing fetcher and a 5s interval
pub fn create_test_context() -> TestContext {
    create_test_context_with(|_| {})
}

/// Like [`create_test_context`], with a hook to adjust the configuration
pub fn create_test_context_with(configure: impl FnOnce(&mut ServerConfig)) -> TestContext {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(temp_dir.path(), Duration::from_secs(5));
    configure(&mut config);

    let connector = Arc::new(FakeConnector::new(ConnectOutcome::Accept));
    let fetcher = Arc::new(FakeFetcher::new(FetchOutcome::Fail(
        "no transfer expected".to_string(),
    )));
    let state = Arc::new(ServerState::new(config, connector.clone(), fetcher.clone()));
    let (session, rx) = ClientSession::new(TEST_NICK.to_string(), "127.0.0.1:40000".parse().unwrap());

    TestContext {
        state,
        session,
        rx,
        connector,
        fetcher,
        temp_dir,
    }
}

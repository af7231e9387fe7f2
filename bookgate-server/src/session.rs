//! Per-connection client session

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, info_span};
use uuid::Uuid;

use bookgate_common::protocol::Response;

use crate::irc::IrcConnection;

/// IRC connection currently bound to a session
#[derive(Debug)]
struct ActiveConnection {
    irc: IrcConnection,
    reader_cancel: CancellationToken,
    generation: u64,
}

/// State for one accepted WebSocket connection.
///
/// Responses are queued on an unbounded channel drained by the connection's
/// writer task. After [`ClientSession::close`] every send is silently dropped.
#[derive(Debug)]
pub struct ClientSession {
    id: Uuid,
    nick: String,
    outbox: mpsc::UnboundedSender<Response>,
    cancel: CancellationToken,
    connection: Mutex<Option<ActiveConnection>>,
    generations: AtomicU64,
    span: Span,
}

impl ClientSession {
    /// Create a session and the receiving end of its response queue
    pub fn new(nick: String, peer_addr: SocketAddr) -> (Arc<Self>, mpsc::UnboundedReceiver<Response>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let span = info_span!("session", id = %id, peer = %peer_addr, nick = %nick);

        let session = Arc::new(Self {
            id,
            nick,
            outbox,
            cancel: CancellationToken::new(),
            connection: Mutex::new(None),
            generations: AtomicU64::new(0),
            span,
        });
        (session, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// IRC nickname used by this session
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Span carrying the session's identity, entered by all of its tasks
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Token cancelled when the session closes
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queue a response for the client. Never blocks; a no-op once closed.
    pub fn send(&self, response: Response) {
        if self.is_closed() {
            return;
        }
        if self.outbox.send(response).is_err() {
            debug!(parent: &self.span, "response dropped, writer has exited");
        }
    }

    /// Current IRC connection, if any
    pub fn connection(&self) -> Option<IrcConnection> {
        self.lock().as_ref().map(|active| active.irc.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Bind a new IRC connection, cancelling the reader of any previous one.
    ///
    /// Returns the token the new reader must watch and its generation, which
    /// the reader passes back to [`ClientSession::detach`] when it stops.
    pub fn attach(&self, irc: IrcConnection) -> (CancellationToken, u64) {
        let reader_cancel = self.cancel.child_token();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;

        let previous = self.lock().replace(ActiveConnection {
            irc,
            reader_cancel: reader_cancel.clone(),
            generation,
        });
        if let Some(previous) = previous {
            debug!(parent: &self.span, "replacing IRC connection {}", previous.generation);
            previous.reader_cancel.cancel();
        }

        (reader_cancel, generation)
    }

    /// Release the connection if it still belongs to `generation`
    pub fn detach(&self, generation: u64) -> bool {
        let mut guard = self.lock();
        if guard
            .as_ref()
            .is_some_and(|active| active.generation == generation)
        {
            *guard = None;
            return true;
        }
        false
    }

    /// Tear the session down: cancel every task and drop the IRC handle
    pub fn close(&self) {
        self.cancel.cancel();
        let previous = self.lock().take();
        drop(previous);
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveConnection>> {
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

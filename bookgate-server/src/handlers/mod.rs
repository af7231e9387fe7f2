//! Request handlers for client messages

mod connect;
mod download;
mod search;

#[cfg(test)]
pub mod testing;

pub use connect::handle_connect;
pub use download::handle_download;
pub use search::handle_search;

use std::sync::Arc;

use tracing::warn;

use bookgate_common::protocol::{DecodeError, Request, Response};

use crate::constants::{ERR_NOT_CONNECTED, ERR_UNKNOWN_PAYLOAD};
use crate::irc::IrcConnection;
use crate::session::ClientSession;
use crate::state::ServerState;

/// Context passed to all handlers
pub struct HandlerContext<'a> {
    pub session: &'a Arc<ClientSession>,
    pub state: &'a Arc<ServerState>,
}

impl HandlerContext<'_> {
    /// Queue a response for this session's client
    pub fn send(&self, response: Response) {
        self.session.send(response);
    }

    pub fn send_error(&self, message: &str) {
        self.session.send(Response::error(message));
    }

    /// The session's IRC connection, or an error sent to the client
    fn require_connection(&self) -> Option<IrcConnection> {
        let connection = self.session.connection();
        if connection.is_none() {
            self.send_error(ERR_NOT_CONNECTED);
        }
        connection
    }
}

/// Decode one inbound frame and dispatch it to exactly one handler
pub async fn route_message(text: &str, ctx: &HandlerContext<'_>) {
    match Request::decode(text) {
        Ok(Request::Connect(request)) => handle_connect(request, ctx).await,
        Ok(Request::Search(request)) => handle_search(request, ctx),
        Ok(Request::Download(request)) => handle_download(request, ctx),
        Err(DecodeError::UnknownType(kind)) => {
            warn!("unknown request type received: {}", kind);
        }
        Err(e) => {
            warn!("invalid request payload: {}", e);
            ctx.send_error(ERR_UNKNOWN_PAYLOAD);
        }
    }
}

//! Client connection handling

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use bookgate_common::protocol::Response;

use crate::constants::ERR_UNKNOWN_PAYLOAD;
use crate::error::ServerError;
use crate::handlers::{HandlerContext, route_message};
use crate::session::ClientSession;
use crate::state::ServerState;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Handle one WebSocket client until it disconnects or the server shuts down
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (ws_tx, ws_rx) = ws.split();

    let (session, rx) = ClientSession::new(state.config.session_name(), peer_addr);
    let span = session.span().clone();

    async move {
        info!("client connected");
        let writer = tokio::spawn(
            write_responses(ws_tx, rx, session.cancel_token().clone()).in_current_span(),
        );

        let result = read_requests(ws_rx, &session, &state, &shutdown).await;

        session.close();
        if let Ok(Err(e)) = writer.await {
            debug!("writer stopped: {}", e);
        }
        info!("client disconnected");
        result
    }
    .instrument(span)
    .await
}

/// Route inbound frames one at a time
async fn read_requests<S>(
    mut ws_rx: S,
    session: &Arc<ClientSession>,
    state: &Arc<ServerState>,
    shutdown: &CancellationToken,
) -> Result<(), ServerError>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let ctx = HandlerContext { session, state };

    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            message = ws_rx.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => route_message(text.as_str(), &ctx).await,
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => route_message(text, &ctx).await,
                Err(_) => {
                    warn!("binary frame is not UTF-8");
                    ctx.send_error(ERR_UNKNOWN_PAYLOAD);
                }
            },
            Some(Ok(Message::Close(_))) | None => return Ok(()),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Drain the session's response queue into the socket
async fn write_responses(
    mut ws_tx: WsSink,
    mut rx: mpsc::UnboundedReceiver<Response>,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    loop {
        let response = tokio::select! {
            _ = cancel.cancelled() => break,
            response = rx.recv() => match response {
                Some(response) => response,
                None => break,
            },
        };

        let json = serde_json::to_string(&response)?;
        ws_tx.send(Message::text(json)).await?;
    }

    let _ = ws_tx.close().await;
    Ok(())
}

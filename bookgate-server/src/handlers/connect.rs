//! Handler for Connect requests

use tracing::{Instrument, info, warn};

use bookgate_common::protocol::{ConnectionRequest, Response};

use super::HandlerContext;
use crate::constants::ERR_UNABLE_TO_CONNECT;
use crate::events::EventHandlerTable;
use crate::reader::run_reader;
use crate::session_log::SessionLog;

/// Connect to the IRC server, join the channel and start the reader task.
///
/// TLS handshake failures are reported in detail; every other failure gets a
/// generic message. A session that is already connected has its previous
/// connection replaced.
pub async fn handle_connect(request: ConnectionRequest, ctx: &HandlerContext<'_>) {
    let nick = ctx.session.nick();

    let (irc, reader) = match ctx.state.connector.connect(nick, &request).await {
        Ok(pair) => pair,
        Err(e) => {
            warn!("unable to connect to {}: {}", request.address, e);
            if e.is_tls() {
                ctx.send_error(&e.to_string());
            } else {
                ctx.send_error(ERR_UNABLE_TO_CONNECT);
            }
            return;
        }
    };

    let host = request.address.split(':').next().unwrap_or_default();
    let channel = irc.channel().to_string();
    info!("connected to {} #{} as {}", host, channel, nick);

    let mut table = EventHandlerTable::new(ctx.session.clone(), ctx.state.clone(), irc.clone());
    if ctx.state.config.log {
        match SessionLog::create(nick, &ctx.state.config.download_dir).await {
            Ok(log) => table = table.with_session_log(log),
            Err(e) => warn!("unable to create session log: {}", e),
        }
    }

    let (cancel, generation) = ctx.session.attach(irc);
    tokio::spawn(
        run_reader(reader, table, cancel, generation).instrument(ctx.session.span().clone()),
    );

    ctx.send(Response::connection(host, &channel, nick));
}

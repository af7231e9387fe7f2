//! Handler for Download requests

use tracing::{info, warn};

use bookgate_common::protocol::{DownloadRequest, NotificationType, Response};

use super::HandlerContext;
use crate::constants::{ERR_IRC_SEND, MSG_DOWNLOAD_RECEIVED};

/// Ask the file server for a book. The file itself arrives later as a DCC offer.
pub fn handle_download(request: DownloadRequest, ctx: &HandlerContext<'_>) {
    let Some(irc) = ctx.require_connection() else {
        return;
    };

    if let Err(e) = irc.request_download(&request.book) {
        warn!("unable to send download request: {}", e);
        ctx.send_error(ERR_IRC_SEND);
        return;
    }

    info!("download requested: {}", request.book);
    ctx.send(Response::status(
        NotificationType::Notify,
        MSG_DOWNLOAD_RECEIVED,
    ));
}

//! Handler for Search requests

use tracing::{debug, warn};

use bookgate_common::protocol::{NotificationType, Response, SearchRequest};

use super::HandlerContext;
use crate::constants::{ERR_IRC_SEND, MSG_SEARCH_SENT};
use crate::ratelimit::seconds_remaining;

/// Forward a query to the search bot, subject to the process-wide rate limit
pub fn handle_search(request: SearchRequest, ctx: &HandlerContext<'_>) {
    let Some(irc) = ctx.require_connection() else {
        return;
    };

    let bot = &ctx.state.config.search_bot;
    match ctx
        .state
        .rate_limiter
        .admit(|| irc.search(bot, &request.query))
    {
        Err(remaining) => {
            let seconds = seconds_remaining(remaining);
            debug!("search '{}' rate limited for {}s", request.query, seconds);
            ctx.send(Response::RateLimited {
                seconds_remaining: seconds,
            });
        }
        Ok(Err(e)) => {
            warn!("unable to send search: {}", e);
            ctx.send_error(ERR_IRC_SEND);
        }
        Ok(Ok(())) => {
            ctx.send(Response::status(NotificationType::Notify, MSG_SEARCH_SENT));
        }
    }
}

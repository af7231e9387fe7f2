//! Reader task pumping IRC lines into a session's event handlers

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::events::EventHandlerTable;
use crate::irc::{EventClassifier, EventKind, IrcReader};

/// DCC transfers can take minutes; they run beside the reader
fn is_transfer(kind: EventKind) -> bool {
    matches!(kind, EventKind::SearchResult | EventKind::BookResult)
}

/// Read lines until cancellation, end of stream, or a read error.
///
/// Every line goes to the [`EventKind::Message`] handler first, then to the
/// handler of its classified event. On exit the session's connection is
/// released if it still belongs to `generation`.
pub async fn run_reader(
    mut reader: IrcReader,
    table: EventHandlerTable,
    cancel: CancellationToken,
    generation: u64,
) {
    let mut classifier = EventClassifier::new();

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("IRC reader {} cancelled", generation);
                break;
            }
            result = reader.next_line() => result,
        };

        let line = match result {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("IRC server closed the connection");
                break;
            }
            Err(e) => {
                warn!("IRC read failed: {}", e);
                break;
            }
        };

        table.dispatch(EventKind::Message, &line).await;

        let Some(event) = classifier.classify(&line) else {
            continue;
        };

        if is_transfer(event.kind) {
            let table = table.clone();
            let cancel = cancel.clone();
            tokio::spawn(
                async move {
                    tokio::select! {
                        _ = cancel.cancelled() => debug!("transfer abandoned"),
                        _ = table.dispatch(event.kind, &event.payload) => {}
                    }
                }
                .in_current_span(),
            );
        } else {
            table.dispatch(event.kind, &event.payload).await;
        }
    }

    table.session().detach(generation);
}

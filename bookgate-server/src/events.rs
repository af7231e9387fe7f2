//! Per-session handlers for classified IRC events

use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info, warn};

use bookgate_common::protocol::{NotificationType, Response};
use bookgate_common::{parse_search_results, parse_servers};

use crate::constants::{ERR_BAD_SERVER, ERR_NO_RESULTS, MSG_SEARCH_ACCEPTED, msg_matches_found};
use crate::irc::{EventKind, IrcConnection};
use crate::session::ClientSession;
use crate::session_log::SessionLog;
use crate::state::ServerState;

/// Maps every [`EventKind`] to its handler for one session's IRC connection.
///
/// Built fresh for each connection. Cloning is cheap; transfer handlers run on
/// a clone so the reader keeps pumping lines while a DCC download is in flight.
#[derive(Clone)]
pub struct EventHandlerTable {
    session: Arc<ClientSession>,
    state: Arc<ServerState>,
    irc: IrcConnection,
    session_log: Option<Arc<SessionLog>>,
}

impl EventHandlerTable {
    pub fn new(session: Arc<ClientSession>, state: Arc<ServerState>, irc: IrcConnection) -> Self {
        Self {
            session,
            state,
            irc,
            session_log: None,
        }
    }

    /// Route raw [`EventKind::Message`] lines to a log file
    pub fn with_session_log(mut self, log: SessionLog) -> Self {
        self.session_log = Some(Arc::new(log));
        self
    }

    pub fn session(&self) -> &Arc<ClientSession> {
        &self.session
    }

    /// Run the handler for `kind`
    pub async fn dispatch(&self, kind: EventKind, payload: &str) {
        match kind {
            EventKind::SearchResult => self.on_search_result(payload).await,
            EventKind::BookResult => self.on_book_result(payload).await,
            EventKind::NoResults => self.on_no_results(),
            EventKind::BadServer => self.on_bad_server(),
            EventKind::SearchAccepted => self.on_search_accepted(),
            EventKind::MatchesFound => self.on_matches_found(payload),
            EventKind::Ping => self.on_ping(payload),
            EventKind::ServerList => self.on_server_list(payload),
            EventKind::Version => self.on_version(payload),
            EventKind::Message => self.on_message(payload).await,
        }
    }

    async fn on_search_result(&self, text: &str) {
        let books_dir = self.state.config.books_dir();
        let path = match self
            .state
            .fetcher
            .download_and_extract(&books_dir, text)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                warn!("search results transfer failed: {}", e);
                return;
            }
        };

        let contents = match fs::read(&path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("unable to read search results {}: {}", path.display(), e);
                return;
            }
        };

        let (results, parse_errors) = parse_search_results(&contents);
        if !parse_errors.is_empty() {
            warn!("{} search result parsing errors", parse_errors.len());
            for error in &parse_errors {
                debug!("{}", error);
            }
        }

        if results.is_empty() && parse_errors.is_empty() {
            self.on_no_results();
            remove_results_file(&path).await;
            return;
        }

        info!("sending {} search results", results.len());
        self.session.send(Response::SearchResults {
            results,
            parse_errors,
        });
        remove_results_file(&path).await;
    }

    async fn on_book_result(&self, text: &str) {
        let books_dir = self.state.config.books_dir();
        match self
            .state
            .fetcher
            .download_and_extract(&books_dir, text)
            .await
        {
            Ok(path) => {
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                info!("sending book '{}'", filename);
                self.session.send(Response::DownloadReady { filename });
            }
            Err(e) => {
                warn!("book transfer failed: {}", e);
                self.session.send(Response::error(e.to_string()));
            }
        }
    }

    fn on_no_results(&self) {
        self.session.send(Response::error(ERR_NO_RESULTS));
    }

    fn on_bad_server(&self) {
        self.session.send(Response::error(ERR_BAD_SERVER));
    }

    fn on_search_accepted(&self) {
        self.session.send(Response::status(
            NotificationType::Notify,
            MSG_SEARCH_ACCEPTED,
        ));
    }

    fn on_matches_found(&self, count: &str) {
        self.session.send(Response::status(
            NotificationType::Notify,
            msg_matches_found(count),
        ));
    }

    fn on_ping(&self, token: &str) {
        if let Err(e) = self.irc.pong(token) {
            debug!("unable to answer PING: {}", e);
        }
    }

    fn on_server_list(&self, text: &str) {
        let servers = parse_servers(text);
        debug!("{} file servers online", servers.len());
        self.state.repository.replace(servers);
    }

    fn on_version(&self, line: &str) {
        info!("sending CTCP version response: {}", line);
        match self
            .irc
            .send_version_info(line, &self.state.config.user_agent)
        {
            Ok(true) => {}
            Ok(false) => debug!("CTCP VERSION without a sender"),
            Err(e) => debug!("unable to answer CTCP VERSION: {}", e),
        }
    }

    async fn on_message(&self, line: &str) {
        let Some(log) = &self.session_log else {
            return;
        };
        if let Err(e) = log.append(line).await {
            warn!("unable to write session log {}: {}", log.path().display(), e);
        }
    }
}

async fn remove_results_file(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("error deleting search results file: {}", e);
    }
}

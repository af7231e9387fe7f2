//! Classification of raw IRC lines into gateway events

use std::sync::LazyLock;

use regex::Regex;

const DCC_SEND: &str = "DCC SEND";
const SEARCH_RESULTS_MARKER: &str = "_results_for";
const SEARCH_ACCEPTED: &str = "has been accepted";
const NO_RESULTS: &str = "Sorry";
const SERVER_UNAVAILABLE: &str = "try another server";
const CTCP_VERSION: &str = "\x01VERSION\x01";
const RPL_NAMREPLY: &str = "353";
const RPL_ENDOFNAMES: &str = "366";

static MATCHES_FOUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"returned (\d+) matches").expect("valid regex"));

/// Kinds of events raised by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// DCC offer of a search-results listing
    SearchResult,
    /// DCC offer of a book
    BookResult,
    /// The search bot found nothing
    NoResults,
    /// The requested file server is offline
    BadServer,
    /// The search bot queued the query
    SearchAccepted,
    /// The search bot reports how many matches it found
    MatchesFound,
    /// Server keepalive
    Ping,
    /// End of a channel NAMES listing
    ServerList,
    /// CTCP VERSION request
    Version,
    /// Every raw line
    Message,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::SearchResult,
        EventKind::BookResult,
        EventKind::NoResults,
        EventKind::BadServer,
        EventKind::SearchAccepted,
        EventKind::MatchesFound,
        EventKind::Ping,
        EventKind::ServerList,
        EventKind::Version,
        EventKind::Message,
    ];
}

/// A classified event and the payload its handler receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub payload: String,
}

impl Event {
    pub fn new(kind: EventKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

/// Stateful line classifier, one per IRC connection.
///
/// NAMES replies span several `353` lines; voiced nicknames (the file servers)
/// are collected until the closing `366` and then emitted as one
/// comma-separated [`EventKind::ServerList`] payload.
#[derive(Debug, Default)]
pub struct EventClassifier {
    names: Vec<String>,
}

impl EventClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one raw line. Lines matching no rule yield `None`; every line
    /// is still a [`EventKind::Message`] which the reader dispatches separately.
    pub fn classify(&mut self, line: &str) -> Option<Event> {
        let command = command(line);

        if line.contains(DCC_SEND) {
            let kind = if line.contains(SEARCH_RESULTS_MARKER) {
                EventKind::SearchResult
            } else {
                EventKind::BookResult
            };
            return Some(Event::new(kind, line));
        }

        if command == "NOTICE" {
            if line.contains(SEARCH_ACCEPTED) {
                return Some(Event::new(EventKind::SearchAccepted, line));
            }
            if line.contains(NO_RESULTS) {
                return Some(Event::new(EventKind::NoResults, line));
            }
            if line.contains(SERVER_UNAVAILABLE) {
                return Some(Event::new(EventKind::BadServer, line));
            }
            if let Some(caps) = MATCHES_FOUND.captures(line) {
                return Some(Event::new(EventKind::MatchesFound, &caps[1]));
            }
            return None;
        }

        match command {
            RPL_NAMREPLY => {
                self.collect_names(line);
                None
            }
            RPL_ENDOFNAMES => {
                let names = std::mem::take(&mut self.names);
                Some(Event::new(EventKind::ServerList, names.join(",")))
            }
            "PING" => {
                let token = line
                    .split_once(' ')
                    .map(|(_, rest)| rest.trim_start_matches(':'))
                    .unwrap_or_default();
                Some(Event::new(EventKind::Ping, token))
            }
            _ if line.contains(CTCP_VERSION) => Some(Event::new(EventKind::Version, line)),
            _ => None,
        }
    }

    fn collect_names(&mut self, line: &str) {
        let Some((_, names)) = line.split_once(" :") else {
            return;
        };
        self.names.extend(
            names
                .split_whitespace()
                .filter_map(|name| name.strip_prefix('+'))
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
    }
}

/// The command word of a line, skipping an optional `:prefix`
fn command(line: &str) -> &str {
    let mut words = line.split(' ');
    let first = words.next().unwrap_or_default();
    if first.starts_with(':') {
        words.next().unwrap_or_default()
    } else {
        first
    }
}

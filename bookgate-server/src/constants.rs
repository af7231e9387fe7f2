//! Server-wide constants and client-facing message text

/// Startup banner, followed by the crate version
pub const MSG_BANNER: &str = "bookgate IRC ebook gateway v";

/// Subdirectory of the download directory where DCC files land
pub const BOOKS_DIR: &str = "books";

/// Subdirectory of the download directory for raw IRC session logs
pub const LOGS_DIR: &str = "logs";

/// Prefix for generated IRC nicknames
pub const GENERATED_NAME_PREFIX: &str = "bookgate";

/// Timeout for establishing the TCP/TLS connection to the IRC server
pub const IRC_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Timeout for connecting to a DCC sender
pub const DCC_CONNECT_TIMEOUT_SECS: u64 = 30;

/// A DCC transfer that delivers nothing for this long is abandoned
pub const DCC_IDLE_TIMEOUT_SECS: u64 = 60;

/// Upper bound for the search interval (one day)
pub const MAX_SEARCH_INTERVAL_SECS: u64 = 24 * 60 * 60;

// ========================================================================
// Terminal Mode
// ========================================================================

/// IRC server used by `bookgated cli` unless `--server` is given
pub const DEFAULT_IRC_SERVER: &str = "irc.irchighway.net:6697";

/// Channel joined by `bookgated cli`
pub const DEFAULT_CHANNEL: &str = "ebooks";

/// How long terminal mode waits for the search bot or a file server to answer
pub const CLI_WAIT_TIMEOUT_SECS: u64 = 5 * 60;

// ========================================================================
// Status Messages
// ========================================================================

pub const MSG_SEARCH_SENT: &str = "Search request sent.";
pub const MSG_DOWNLOAD_RECEIVED: &str = "Download request received.";
pub const MSG_SEARCH_ACCEPTED: &str = "Search accepted into the queue.";

// ========================================================================
// Error Messages
// ========================================================================

pub const ERR_UNKNOWN_PAYLOAD: &str = "Unknown request payload.";
pub const ERR_UNABLE_TO_CONNECT: &str = "Unable to connect to IRC server.";
pub const ERR_NOT_CONNECTED: &str = "Not connected to an IRC server.";
pub const ERR_NO_RESULTS: &str = "No results found for the query.";
pub const ERR_BAD_SERVER: &str = "Server is not available. Try another one.";
pub const ERR_IRC_SEND: &str = "Lost connection to the IRC server.";

/// "Found {n} results for your query."
pub fn msg_matches_found(count: &str) -> String {
    format!("Found {} results for your query.", count)
}

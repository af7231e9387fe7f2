//! bookgate Common Library
//!
//! Shared protocol types and text parsers for the bookgate IRC ebook gateway.

pub mod protocol;
pub mod search;
pub mod servers;

pub use search::parse_search_results;
pub use servers::parse_servers;

/// Default port for the WebSocket gateway
pub const DEFAULT_PORT: u16 = 5228;

/// Default search bot nickname
pub const DEFAULT_SEARCH_BOT: &str = "search";

/// Default minimum interval between searches, in seconds
pub const DEFAULT_SEARCH_INTERVAL_SECS: u64 = 10;

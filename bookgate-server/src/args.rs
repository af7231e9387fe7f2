//! Command-line argument parsing

use std::net::IpAddr;
use std::path::PathBuf;

use bookgate_common::{DEFAULT_PORT, DEFAULT_SEARCH_BOT, DEFAULT_SEARCH_INTERVAL_SECS};
use clap::{Parser, Subcommand};

use crate::constants::{DEFAULT_CHANNEL, DEFAULT_IRC_SERVER};

/// bookgate IRC ebook gateway
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// IP address to bind to (IPv4 or IPv6)
    #[arg(short, long, default_value = "0.0.0.0", env = "BOOKGATE_BIND")]
    pub bind: IpAddr,

    /// Port to listen on for WebSocket clients
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "BOOKGATE_PORT")]
    pub port: u16,

    /// IRC nickname (one word). A random name is generated per session when omitted
    #[arg(short, long, env = "BOOKGATE_NAME")]
    pub name: Option<String>,

    /// Directory where search results and books are downloaded
    #[arg(short, long, default_value = "downloads", env = "BOOKGATE_DIR")]
    pub dir: PathBuf,

    /// Write raw IRC traffic of every session to a log file
    #[arg(short, long, default_value = "false")]
    pub log: bool,

    /// Nickname of the IRC search bot
    #[arg(long, default_value = DEFAULT_SEARCH_BOT, env = "BOOKGATE_SEARCHBOT")]
    pub searchbot: String,

    /// Minimum number of seconds between searches (shared by all clients)
    #[arg(short, long, default_value_t = DEFAULT_SEARCH_INTERVAL_SECS, env = "BOOKGATE_RATE_LIMIT")]
    pub rate_limit: u64,

    /// Reply sent to CTCP VERSION requests
    #[arg(long, env = "BOOKGATE_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub debug: bool,

    /// Run a one-off task instead of the gateway
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search and download from the terminal. Interactive without a subcommand
    Cli(CliArgs),
}

/// Options for terminal mode
#[derive(clap::Args, Debug, Clone)]
pub struct CliArgs {
    /// IRC nickname (one word). Randomly generated when omitted
    #[arg(short, long)]
    pub name: Option<String>,

    /// Directory where files are downloaded
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Write raw IRC traffic to a log file
    #[arg(short, long, default_value = "false")]
    pub log: bool,

    /// IRC server to connect to, as host:port
    #[arg(short, long, default_value = DEFAULT_IRC_SERVER)]
    pub server: String,

    /// Channel to join, without the leading '#'
    #[arg(short, long, default_value = DEFAULT_CHANNEL)]
    pub channel: String,

    /// Connect without TLS
    #[arg(long, default_value = "false")]
    pub no_tls: bool,

    /// Nickname of the IRC search bot
    #[arg(long, default_value = DEFAULT_SEARCH_BOT)]
    pub searchbot: String,

    #[command(subcommand)]
    pub action: Option<CliAction>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Search for a book, print the results and exit
    Search {
        /// Search terms
        query: String,
    },
    /// Download a single file and exit
    Download {
        /// Book identifier, e.g. '!Oatmeal F. Scott Fitzgerald - The Great Gatsby.epub'
        #[arg(value_parser = parse_identifier)]
        identifier: String,
    },
}

/// Book identifiers name their file server with a leading `!`
pub fn parse_identifier(value: &str) -> Result<String, String> {
    if value.starts_with('!') {
        Ok(value.to_string())
    } else {
        Err("identifier must begin with '!'".to_string())
    }
}

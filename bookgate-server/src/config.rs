//! Runtime configuration derived from command-line arguments

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::args::Args;
use crate::constants::{BOOKS_DIR, GENERATED_NAME_PREFIX, MAX_SEARCH_INTERVAL_SECS};

/// Runtime server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the WebSocket listener binds to
    pub listen: SocketAddr,
    /// Fixed IRC nickname, or `None` to generate one per session
    pub name: Option<String>,
    /// Root directory for downloads and session logs
    pub download_dir: PathBuf,
    /// Write raw IRC traffic to per-session log files
    pub log: bool,
    /// Nickname of the IRC search bot
    pub search_bot: String,
    /// Minimum interval between accepted searches, process wide
    pub search_interval: Duration,
    /// CTCP VERSION reply
    pub user_agent: String,
}

impl ServerConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.search_interval.is_zero() {
            return Err("rate limit must be greater than 0 seconds".to_string());
        }
        if self.search_interval > Duration::from_secs(MAX_SEARCH_INTERVAL_SECS) {
            return Err(format!(
                "rate limit must be at most {} seconds",
                MAX_SEARCH_INTERVAL_SECS
            ));
        }
        if self.search_bot.trim().is_empty() {
            return Err("search bot name must not be empty".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user agent must not be empty".to_string());
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        Ok(())
    }

    /// Directory where DCC transfers are written
    pub fn books_dir(&self) -> PathBuf {
        self.download_dir.join(BOOKS_DIR)
    }

    /// IRC nickname for a new session
    pub fn session_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => generate_name(),
        }
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            listen: SocketAddr::new(args.bind, args.port),
            name: args.name,
            download_dir: args.dir,
            log: args.log,
            search_bot: args.searchbot,
            search_interval: Duration::from_secs(args.rate_limit),
            user_agent: args
                .user_agent
                .unwrap_or_else(|| format!("bookgate {}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

/// IRC nicknames are a single non-empty word
pub(crate) fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err("IRC name must be a single word".to_string());
    }
    Ok(())
}

/// Random nickname such as `bookgate_3f9a1c`
pub(crate) fn generate_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}_{}", GENERATED_NAME_PREFIX, &id[..6])
}

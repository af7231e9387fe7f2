//! Process-wide server state shared by every session

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::dcc::{DccFetcher, Fetcher};
use crate::irc::{Connector, IrcConnector};
use crate::ratelimit::RateLimiter;
use crate::repository::ServerRepository;

/// Shared state, lives for the whole process.
///
/// Only the repository and the rate limiter are mutated after startup; each
/// guards itself.
pub struct ServerState {
    pub config: ServerConfig,
    pub repository: ServerRepository,
    pub rate_limiter: RateLimiter,
    pub connector: Arc<dyn Connector>,
    pub fetcher: Arc<dyn Fetcher>,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        connector: Arc<dyn Connector>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.search_interval);
        Self {
            config,
            repository: ServerRepository::new(),
            rate_limiter,
            connector,
            fetcher,
        }
    }

    /// State backed by real IRC and DCC networking
    pub fn with_network(config: ServerConfig) -> Self {
        Self::new(
            config,
            Arc::new(IrcConnector::new()),
            Arc::new(DccFetcher::new()),
        )
    }
}

//! Known file server repository

use std::sync::RwLock;

/// List of file servers currently present in the channel.
///
/// Replaced wholesale whenever a new server list arrives; the last writer wins.
#[derive(Debug, Default)]
pub struct ServerRepository {
    servers: RwLock<Vec<String>>,
}

impl ServerRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list
    pub fn replace(&self, servers: Vec<String>) {
        let mut guard = self
            .servers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = servers;
    }

    /// Snapshot of the current list
    pub fn servers(&self) -> Vec<String> {
        self.servers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.servers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

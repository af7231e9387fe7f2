//! Raw IRC traffic logs, one file per session

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::constants::LOGS_DIR;

/// Append-only log file at `{base_dir}/logs/{nick}--{timestamp}.log`
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl SessionLog {
    /// Create the log file, and its directory if needed
    pub async fn create(nick: &str, base_dir: &Path) -> io::Result<Self> {
        let dir = base_dir.join(LOGS_DIR);
        fs::create_dir_all(&dir).await?;

        let timestamp = chrono::Local::now().format("%Y-%m-%d--%H-%M-%S");
        let path = dir.join(format!("{}--{}.log", nick, timestamp));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line
    pub async fn append(&self, line: &str) -> io::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}

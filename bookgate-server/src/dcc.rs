//! DCC file transfers
//!
//! File servers and the search bot push files with a CTCP offer such as
//! `DCC SEND "The Great Gatsby.epub" 2907707975 4782 303400`: file name, IPv4
//! address as a 32-bit integer, port, and size in bytes. The receiver connects
//! to the sender and reads exactly `size` bytes.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::constants::{DCC_CONNECT_TIMEOUT_SECS, DCC_IDLE_TIMEOUT_SECS};
use crate::error::DccError;

static DCC_SEND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"DCC SEND "?(.+?)"?\s+(\S+)\s+(\d+)\s+(\d+)\s*\x01?\s*$"#).expect("valid regex")
});

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Downloads the file offered in a raw IRC line and unpacks archives
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download into `dest_dir` and return the path of the final file
    async fn download_and_extract(&self, dest_dir: &Path, text: &str) -> Result<PathBuf, DccError>;
}

/// A parsed DCC SEND offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DccOffer {
    pub filename: String,
    pub addr: SocketAddr,
    pub size: u64,
}

impl DccOffer {
    /// Parse the offer out of a raw IRC line
    pub fn parse(text: &str) -> Result<Self, DccError> {
        let caps = DCC_SEND
            .captures(text)
            .ok_or_else(|| DccError::Parse(text.to_string()))?;

        // Only the final path component, never a path chosen by the sender
        let filename = Path::new(caps[1].trim())
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty() && *name != "..")
            .ok_or_else(|| DccError::Parse(text.to_string()))?
            .to_string();

        let ip = parse_ip(&caps[2]).ok_or_else(|| DccError::Parse(text.to_string()))?;
        let port: u16 = caps[3]
            .parse()
            .map_err(|_| DccError::Parse(text.to_string()))?;
        let size: u64 = caps[4]
            .parse()
            .map_err(|_| DccError::Parse(text.to_string()))?;

        Ok(Self {
            filename,
            addr: SocketAddr::new(ip, port),
            size,
        })
    }
}

/// DCC addresses are usually a decimal IPv4 integer; some clients send text
fn parse_ip(text: &str) -> Option<IpAddr> {
    match text.parse::<u32>() {
        Ok(n) => Some(IpAddr::V4(Ipv4Addr::from(n))),
        Err(_) => text.parse().ok(),
    }
}

/// Receive the offered file into `dest_dir`
pub async fn download(offer: &DccOffer, dest_dir: &Path) -> Result<PathBuf, DccError> {
    download_with_idle_timeout(offer, dest_dir, Duration::from_secs(DCC_IDLE_TIMEOUT_SECS)).await
}

/// Like [`download`], giving up once the sender is silent for `idle`
pub async fn download_with_idle_timeout(
    offer: &DccOffer,
    dest_dir: &Path,
    idle: Duration,
) -> Result<PathBuf, DccError> {
    fs::create_dir_all(dest_dir).await?;
    let path = dest_dir.join(&offer.filename);

    let mut stream = timeout(
        Duration::from_secs(DCC_CONNECT_TIMEOUT_SECS),
        TcpStream::connect(offer.addr),
    )
    .await
    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "DCC connect timed out"))??;

    let result = receive(&mut stream, &path, offer.size, idle).await;
    if result.is_err() {
        let _ = fs::remove_file(&path).await;
    }
    result.map(|_| path)
}

async fn receive(
    stream: &mut TcpStream,
    path: &Path,
    size: u64,
    idle: Duration,
) -> Result<(), DccError> {
    let mut file = File::create(path).await?;
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut received: u64 = 0;

    while received < size {
        let n = timeout(idle, stream.read(&mut buf))
            .await
            .map_err(|_| DccError::Stalled {
                received,
                expected: size,
            })??;
        if n == 0 {
            break;
        }
        let take = (n as u64).min(size - received) as usize;
        file.write_all(&buf[..take]).await?;
        received += take as u64;

        // Acknowledge with the running total, truncated to 32 bits per DCC
        if let Err(e) = stream.write_all(&(received as u32).to_be_bytes()).await {
            debug!("DCC acknowledgement failed: {}", e);
        }
    }
    file.flush().await?;

    if received < size {
        return Err(DccError::Incomplete {
            received,
            expected: size,
        });
    }
    Ok(())
}

/// Unpack the first file of a zip archive next to it and remove the archive
pub fn extract_zip(archive_path: &Path) -> Result<PathBuf, DccError> {
    let dest_dir = archive_path
        .parent()
        .ok_or_else(|| DccError::Archive("archive has no parent directory".to_string()))?;
    let archive_file = std::fs::File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(archive_file).map_err(|e| DccError::Archive(e.to_string()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| DccError::Archive(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry
            .enclosed_name()
            .and_then(|path| path.file_name().map(|name| name.to_owned()))
        else {
            continue;
        };

        let out_path = dest_dir.join(name);
        let mut out = std::fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        drop(entry);
        drop(archive);

        std::fs::remove_file(archive_path)?;
        return Ok(out_path);
    }

    Err(DccError::Archive("archive contains no files".to_string()))
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Real DCC fetcher
#[derive(Debug, Default, Clone)]
pub struct DccFetcher;

impl DccFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Fetcher for DccFetcher {
    async fn download_and_extract(&self, dest_dir: &Path, text: &str) -> Result<PathBuf, DccError> {
        let offer = DccOffer::parse(text)?;
        debug!(
            "receiving '{}' ({} bytes) from {}",
            offer.filename, offer.size, offer.addr
        );
        let path = download(&offer, dest_dir).await?;

        if !is_zip(&path) {
            return Ok(path);
        }

        tokio::task::spawn_blocking(move || extract_zip(&path))
            .await
            .map_err(|e| DccError::Archive(format!("extraction task failed: {}", e)))?
    }
}

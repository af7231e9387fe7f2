//! TCP/TLS IRC client

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;
use tracing::debug;

use bookgate_common::protocol::ConnectionRequest;

use super::tls::TLS_CONNECTOR;
use super::{Connector, IrcConnection, IrcReader};
use crate::constants::IRC_CONNECT_TIMEOUT_SECS;
use crate::error::ConnectError;

/// Connects to real IRC servers over TCP, optionally wrapped in TLS
#[derive(Debug, Default, Clone)]
pub struct IrcConnector;

impl IrcConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for IrcConnector {
    async fn connect(
        &self,
        nick: &str,
        request: &ConnectionRequest,
    ) -> Result<(IrcConnection, IrcReader), ConnectError> {
        let host = split_host(&request.address)?;

        let tcp = timeout(
            Duration::from_secs(IRC_CONNECT_TIMEOUT_SECS),
            TcpStream::connect(request.address.as_str()),
        )
        .await
        .map_err(|_| ConnectError::Timeout(request.address.clone()))??;
        let _ = tcp.set_nodelay(true);

        if !request.enable_tls {
            return Ok(register(tcp, nick, &request.channel));
        }

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ConnectError::Address(format!("{}: {}", request.address, e)))?;
        let tls = timeout(
            Duration::from_secs(IRC_CONNECT_TIMEOUT_SECS),
            TLS_CONNECTOR.connect(server_name, tcp),
        )
        .await
        .map_err(|_| ConnectError::Timeout(request.address.clone()))?
        .map_err(|e| ConnectError::Tls(e.to_string()))?;

        Ok(register(tls, nick, &request.channel))
    }
}

/// Host part of a `host:port` address, brackets removed for IPv6 literals
fn split_host(address: &str) -> Result<&str, ConnectError> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| ConnectError::Address(address.to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(ConnectError::Address(address.to_string()));
    }
    Ok(host)
}

/// Start the writer task, send registration and JOIN, and hand back both halves
fn register<S>(stream: S, nick: &str, channel: &str) -> (IrcConnection, IrcReader)
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(write_lines(write_half, rx));

    let connection = IrcConnection::new(nick, channel, tx);
    // The writer task holds the receiver, so these cannot fail yet
    let _ = connection.send_raw(format!("NICK {}", nick));
    let _ = connection.send_raw(format!("USER {} 0 * :{}", nick, nick));
    let _ = connection.send_raw(format!("JOIN #{}", connection.channel()));

    (connection, IrcReader::new(read_half))
}

/// Drain queued lines onto the socket until every sender is gone
async fn write_lines<S>(mut writer: WriteHalf<S>, mut rx: mpsc::UnboundedReceiver<String>)
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    while let Some(line) = rx.recv().await {
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\r\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            debug!("IRC write failed: {}", e);
            return;
        }
    }

    let _ = writer.shutdown().await;
}

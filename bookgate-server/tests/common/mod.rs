//! Shared helpers for gateway integration tests
#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use bookgate_server::config::ServerConfig;
use bookgate_server::server;
use bookgate_server::state::ServerState;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A gateway running on a loopback port with real IRC and DCC networking
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<ServerState>,
    pub temp_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    pub async fn start(search_interval: Duration) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
            name: None,
            download_dir: temp_dir.path().to_path_buf(),
            log: false,
            search_bot: "search".to_string(),
            search_interval,
            user_agent: "bookgate test".to_string(),
        };

        let listener = TcpListener::bind(config.listen).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState::with_network(config));
        let shutdown = CancellationToken::new();
        tokio::spawn(server::run(listener, state.clone(), shutdown.clone()));

        Self {
            addr,
            state,
            temp_dir,
            shutdown,
        }
    }

    pub fn books_dir(&self) -> PathBuf {
        self.state.config.books_dir()
    }

    pub async fn client(&self) -> TestClient {
        TestClient::connect(self.addr).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// WebSocket client speaking the gateway's JSON protocol
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();
        Self { ws }
    }

    pub async fn send_text(&mut self, text: &str) {
        self.ws.send(Message::text(text.to_string())).await.unwrap();
    }

    pub async fn send(&mut self, message_type: &str, payload: Value) {
        let frame = json!({ "messageType": message_type, "payload": payload });
        self.send_text(&frame.to_string()).await;
    }

    pub async fn connect_irc(&mut self, address: &str) {
        self.send(
            "CONNECT",
            json!({ "address": address, "channel": "ebooks", "enableTLS": false }),
        )
        .await;
    }

    pub async fn search(&mut self, query: &str) {
        self.send("SEARCH", json!({ "query": query })).await;
    }

    pub async fn download(&mut self, book: &str) {
        self.send("DOWNLOAD", json!({ "book": book })).await;
    }

    /// Next JSON frame from the gateway
    pub async fn recv(&mut self) -> Value {
        loop {
            let message = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed")
                .unwrap();
            if let Message::Text(text) = message {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    /// Assert nothing arrives within `wait`
    pub async fn expect_silence(&mut self, wait: Duration) {
        if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(wait, self.ws.next()).await {
            panic!("unexpected frame: {}", text.as_str());
        }
    }
}

/// IRC server stand-in that accepts gateway connections
pub struct FakeIrcServer {
    listener: TcpListener,
    pub address: String,
}

impl FakeIrcServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        Self { listener, address }
    }

    /// Accept the next connection and consume its registration
    pub async fn accept(&self) -> IrcPeer {
        let (socket, _) = tokio::time::timeout(RECV_TIMEOUT, self.listener.accept())
            .await
            .expect("gateway never connected")
            .unwrap();
        let (read, writer) = socket.into_split();
        let mut peer = IrcPeer {
            lines: BufReader::new(read).lines(),
            writer,
            nick: String::new(),
        };

        let nick_line = peer.next_line().await;
        peer.nick = nick_line
            .strip_prefix("NICK ")
            .expect("NICK first")
            .to_string();
        assert!(peer.next_line().await.starts_with("USER "));
        assert_eq!(peer.next_line().await, "JOIN #ebooks");
        peer
    }
}

/// The IRC server's view of one gateway connection
pub struct IrcPeer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    pub nick: String,
}

impl IrcPeer {
    pub async fn next_line(&mut self) -> String {
        tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for an IRC line")
            .unwrap()
            .expect("gateway closed the IRC connection")
    }

    /// Wait for the gateway to hang up, skipping any remaining lines
    pub async fn wait_closed(&mut self) -> bool {
        tokio::time::timeout(RECV_TIMEOUT, async {
            while let Ok(Some(_)) = self.lines.next_line().await {}
        })
        .await
        .is_ok()
    }

    pub async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\r\n").await.unwrap();
    }

    /// Offer `name` over DCC from a loopback sender
    pub async fn offer(&mut self, from: &str, name: &str, port: u16, size: usize) {
        let line = format!(
            ":{from}!{from}@irc.local PRIVMSG {} :\x01DCC SEND {} 2130706433 {} {}\x01",
            self.nick, name, port, size
        );
        self.send(&line).await;
    }
}

/// Serve `data` once to the first DCC receiver; returns the port
pub async fn serve_dcc(data: Vec<u8>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(&data).await.unwrap();
        // Read acknowledgements until the receiver hangs up
        let mut ack = [0u8; 1024];
        while let Ok(n) = socket.read(&mut ack).await {
            if n == 0 {
                break;
            }
        }
    });
    port
}

/// A zip archive holding one file
pub fn zip_bytes(name: &str, contents: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file(name, zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(contents.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Poll `condition` until it holds or the receive timeout passes
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// A port with nothing listening on it
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

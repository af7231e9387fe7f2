//! End-to-end tests: WebSocket client, gateway, fake IRC server and DCC sender

mod common;

use std::time::Duration;

use serde_json::json;

use common::{FakeIrcServer, IrcPeer, TestClient, TestServer, closed_port, serve_dcc, wait_until, zip_bytes};

const RESULTS: &str = "Search results from SearchBot v3.00.07\r\n\
    Searched 11 lists for \"gatsby\" , found 3 matches.\r\n\
    \r\n\
    !Oatmeal F. Scott Fitzgerald - The Great Gatsby.epub  ::INFO:: 303.4KB\r\n\
    !Horla F Scott Fitzgerald - The Great Gatsby (retail).mobi  ::INFO:: 1.2MB\r\n\
    !Broken entry with no separator\r\n";

/// Connect a client to the fake IRC server and consume the CONNECT reply
async fn connected(server: &TestServer, irc: &FakeIrcServer) -> (TestClient, IrcPeer) {
    let mut client = server.client().await;
    client.connect_irc(&irc.address).await;
    let peer = irc.accept().await;

    let reply = client.recv().await;
    assert_eq!(reply["messageType"], "CONNECT");
    assert_eq!(reply["notificationType"], "SUCCESS");
    assert_eq!(reply["name"], json!(peer.nick));
    (client, peer)
}

#[tokio::test]
async fn test_connect_reports_identity() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let irc = FakeIrcServer::bind().await;

    let mut client = server.client().await;
    client.connect_irc(&irc.address).await;
    let peer = irc.accept().await;
    let reply = client.recv().await;

    assert_eq!(reply["title"], "Connection established to 127.0.0.1 #ebooks");
    assert_eq!(reply["detail"], format!("IRC username {}", peer.nick));
    assert!(peer.nick.starts_with("bookgate_"));
}

#[tokio::test]
async fn test_search_rate_limit_example() {
    let server = TestServer::start(Duration::from_secs(5)).await;
    let irc = FakeIrcServer::bind().await;
    let (mut client, mut peer) = connected(&server, &irc).await;

    client.search("gatsby").await;
    assert_eq!(
        client.recv().await,
        json!({"messageType": "STATUS", "notificationType": "NOTIFY", "title": "Search request sent."})
    );
    assert_eq!(peer.next_line().await, "PRIVMSG #ebooks :@search gatsby");

    tokio::time::sleep(Duration::from_secs(1)).await;
    client.search("gatsby").await;
    let reply = client.recv().await;
    assert_eq!(reply["messageType"], "STATUS");
    assert_eq!(reply["notificationType"], "DANGER");
    let title = reply["title"].as_str().unwrap();
    assert!(title.contains('4'), "{}", title);
}

#[tokio::test]
async fn test_rate_limit_spans_sessions() {
    let server = TestServer::start(Duration::from_secs(30)).await;
    let irc = FakeIrcServer::bind().await;
    let (mut first, mut first_peer) = connected(&server, &irc).await;
    let (mut second, _second_peer) = connected(&server, &irc).await;

    first.search("gatsby").await;
    assert_eq!(first.recv().await["title"], "Search request sent.");
    assert_eq!(first_peer.next_line().await, "PRIVMSG #ebooks :@search gatsby");

    second.search("dune").await;
    let reply = second.recv().await;
    assert_eq!(reply["notificationType"], "DANGER");
    let title = reply["title"].as_str().unwrap();
    let seconds: u64 = title
        .trim_start_matches("Please wait ")
        .split(' ')
        .next()
        .unwrap()
        .parse()
        .unwrap();
    assert!(seconds > 0 && seconds <= 30, "{}", title);
}

#[tokio::test]
async fn test_unreachable_connect_then_retry() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let mut client = server.client().await;

    let port = closed_port().await;
    client.connect_irc(&format!("127.0.0.1:{}", port)).await;
    assert_eq!(
        client.recv().await,
        json!({"messageType": "STATUS", "notificationType": "DANGER", "title": "Unable to connect to IRC server."})
    );

    let irc = FakeIrcServer::bind().await;
    client.connect_irc(&irc.address).await;
    let _peer = irc.accept().await;
    assert_eq!(client.recv().await["messageType"], "CONNECT");
}

#[tokio::test]
async fn test_search_before_connect() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let mut client = server.client().await;

    client.search("gatsby").await;
    assert_eq!(
        client.recv().await["title"],
        "Not connected to an IRC server."
    );
}

#[tokio::test]
async fn test_invalid_payload_keeps_session() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let mut client = server.client().await;

    client.send_text("definitely not json").await;
    assert_eq!(client.recv().await["title"], "Unknown request payload.");

    client.send("SEARCH", json!({ "terms": 3 })).await;
    assert_eq!(client.recv().await["title"], "Unknown request payload.");

    client.download("!Oatmeal book.epub").await;
    assert_eq!(
        client.recv().await["title"],
        "Not connected to an IRC server."
    );
}

#[tokio::test]
async fn test_search_results_are_delivered() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let irc = FakeIrcServer::bind().await;
    let (mut client, mut peer) = connected(&server, &irc).await;

    peer.send(":search!search@irc.local NOTICE bookgate :Your search for \"gatsby\" has been accepted. Searching...")
        .await;
    assert_eq!(
        client.recv().await["title"],
        "Search accepted into the queue."
    );

    peer.send(":search!search@irc.local NOTICE bookgate :Your search for \"gatsby\" returned 3 matches.")
        .await;
    assert_eq!(
        client.recv().await["title"],
        "Found 3 results for your query."
    );

    let archive = zip_bytes("SearchBot_results_for__gatsby.txt", RESULTS);
    let size = archive.len();
    let port = serve_dcc(archive).await;
    peer.offer("search", "SearchBot_results_for__gatsby.txt.zip", port, size)
        .await;

    let reply = client.recv().await;
    assert_eq!(reply["messageType"], "SEARCH");
    let results = reply["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["server"], "Oatmeal");
    assert_eq!(results[0]["author"], "F. Scott Fitzgerald");
    assert_eq!(results[0]["format"], "epub");
    assert_eq!(reply["parseErrors"].as_array().unwrap().len(), 1);

    let books_dir = server.books_dir();
    assert!(
        wait_until(|| std::fs::read_dir(&books_dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false))
        .await,
        "results file was not removed"
    );
}

#[tokio::test]
async fn test_empty_search_results_send_one_error() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let irc = FakeIrcServer::bind().await;
    let (mut client, mut peer) = connected(&server, &irc).await;

    let archive = zip_bytes("SearchBot_results_for__zzz.txt", "Search results from SearchBot\r\n");
    let size = archive.len();
    let port = serve_dcc(archive).await;
    peer.offer("search", "SearchBot_results_for__zzz.txt.zip", port, size)
        .await;

    assert_eq!(
        client.recv().await,
        json!({"messageType": "STATUS", "notificationType": "DANGER", "title": "No results found for the query."})
    );
    client.expect_silence(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_book_download() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let irc = FakeIrcServer::bind().await;
    let (mut client, mut peer) = connected(&server, &irc).await;

    let book = "!Oatmeal F. Scott Fitzgerald - The Great Gatsby.epub";
    client.download(book).await;
    assert_eq!(
        client.recv().await["title"],
        "Download request received."
    );
    assert_eq!(peer.next_line().await, format!("PRIVMSG #ebooks :{}", book));

    let contents = b"PK-not-really-an-epub".to_vec();
    let size = contents.len();
    let port = serve_dcc(contents).await;
    let line = format!(
        ":Oatmeal!o@irc.local PRIVMSG {} :\x01DCC SEND \"The Great Gatsby.epub\" 2130706433 {} {}\x01",
        peer.nick, port, size
    );
    peer.send(&line).await;

    assert_eq!(
        client.recv().await,
        json!({"messageType": "DOWNLOAD", "filename": "The Great Gatsby.epub"})
    );
    let saved = std::fs::read(server.books_dir().join("The Great Gatsby.epub")).unwrap();
    assert_eq!(saved, b"PK-not-really-an-epub");
}

#[tokio::test]
async fn test_book_download_failure_is_reported() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let irc = FakeIrcServer::bind().await;
    let (mut client, mut peer) = connected(&server, &irc).await;

    let port = closed_port().await;
    peer.offer("Oatmeal", "book.epub", port, 100).await;

    let reply = client.recv().await;
    assert_eq!(reply["messageType"], "STATUS");
    assert_eq!(reply["notificationType"], "DANGER");
    assert!(!reply["title"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_search_transfer_is_silent() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let irc = FakeIrcServer::bind().await;
    let (mut client, mut peer) = connected(&server, &irc).await;

    let port = closed_port().await;
    peer.offer("search", "SearchBot_results_for__gatsby.txt.zip", port, 100)
        .await;

    client.expect_silence(Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_ping_server_list_and_version() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let irc = FakeIrcServer::bind().await;
    let (mut client, mut peer) = connected(&server, &irc).await;

    peer.send("PING :irc.local").await;
    assert_eq!(peer.next_line().await, "PONG :irc.local");

    let names = format!(":irc.local 353 {} = #ebooks :@search +serverA +serverB lurker", peer.nick);
    peer.send(&names).await;
    peer.send(&format!(":irc.local 366 {} #ebooks :End of /NAMES list.", peer.nick))
        .await;

    let state = server.state.clone();
    assert!(
        wait_until(|| state.repository.servers() == vec!["serverA".to_string(), "serverB".to_string()])
            .await
    );

    peer.send(&format!(":Horla!h@irc.local PRIVMSG {} :\x01VERSION\x01", peer.nick))
        .await;
    assert_eq!(
        peer.next_line().await,
        "NOTICE Horla :\x01VERSION bookgate test\x01"
    );

    client.expect_silence(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_client_disconnect_closes_irc() {
    let server = TestServer::start(Duration::from_secs(10)).await;
    let irc = FakeIrcServer::bind().await;
    let (client, mut peer) = connected(&server, &irc).await;

    drop(client);

    // The gateway drops its IRC connection once the session is torn down
    assert!(peer.wait_closed().await);
}

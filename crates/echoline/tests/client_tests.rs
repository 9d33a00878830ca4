//! Chat client integration tests against an in-process server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use echoline::{ChatClient, ClientError, ConnectionState};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// How each spawned server treats an accepted connection.
#[derive(Clone, Copy)]
enum ServerMode {
    /// Answer "ping" with "pong", echo everything else.
    Echo,
    /// Send a greeting, then behave like `Echo`.
    Greet,
    /// Read frames but never write anything.
    Silent,
    /// Close immediately with code 1000.
    CloseOnAccept,
    /// Push numbered lines tagged with the connection index, ignoring input.
    Feed,
}

struct TestServer {
    addr: SocketAddr,
    /// Text frames received, across all connections in accept order.
    received: Arc<Mutex<Vec<String>>>,
    accepts: Arc<AtomicUsize>,
}

impl TestServer {
    async fn spawn(mode: ServerMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let accepts = Arc::new(AtomicUsize::new(0));

        let received_log = received.clone();
        let accept_count = accepts.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let conn = accept_count.fetch_add(1, Ordering::SeqCst) + 1;
                let received_log = received_log.clone();
                tokio::spawn(async move {
                    let mut ws = match tokio_tungstenite::accept_async(stream).await {
                        Ok(ws) => ws,
                        Err(_) => return,
                    };
                    match mode {
                        ServerMode::CloseOnAccept => {
                            let _ = ws
                                .close(Some(CloseFrame {
                                    code: CloseCode::Normal,
                                    reason: "".into(),
                                }))
                                .await;
                            while let Some(Ok(_)) = ws.next().await {}
                            return;
                        }
                        ServerMode::Greet => {
                            let _ = ws.send(Message::Text("Welcome!!!".into())).await;
                        }
                        ServerMode::Feed => {
                            let mut seq = 0u32;
                            loop {
                                seq += 1;
                                let line = format!("c{conn} {seq}");
                                if ws.send(Message::Text(line.into())).await.is_err() {
                                    return;
                                }
                                time::sleep(Duration::from_millis(5)).await;
                            }
                        }
                        ServerMode::Echo | ServerMode::Silent => {}
                    }
                    while let Some(Ok(msg)) = ws.next().await {
                        if let Message::Text(text) = msg {
                            received_log.lock().push(text.to_string());
                            if matches!(mode, ServerMode::Silent) {
                                continue;
                            }
                            let reply = if text.as_str() == "ping" {
                                "pong".to_string()
                            } else {
                                text.to_string()
                            };
                            if ws.send(Message::Text(reply.into())).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            received,
            accepts,
        }
    }

    fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Capture every log line the client emits.
fn capture_log(client: &ChatClient) -> Arc<Mutex<Vec<String>>> {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    client.log_line.connect(move |line: &String| {
        sink.lock().push(line.clone());
    });
    lines
}

/// Poll until `cond` holds, failing the test after `limit`.
async fn wait_until(limit: Duration, cond: impl Fn() -> bool) {
    time::timeout(limit, async {
        while !cond() {
            time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

fn count_of(lines: &Mutex<Vec<String>>, wanted: &str) -> usize {
    lines.lock().iter().filter(|line| *line == wanted).count()
}

#[tokio::test]
async fn test_connect_reports_status_and_log() {
    let server = TestServer::spawn(ServerMode::Echo).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);
    let status = Arc::new(Mutex::new(Vec::new()));
    let status_sink = status.clone();
    client.status_changed.connect(move |&up: &bool| {
        status_sink.lock().push(up);
    });

    client.connect();
    wait_until(Duration::from_secs(5), || client.is_connected()).await;

    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(count_of(&lines, "Connected"), 1);
    assert_eq!(*status.lock(), vec![true]);
}

#[tokio::test]
async fn test_send_transmits_exactly_one_frame() {
    let server = TestServer::spawn(ServerMode::Echo).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);

    client.connect();
    wait_until(Duration::from_secs(5), || client.is_connected()).await;

    // Empty and whitespace-only sends are silent no-ops.
    client.send("").unwrap();
    client.send("   ").unwrap();
    client.send("hi").unwrap();

    let received = server.received.clone();
    wait_until(Duration::from_secs(5), || !received.lock().is_empty()).await;
    assert_eq!(*server.received.lock(), vec!["hi".to_string()]);

    // The echo comes back and both directions are logged.
    let echo_lines = lines.clone();
    wait_until(Duration::from_secs(5), || {
        count_of(&echo_lines, "Received: hi") == 1
    })
    .await;
    assert_eq!(count_of(&lines, "Sent: hi"), 1);
}

#[tokio::test]
async fn test_send_trims_whitespace() {
    let server = TestServer::spawn(ServerMode::Echo).await;
    let client = ChatClient::new(server.origin());

    client.connect();
    wait_until(Duration::from_secs(5), || client.is_connected()).await;

    client.send("  hello  ").unwrap();
    let received = server.received.clone();
    wait_until(Duration::from_secs(5), || !received.lock().is_empty()).await;
    assert_eq!(*server.received.lock(), vec!["hello".to_string()]);
}

#[tokio::test]
async fn test_greeting_is_logged_verbatim() {
    let server = TestServer::spawn(ServerMode::Greet).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);

    client.connect();
    let greeting = lines.clone();
    wait_until(Duration::from_secs(5), || {
        count_of(&greeting, "Received: Welcome!!!") == 1
    })
    .await;
}

#[tokio::test]
async fn test_unsolicited_pong_logged_once_and_harmless() {
    // A pong with no ping outstanding is logged like any message and must
    // not disturb the connection.
    let server = TestServer::spawn(ServerMode::Echo).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);

    client.connect();
    wait_until(Duration::from_secs(5), || client.is_connected()).await;

    // "ping" through the normal send path draws a real "pong" reply.
    client.send("ping").unwrap();
    let pong_lines = lines.clone();
    wait_until(Duration::from_secs(5), || {
        count_of(&pong_lines, "Received: pong") == 1
    })
    .await;

    assert!(client.is_connected());
    assert_eq!(count_of(&lines, "Received: pong"), 1);
}

#[tokio::test]
async fn test_manual_disconnect_closes_normally() {
    let server = TestServer::spawn(ServerMode::Echo).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);

    client.connect();
    wait_until(Duration::from_secs(5), || client.is_connected()).await;

    client.disconnect();
    let closed = lines.clone();
    wait_until(Duration::from_secs(5), || {
        count_of(&closed, "Disconnected. Code: 1000") == 1
    })
    .await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(matches!(client.send("late"), Err(ClientError::NotConnected)));
}

#[tokio::test]
async fn test_rapid_double_connect_leaves_one_connection() {
    let server = TestServer::spawn(ServerMode::Echo).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);

    client.connect();
    client.connect();
    wait_until(Duration::from_secs(5), || client.is_connected()).await;

    // The superseded attempt must not reach the UI: one Connected line,
    // no disconnect line from its teardown.
    assert_eq!(count_of(&lines, "Connected"), 1);
    assert!(
        !lines
            .lock()
            .iter()
            .any(|line| line.starts_with("Disconnected"))
    );

    client.send("still works").unwrap();
    let received = server.received.clone();
    wait_until(Duration::from_secs(5), || !received.lock().is_empty()).await;
    assert_eq!(*server.received.lock(), vec!["still works".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_superseded_connection_events_do_not_reach_the_log() {
    let server = TestServer::spawn(ServerMode::Feed).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);

    client.connect();
    let first = lines.clone();
    wait_until(Duration::from_secs(5), || {
        first
            .lock()
            .iter()
            .any(|line| line.starts_with("Received: c1 "))
    })
    .await;

    // Replace the connection while the first transport is mid-stream.
    client.connect();
    let second = lines.clone();
    wait_until(Duration::from_secs(5), || {
        second
            .lock()
            .iter()
            .filter(|line| line.starts_with("Received: c2 "))
            .count()
            >= 5
    })
    .await;

    // Once the replacement is delivering, nothing from the replaced
    // transport may surface.
    let snapshot = lines.lock().clone();
    let first_c2 = snapshot
        .iter()
        .position(|line| line.starts_with("Received: c2 "))
        .unwrap();
    assert!(
        !snapshot[first_c2..]
            .iter()
            .any(|line| line.starts_with("Received: c1 "))
    );
    assert_eq!(count_of(&lines, "Connected"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_manual_disconnect_still_reconnects_after_delay() {
    let server = TestServer::spawn(ServerMode::Echo).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);

    client.connect();
    wait_until(Duration::from_secs(60), || client.is_connected()).await;

    let disconnected_at = Instant::now();
    client.disconnect();
    let closed = lines.clone();
    wait_until(Duration::from_secs(60), || {
        count_of(&closed, "Disconnected. Code: 1000") == 1
    })
    .await;

    // Hanging up does not cancel the scheduled reconnect: the client
    // dials again 5 seconds later on its own.
    let accepts = server.accepts.clone();
    wait_until(Duration::from_secs(60), || {
        accepts.load(Ordering::SeqCst) >= 2
    })
    .await;
    let redialed = lines.clone();
    wait_until(Duration::from_secs(60), || {
        count_of(&redialed, "Connected") >= 2
    })
    .await;
    assert!(disconnected_at.elapsed() >= echoline::RECONNECT_DELAY);
    assert!(client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_server_close_logs_code_and_reconnects_after_delay() {
    let server = TestServer::spawn(ServerMode::CloseOnAccept).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);
    let started = Instant::now();

    client.connect();

    let closed = lines.clone();
    wait_until(Duration::from_secs(60), || {
        count_of(&closed, "Disconnected. Code: 1000") >= 1
    })
    .await;

    // The scheduled reconnect dials again; the server closes that one too.
    let accepts = server.accepts.clone();
    wait_until(Duration::from_secs(60), || {
        accepts.load(Ordering::SeqCst) >= 2
    })
    .await;

    let reconnected = lines.clone();
    wait_until(Duration::from_secs(60), || {
        count_of(&reconnected, "Connected") >= 2
    })
    .await;
    assert!(started.elapsed() >= echoline::RECONNECT_DELAY);
}

#[tokio::test(start_paused = true)]
async fn test_pong_timeout_closes_with_1008() {
    let server = TestServer::spawn(ServerMode::Silent).await;
    let client = ChatClient::new(server.origin());
    let lines = capture_log(&client);
    let started = Instant::now();

    client.connect();
    wait_until(Duration::from_secs(60), || client.is_connected()).await;

    let closed = lines.clone();
    wait_until(Duration::from_secs(300), || {
        count_of(&closed, "Disconnected. Code: 1008, Reason: Pong timeout") == 1
    })
    .await;

    // Exactly one probe went out before the liveness failure, at the full
    // ping interval; the close followed one pong timeout later.
    let received = server.received.clone();
    wait_until(Duration::from_secs(60), || !received.lock().is_empty()).await;
    assert_eq!(*server.received.lock(), vec!["ping".to_string()]);
    assert!(started.elapsed() >= echoline::PING_INTERVAL + echoline::PONG_TIMEOUT);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_open_failure_surfaces_as_error_and_abnormal_close() {
    // Grab a port that nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ChatClient::new(format!("http://{addr}"));
    let lines = capture_log(&client);

    client.connect();
    let closed = lines.clone();
    wait_until(Duration::from_secs(60), || {
        count_of(&closed, "Disconnected. Code: 1006") >= 1
    })
    .await;
    assert!(lines.lock().iter().any(|line| line.starts_with("Error: ")));
}

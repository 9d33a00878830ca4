//! Terminal front-end for the echoline chat client.
//!
//! Thin rendering glue only: log lines and status changes print to stdout,
//! stdin lines are sent as chat messages. `/connect`, `/disconnect` and
//! `/quit` replace the page buttons.

use echoline::ChatClient;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_ORIGIN: &str = "http://localhost:8080";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let origin = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ORIGIN.to_string());

    let client = ChatClient::new(origin);
    client.log_line.connect(|line: &String| {
        println!("{line}");
    });
    client.status_changed.connect(|&connected: &bool| {
        if connected {
            println!("[status] connected. /disconnect to hang up, /quit to exit");
        } else {
            println!("[status] disconnected. /connect to dial");
        }
    });

    println!("echoline: chatting via {}", client.origin());
    client.connect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "/quit" => break,
            "/connect" => client.connect(),
            "/disconnect" => client.disconnect(),
            text => {
                if let Err(err) = client.send(text) {
                    eprintln!("[error] {err}");
                }
            }
        }
    }
}

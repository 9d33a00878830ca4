//! Minimal interactive client for a WebSocket chat/echo service.
//!
//! The crate centers on one component, [`ChatClient`]: it owns a single
//! logical WebSocket connection, keeps it alive with an application-level
//! `"ping"`/`"pong"` heartbeat, and reconnects automatically a fixed
//! 5 seconds after any loss. Everything a UI needs (a scrolling log and a
//! connected/disconnected status) is delivered through [`Signal`]s, so the
//! core has zero rendering dependency.
//!
//! # Lifecycle
//!
//! The connection moves between three states ([`ConnectionState`]):
//!
//! - `Disconnected` → `Connecting` on [`ChatClient::connect`]
//! - `Connecting` → `Connected` when the transport opens
//! - back to `Disconnected` on any close: remote close, transport error,
//!   explicit [`ChatClient::disconnect`], or heartbeat timeout (a local
//!   close with code 1008, reason "Pong timeout")
//!
//! Every close schedules exactly one reconnect attempt 5 seconds later:
//! no backoff growth, no attempt limit, and deliberately no exception
//! for manual disconnects.
//!
//! # Example
//!
//! ```ignore
//! use echoline::ChatClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = ChatClient::new("http://localhost:8080");
//!
//!     client.log_line.connect(|line| println!("{line}"));
//!     client.status_changed.connect(|connected| {
//!         println!("connected: {connected}");
//!     });
//!
//!     client.connect();
//!     client.send("hello").ok();
//! }
//! ```
//!
//! # Logging
//!
//! The library is instrumented with the `tracing` crate under the
//! `echoline::*` targets. Install a subscriber in your application to see
//! the output:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```

mod client;
mod error;
mod heartbeat;
mod message;
mod origin;
pub mod signal;

pub use client::ChatClient;
pub use error::{ClientError, Result};
pub use heartbeat::{PING_INTERVAL, PONG_TIMEOUT, RECONNECT_DELAY};
pub use message::{CloseCode, CloseReason, ConnectionState};
pub use origin::derive_ws_url;
pub use signal::{Signal, SlotGuard, SlotId};

//! Application-level ping/pong heartbeat.
//!
//! While connected, the client sends the literal text frame `"ping"` on a
//! fixed interval and expects the server to answer with `"pong"`. A ping
//! that goes unacknowledged past the pong timeout is treated as a dead
//! connection and forces a local close.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior, Sleep};

/// Interval between heartbeat probes.
pub const PING_INTERVAL: Duration = Duration::from_millis(60_000);
/// Deadline for the server to answer a probe.
pub const PONG_TIMEOUT: Duration = Duration::from_millis(5_000);
/// Delay before the automatic reconnect attempt after any close.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5_000);

/// Text frame sent as a heartbeat probe.
pub(crate) const PING_FRAME: &str = "ping";
/// Text frame expected in reply to a probe.
pub(crate) const PONG_FRAME: &str = "pong";

/// Timer event produced by [`Heartbeat::next_event`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum HeartbeatEvent {
    /// The ping interval elapsed; a probe should be sent.
    PingDue,
    /// The pong deadline elapsed with no acknowledgement.
    PongOverdue,
}

/// Heartbeat timer state for one connection.
///
/// Owns the recurring ping interval and, while a probe is in flight, the
/// one-shot pong deadline. The deadline exists exactly while a ping is
/// unacknowledged, so `Option<Sleep>` doubles as the awaiting-pong flag and
/// both are cleared together. Both timers live on the connection task's
/// stack and die with it, so no timer can outlive its connection.
pub(crate) struct Heartbeat {
    ping_timer: Interval,
    pong_deadline: Option<Pin<Box<Sleep>>>,
}

impl Heartbeat {
    /// Start the heartbeat. The first probe is due one full interval from
    /// now; the connection is treated as healthy until then.
    pub(crate) fn new() -> Self {
        let mut ping_timer =
            time::interval_at(time::Instant::now() + PING_INTERVAL, PING_INTERVAL);
        ping_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ping_timer,
            pong_deadline: None,
        }
    }

    /// Arm the pong deadline after a probe was written to the transport.
    pub(crate) fn mark_ping_sent(&mut self) {
        self.pong_deadline = Some(Box::pin(time::sleep(PONG_TIMEOUT)));
    }

    /// Record a received `"pong"`, disarming the pending deadline.
    ///
    /// Returns `true` if a probe was actually outstanding. A pong with no
    /// ping in flight is acceptable and simply ignored.
    pub(crate) fn pong_received(&mut self) -> bool {
        self.pong_deadline.take().is_some()
    }

    /// Wait for the next heartbeat timer to fire.
    ///
    /// Races the pong deadline (when armed) against the ping interval.
    /// Cancel-safe: dropping the future loses no timer state.
    pub(crate) async fn next_event(&mut self) -> HeartbeatEvent {
        let Self {
            ping_timer,
            pong_deadline,
        } = self;
        tokio::select! {
            _ = async {
                match pong_deadline.as_mut() {
                    Some(deadline) => deadline.await,
                    None => future::pending().await,
                }
            } => HeartbeatEvent::PongOverdue,
            _ = ping_timer.tick() => HeartbeatEvent::PingDue,
        }
    }
}

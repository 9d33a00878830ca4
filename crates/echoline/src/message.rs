//! Connection state and close-frame types.

/// Current state of the chat connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to the server.
    #[default]
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Connected and ready to send/receive messages.
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Standard WebSocket close codes as defined in RFC 6455.
///
/// Peer-supplied codes are surfaced verbatim in the log; the client itself
/// closes with [`CloseCode::Normal`] on user disconnect and
/// [`CloseCode::Policy`] (1008) on heartbeat failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CloseCode {
    /// Normal closure; the connection successfully completed.
    #[default]
    Normal,
    /// Endpoint is going away.
    Away,
    /// Protocol error occurred.
    Protocol,
    /// Received a data type that cannot be accepted.
    Unsupported,
    /// No status code was present in the close frame.
    NoStatus,
    /// Connection closed abnormally (no close frame at all).
    Abnormal,
    /// Received data inconsistent with the message type.
    Invalid,
    /// Policy violation. Used locally for heartbeat liveness failure.
    Policy,
    /// Message too big to process.
    TooBig,
    /// Extension negotiation failed.
    Extension,
    /// Unexpected condition prevented the request from being fulfilled.
    Error,
    /// Server is restarting.
    Restart,
    /// Server is too busy; try again later.
    Again,
    /// Application-specific close code (4000-4999).
    Custom(u16),
}

impl CloseCode {
    /// Numeric value of this close code.
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::Away => 1001,
            Self::Protocol => 1002,
            Self::Unsupported => 1003,
            Self::NoStatus => 1005,
            Self::Abnormal => 1006,
            Self::Invalid => 1007,
            Self::Policy => 1008,
            Self::TooBig => 1009,
            Self::Extension => 1010,
            Self::Error => 1011,
            Self::Restart => 1012,
            Self::Again => 1013,
            Self::Custom(code) => *code,
        }
    }

    /// Create from a numeric close code.
    pub fn from_u16(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::Away,
            1002 => Self::Protocol,
            1003 => Self::Unsupported,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1007 => Self::Invalid,
            1008 => Self::Policy,
            1009 => Self::TooBig,
            1010 => Self::Extension,
            1011 => Self::Error,
            1012 => Self::Restart,
            1013 => Self::Again,
            code => Self::Custom(code),
        }
    }
}

/// Code and optional reason text describing why a connection closed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloseReason {
    /// The close status code.
    pub code: CloseCode,
    /// Optional human-readable reason string.
    pub reason: Option<String>,
}

impl CloseReason {
    /// Create a close reason with just a code.
    pub fn new(code: CloseCode) -> Self {
        Self { code, reason: None }
    }

    /// Create a close reason with a code and message.
    pub fn with_reason(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: Some(reason.into()),
        }
    }

    /// A normal (code 1000) close with no reason text.
    pub fn normal() -> Self {
        Self::new(CloseCode::Normal)
    }
}

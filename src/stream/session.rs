//! Client session state machine
//!
//! Tracks one stream client from connection to disconnection:
//!
//! ```text
//! Connecting ──► Streaming ──► Disconnected
//!      │                           ▲
//!      └───────────────────────────┘
//! ```
//!
//! `Disconnected` is terminal.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Lifecycle phase of a stream client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// Connection accepted, response headers not yet sent
    Connecting,
    /// Receiving events
    Streaming,
    /// Gone; no transition out of this phase
    Disconnected,
}

/// Why a client session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client closed the connection or a write to it failed
    ClientGone,
    /// The frame slot was closed (server shutdown or source ended)
    Shutdown,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::ClientGone => write!(f, "client gone"),
            DisconnectReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Per-connection state
#[derive(Debug, Clone)]
pub struct ClientSession {
    /// Unique client ID
    pub id: u64,

    /// Remote peer address, when known
    pub peer_addr: Option<SocketAddr>,

    /// Current phase
    pub phase: ClientPhase,

    /// When the connection was accepted
    pub connected_at: Instant,

    /// Events written to this client
    pub events_sent: u64,

    /// Event bytes written to this client
    pub bytes_sent: u64,

    /// Set when the session ends
    pub disconnect_reason: Option<DisconnectReason>,
}

impl ClientSession {
    /// Create a session in the `Connecting` phase
    pub fn new(id: u64, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            id,
            peer_addr,
            phase: ClientPhase::Connecting,
            connected_at: Instant::now(),
            events_sent: 0,
            bytes_sent: 0,
            disconnect_reason: None,
        }
    }

    /// Transition to streaming
    pub fn start_streaming(&mut self) {
        if self.phase == ClientPhase::Connecting {
            self.phase = ClientPhase::Streaming;
        }
    }

    /// Account for one event written
    pub fn record_event(&mut self, len: usize) {
        self.events_sent += 1;
        self.bytes_sent += len as u64;
    }

    /// End the session
    ///
    /// Returns false if it had already ended; the first reason wins.
    pub fn disconnect(&mut self, reason: DisconnectReason) -> bool {
        if self.phase == ClientPhase::Disconnected {
            return false;
        }
        self.phase = ClientPhase::Disconnected;
        self.disconnect_reason = Some(reason);
        true
    }

    /// Whether the session is receiving events
    pub fn is_streaming(&self) -> bool {
        self.phase == ClientPhase::Streaming
    }

    /// Time since the connection was accepted
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

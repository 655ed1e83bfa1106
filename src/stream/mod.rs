//! Event stream delivery to clients
//!
//! This module provides:
//! - Server-sent event framing and client-side parsing
//! - Per-client session state
//! - The broadcaster that feeds one client from the frame slot

pub mod broadcaster;
pub mod event;
pub mod session;

pub use broadcaster::Broadcaster;
pub use event::{encode_event, parse_event, parse_payload, EventReader, StreamEvent};
pub use session::{ClientPhase, ClientSession, DisconnectReason};

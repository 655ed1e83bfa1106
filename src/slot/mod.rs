//! Single-slot frame broadcast
//!
//! The slot holds only the most recently published frame. The producer
//! replaces it and wakes every waiting subscriber; each subscriber then reads
//! whatever is current. Nothing is queued, so a slow subscriber skips frames
//! instead of falling behind.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<FrameSlot>
//!                 ┌──────────────────────────┐
//!                 │ Mutex<SlotState {        │
//!                 │   current: Option<..>,   │
//!                 │   generation: u64,       │
//!                 │   closed: bool,          │
//!                 │ }>                       │
//!                 │ Notify                   │
//!                 └────────────┬─────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!   [Producer]           [Subscriber]          [Subscriber]
//!   publish()            wait_next()           wait_next()
//!        │                     │                     │
//!        └──► replace + notify_waiters() ──► SSE line ──► TCP
//! ```
//!
//! Each subscriber remembers the last generation it saw, so a publish that
//! lands between two `wait_next()` calls is still observed (as the latest
//! record) rather than lost.

pub mod record;
pub mod store;

pub use record::FrameRecord;
pub use store::{FrameSlot, Subscriber};

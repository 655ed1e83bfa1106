//! Per-client broadcaster
//!
//! Waits on the frame slot and turns each observed record into one event for
//! a single client. The HTTP layer pulls events from [`Broadcaster::into_stream`]
//! and only asks for the next one after the previous write completed, so
//! nothing is buffered beyond the slot itself.
//!
//! When a write fails the HTTP layer drops the stream, which drops the
//! broadcaster and its subscriber. Other clients and the producer never see it.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::sync::OwnedSemaphorePermit;

use super::event::encode_event;
use super::session::{ClientPhase, ClientSession, DisconnectReason};
use crate::slot::Subscriber;
use crate::stats::StreamStats;

/// Event source for one connected client
pub struct Broadcaster {
    session: ClientSession,
    subscriber: Subscriber,
    stats: Arc<StreamStats>,
    /// Connection-limit permit, released when the client goes away
    _permit: Option<OwnedSemaphorePermit>,
}

impl Broadcaster {
    /// Create a broadcaster for a new client session
    pub fn new(session: ClientSession, subscriber: Subscriber, stats: Arc<StreamStats>) -> Self {
        Self {
            session,
            subscriber,
            stats,
            _permit: None,
        }
    }

    /// Hold a connection-limit permit for the lifetime of this client
    pub fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self._permit = Some(permit);
        self
    }

    /// Session state for this client
    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// Wait for the next frame and encode it as an event
    ///
    /// Returns `None` once the slot is closed.
    pub async fn next_event(&mut self) -> Option<Bytes> {
        if self.session.phase == ClientPhase::Connecting {
            self.session.start_streaming();
            self.stats.client_connected();
            tracing::info!(
                client_id = self.session.id,
                peer = ?self.session.peer_addr,
                "Streaming client added"
            );
        }

        if !self.session.is_streaming() {
            return None;
        }

        match self.subscriber.wait_next().await {
            Ok(record) => {
                let event = encode_event(&record);
                self.session.record_event(event.len());
                self.stats.record_event_sent();
                Some(event)
            }
            Err(_) => {
                self.finish(DisconnectReason::Shutdown);
                None
            }
        }
    }

    /// Turn the broadcaster into an endless body stream
    ///
    /// The stream ends only when the slot closes; otherwise it lives until
    /// the consumer drops it.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        stream::unfold(self, |mut broadcaster| async move {
            let event = broadcaster.next_event().await?;
            Some((Ok(event), broadcaster))
        })
    }

    fn finish(&mut self, reason: DisconnectReason) {
        let was_streaming = self.session.is_streaming();
        if !self.session.disconnect(reason) {
            return;
        }
        if was_streaming {
            self.stats.client_disconnected();
        }

        tracing::info!(
            client_id = self.session.id,
            peer = ?self.session.peer_addr,
            reason = %reason,
            events_sent = self.session.events_sent,
            duration_secs = self.session.duration().as_secs(),
            "Removed streaming client"
        );
    }
}

impl Drop for Broadcaster {
    fn drop(&mut self) {
        self.finish(DisconnectReason::ClientGone);
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    use super::*;
    use crate::slot::{FrameRecord, FrameSlot};

    fn record(tag: u8) -> FrameRecord {
        FrameRecord::new(Bytes::from(vec![tag; 16]), Bytes::from(vec![tag; 3]), 0.5)
    }

    fn broadcaster(id: u64, slot: &Arc<FrameSlot>, stats: &Arc<StreamStats>) -> Broadcaster {
        Broadcaster::new(
            ClientSession::new(id, None),
            slot.subscribe(),
            Arc::clone(stats),
        )
    }

    #[tokio::test]
    async fn test_emits_encoded_record() {
        let slot = Arc::new(FrameSlot::new());
        let stats = Arc::new(StreamStats::new());
        let mut b = broadcaster(1, &slot, &stats);

        slot.publish(record(1)).unwrap();
        let event = b.next_event().await.unwrap();

        assert_eq!(event, encode_event(&record(1)));
        assert_eq!(b.session().events_sent, 1);
        assert_eq!(stats.snapshot().active_clients, 1);
        assert_eq!(stats.snapshot().events_sent, 1);
    }

    #[test]
    fn test_two_clients_get_identical_events() {
        let slot = Arc::new(FrameSlot::new());
        let stats = Arc::new(StreamStats::new());
        let mut a = broadcaster(1, &slot, &stats);
        let mut b = broadcaster(2, &slot, &stats);

        let mut wait_a = task::spawn(a.next_event());
        let mut wait_b = task::spawn(b.next_event());
        assert_pending!(wait_a.poll());
        assert_pending!(wait_b.poll());

        slot.publish(record(4)).unwrap();

        let event_a = assert_ready!(wait_a.poll()).unwrap();
        let event_b = assert_ready!(wait_b.poll()).unwrap();
        assert_eq!(event_a, event_b);
    }

    #[tokio::test]
    async fn test_dropped_client_is_isolated() {
        let slot = Arc::new(FrameSlot::new());
        let stats = Arc::new(StreamStats::new());
        let mut keep = broadcaster(1, &slot, &stats).into_stream().boxed();
        let mut gone = broadcaster(2, &slot, &stats).into_stream().boxed();

        slot.publish(record(1)).unwrap();
        assert!(keep.next().await.is_some());
        assert!(gone.next().await.is_some());
        assert_eq!(stats.snapshot().active_clients, 2);

        // A failed write makes the HTTP layer drop the body stream
        drop(gone);
        assert_eq!(stats.snapshot().active_clients, 1);
        assert_eq!(slot.subscriber_count(), 1);

        slot.publish(record(2)).unwrap();
        let event = keep.next().await.unwrap().unwrap();
        assert_eq!(event, encode_event(&record(2)));
        assert!(!slot.is_closed());
    }

    #[tokio::test]
    async fn test_stream_ends_on_close() {
        let slot = Arc::new(FrameSlot::new());
        let stats = Arc::new(StreamStats::new());
        let mut events = broadcaster(1, &slot, &stats).into_stream().boxed();

        slot.publish(record(1)).unwrap();
        assert!(events.next().await.is_some());

        slot.close();
        assert!(events.next().await.is_none());
        assert_eq!(stats.snapshot().active_clients, 0);
    }

    #[tokio::test]
    async fn test_session_disconnected_after_close() {
        let slot = Arc::new(FrameSlot::new());
        let stats = Arc::new(StreamStats::new());
        let mut b = broadcaster(1, &slot, &stats);

        slot.close();
        assert!(b.next_event().await.is_none());
        assert_eq!(b.session().phase, ClientPhase::Disconnected);
        assert_eq!(b.session().disconnect_reason, Some(DisconnectReason::Shutdown));

        // Further calls stay terminal
        assert!(b.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_slow_client_skips_to_latest() {
        let slot = Arc::new(FrameSlot::new());
        let stats = Arc::new(StreamStats::new());
        let mut b = broadcaster(1, &slot, &stats);

        for tag in 1..=5 {
            slot.publish(record(tag)).unwrap();
        }

        let event = b.next_event().await.unwrap();
        assert_eq!(event, encode_event(&record(5)));
    }
}

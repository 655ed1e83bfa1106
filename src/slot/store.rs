//! Frame slot implementation
//!
//! A latest-value register with wake-all semantics. The producer is the only
//! writer; any number of [`Subscriber`]s wait for the next publish.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use super::record::FrameRecord;
use crate::error::SlotError;

/// State guarded by the slot mutex
#[derive(Debug, Default)]
struct SlotState {
    /// Most recently published record
    current: Option<FrameRecord>,
    /// Incremented on every publish
    generation: u64,
    /// Set once by `close()`; never cleared
    closed: bool,
}

/// Single-slot, latest-wins frame register
///
/// The mutex is only held to swap or clone the record, never across
/// encryption or network I/O.
#[derive(Debug, Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
    notify: Notify,
    subscribers: AtomicUsize,
}

impl FrameSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the state half-written:
    // every critical section is a plain field assignment.
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the held record and wake every waiting subscriber
    ///
    /// Returns the new generation. The previous record, read or not, is
    /// discarded.
    pub fn publish(&self, record: FrameRecord) -> Result<u64, SlotError> {
        let generation = {
            let mut state = self.lock();
            if state.closed {
                return Err(SlotError::Closed);
            }
            state.current = Some(record);
            state.generation += 1;
            state.generation
        };

        self.notify.notify_waiters();
        Ok(generation)
    }

    /// Close the slot
    ///
    /// Every pending and future `wait_next()` returns [`SlotError::Closed`].
    /// Used as the shutdown signal for all broadcasters.
    pub fn close(&self) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }

        tracing::debug!(
            subscribers = self.subscriber_count(),
            "Frame slot closed"
        );
        self.notify.notify_waiters();
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Current generation (number of successful publishes)
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Snapshot of the held record, without waiting
    pub fn current(&self) -> Option<FrameRecord> {
        self.lock().current.clone()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::Relaxed)
    }

    /// Create a subscriber
    ///
    /// The subscriber only observes records published after this call.
    pub fn subscribe(self: &Arc<Self>) -> Subscriber {
        let last_seen = self.generation();
        self.subscribers.fetch_add(1, Ordering::Relaxed);

        Subscriber {
            slot: Arc::clone(self),
            last_seen,
        }
    }
}

/// Reader handle on a [`FrameSlot`]
///
/// Tracks the last generation this reader observed.
#[derive(Debug)]
pub struct Subscriber {
    slot: Arc<FrameSlot>,
    last_seen: u64,
}

impl Subscriber {
    /// Wait until a record newer than the last one observed is published
    ///
    /// Records published while the caller was busy elsewhere are skipped;
    /// only the current one is returned.
    pub async fn wait_next(&mut self) -> Result<FrameRecord, SlotError> {
        loop {
            // Register interest before checking state so a publish between
            // the check and the await is not missed.
            let notified = self.slot.notify.notified();

            {
                let state = self.slot.lock();
                if state.closed {
                    return Err(SlotError::Closed);
                }
                if state.generation > self.last_seen {
                    if let Some(record) = state.current.as_ref() {
                        self.last_seen = state.generation;
                        return Ok(record.clone());
                    }
                }
            }

            notified.await;
        }
    }

    /// Generation of the last record returned by `wait_next()`
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// The slot this subscriber reads from
    pub fn slot(&self) -> &Arc<FrameSlot> {
        &self.slot
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.slot.subscribers.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready, assert_ready_eq};

    use super::*;

    fn record(tag: u8) -> FrameRecord {
        FrameRecord::new(
            Bytes::from(vec![tag; 16]),
            Bytes::from(vec![tag; 4]),
            f64::from(tag),
        )
    }

    #[test]
    fn test_publish_replaces() {
        let slot = FrameSlot::new();
        assert!(slot.current().is_none());

        assert_eq!(slot.publish(record(1)).unwrap(), 1);
        assert_eq!(slot.publish(record(2)).unwrap(), 2);

        assert_eq!(slot.current(), Some(record(2)));
        assert_eq!(slot.generation(), 2);
    }

    #[test]
    fn test_wait_blocks_until_publish() {
        let slot = Arc::new(FrameSlot::new());
        let mut sub = slot.subscribe();

        let mut wait = task::spawn(sub.wait_next());
        assert_pending!(wait.poll());

        slot.publish(record(7)).unwrap();
        assert!(wait.is_woken());
        assert_ready_eq!(wait.poll(), Ok(record(7)));
    }

    #[test]
    fn test_subscriber_ignores_earlier_records() {
        let slot = Arc::new(FrameSlot::new());
        slot.publish(record(1)).unwrap();

        let mut sub = slot.subscribe();
        let mut wait = task::spawn(sub.wait_next());
        assert_pending!(wait.poll());

        slot.publish(record(2)).unwrap();
        assert_ready_eq!(wait.poll(), Ok(record(2)));
    }

    #[test]
    fn test_fan_out_same_record() {
        let slot = Arc::new(FrameSlot::new());
        let mut subs: Vec<Subscriber> = (0..8).map(|_| slot.subscribe()).collect();
        assert_eq!(slot.subscriber_count(), 8);

        let mut waits: Vec<_> = subs.iter_mut().map(|s| task::spawn(s.wait_next())).collect();
        for wait in waits.iter_mut() {
            assert_pending!(wait.poll());
        }

        slot.publish(record(3)).unwrap();

        for wait in waits.iter_mut() {
            assert_ready_eq!(wait.poll(), Ok(record(3)));
        }
    }

    #[test]
    fn test_latest_wins() {
        let slot = Arc::new(FrameSlot::new());
        let mut sub = slot.subscribe();

        for tag in 1..=10 {
            slot.publish(record(tag)).unwrap();
        }

        let mut wait = task::spawn(sub.wait_next());
        assert_ready_eq!(wait.poll(), Ok(record(10)));
        drop(wait);
        assert_eq!(sub.last_seen(), 10);

        // Nothing new yet
        let mut wait = task::spawn(sub.wait_next());
        assert_pending!(wait.poll());
    }

    #[test]
    fn test_spurious_wakeup_keeps_waiting() {
        let slot = Arc::new(FrameSlot::new());
        let mut sub = slot.subscribe();

        let mut wait = task::spawn(sub.wait_next());
        assert_pending!(wait.poll());

        // Wake without publishing
        slot.notify.notify_waiters();
        assert!(wait.is_woken());
        assert_pending!(wait.poll());

        slot.publish(record(5)).unwrap();
        assert_ready_eq!(wait.poll(), Ok(record(5)));
    }

    #[test]
    fn test_close_wakes_waiters() {
        let slot = Arc::new(FrameSlot::new());
        let mut a = slot.subscribe();
        let mut b = slot.subscribe();

        let mut wait_a = task::spawn(a.wait_next());
        let mut wait_b = task::spawn(b.wait_next());
        assert_pending!(wait_a.poll());
        assert_pending!(wait_b.poll());

        slot.close();

        assert_ready_eq!(wait_a.poll(), Err(SlotError::Closed));
        assert_ready_eq!(wait_b.poll(), Err(SlotError::Closed));
        assert!(slot.is_closed());
    }

    #[test]
    fn test_publish_after_close() {
        let slot = Arc::new(FrameSlot::new());
        slot.publish(record(1)).unwrap();
        slot.close();

        assert_eq!(slot.publish(record(2)), Err(SlotError::Closed));
        assert_eq!(slot.current(), Some(record(1)));

        let mut sub = slot.subscribe();
        let mut wait = task::spawn(sub.wait_next());
        let result = assert_ready!(wait.poll());
        assert_eq!(result, Err(SlotError::Closed));
    }

    #[test]
    fn test_dropped_subscriber_does_not_affect_others() {
        let slot = Arc::new(FrameSlot::new());
        let mut keep = slot.subscribe();
        let gone = slot.subscribe();
        assert_eq!(slot.subscriber_count(), 2);

        drop(gone);
        assert_eq!(slot.subscriber_count(), 1);

        let mut wait = task::spawn(keep.wait_next());
        assert_pending!(wait.poll());
        slot.publish(record(9)).unwrap();
        assert_ready_eq!(wait.poll(), Ok(record(9)));
    }

    #[tokio::test]
    async fn test_concurrent_subscribers_across_tasks() {
        let slot = Arc::new(FrameSlot::new());
        let mut handles = Vec::new();

        for _ in 0..4 {
            let mut sub = slot.subscribe();
            handles.push(tokio::spawn(async move { sub.wait_next().await }));
        }

        slot.publish(record(11)).unwrap();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(record(11)));
        }
    }
}

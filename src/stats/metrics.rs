//! Statistics for the frame pipeline and connected clients

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Latencies are stored as whole nanoseconds so they fit in an atomic
const NANOS_PER_MS: f64 = 1_000_000.0;

/// Shortest accepted reporting interval
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// Live counters shared between the producer and all client sessions
#[derive(Debug)]
pub struct StreamStats {
    /// When the counters started
    started_at: Instant,
    /// Frames encrypted and published
    frames_published: AtomicU64,
    /// Frames dropped because encryption failed
    frames_dropped: AtomicU64,
    /// Raw frame bytes received from the source
    bytes_in: AtomicU64,
    /// Sum of encryption latencies (ns)
    total_encryption_ns: AtomicU64,
    /// Most recent encryption latency (ns)
    last_encryption_ns: AtomicU64,
    /// Currently streaming clients
    active_clients: AtomicU64,
    /// Clients ever connected to the stream endpoint
    total_clients: AtomicU64,
    /// Events written to clients
    events_sent: AtomicU64,
}

impl StreamStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_published: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            total_encryption_ns: AtomicU64::new(0),
            last_encryption_ns: AtomicU64::new(0),
            active_clients: AtomicU64::new(0),
            total_clients: AtomicU64::new(0),
            events_sent: AtomicU64::new(0),
        }
    }

    /// Record a successfully published frame
    pub fn record_published(&self, frame_len: usize, latency_ms: f64) {
        let nanos = (latency_ms.max(0.0) * NANOS_PER_MS) as u64;
        self.frames_published.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(frame_len as u64, Ordering::Relaxed);
        self.total_encryption_ns.fetch_add(nanos, Ordering::Relaxed);
        self.last_encryption_ns.store(nanos, Ordering::Relaxed);
    }

    /// Record a frame dropped by the pipeline
    pub fn record_dropped(&self, frame_len: usize) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(frame_len as u64, Ordering::Relaxed);
    }

    /// Record a client joining the stream
    pub fn client_connected(&self) {
        self.active_clients.fetch_add(1, Ordering::Relaxed);
        self.total_clients.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a client leaving the stream
    pub fn client_disconnected(&self) {
        // Saturate rather than wrap if calls are ever unbalanced
        let _ = self
            .active_clients
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record one event written to a client
    pub fn record_event_sent(&self) {
        self.events_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent-enough copy of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            total_encryption_ms: self.total_encryption_ns.load(Ordering::Relaxed) as f64
                / NANOS_PER_MS,
            last_encryption_ms: self.last_encryption_ns.load(Ordering::Relaxed) as f64
                / NANOS_PER_MS,
            active_clients: self.active_clients.load(Ordering::Relaxed),
            total_clients: self.total_clients.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
        }
    }

    /// Spawn a task that logs a snapshot every `interval`
    ///
    /// Intervals below [`MIN_REPORT_INTERVAL`] are raised to it. Returns a
    /// handle that can be used to abort the task.
    pub fn spawn_reporter(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let stats = Arc::clone(self);
        let interval = interval.max(MIN_REPORT_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snapshot = stats.snapshot();
                tracing::info!(
                    frames_published = snapshot.frames_published,
                    frames_dropped = snapshot.frames_dropped,
                    avg_encryption_ms = format!("{:.3}", snapshot.average_encryption_ms()),
                    last_encryption_ms = format!("{:.3}", snapshot.last_encryption_ms),
                    fps = format!("{:.1}", snapshot.publish_rate()),
                    active_clients = snapshot.active_clients,
                    total_clients = snapshot.total_clients,
                    "Stream stats"
                );
            }
        })
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`StreamStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    /// Time since the counters were created
    pub uptime: Duration,
    /// Frames encrypted and published
    pub frames_published: u64,
    /// Frames dropped because encryption failed
    pub frames_dropped: u64,
    /// Raw frame bytes received
    pub bytes_in: u64,
    /// Sum of encryption latencies in milliseconds
    pub total_encryption_ms: f64,
    /// Latest encryption latency in milliseconds
    pub last_encryption_ms: f64,
    /// Currently streaming clients
    pub active_clients: u64,
    /// Clients ever connected
    pub total_clients: u64,
    /// Events written to clients
    pub events_sent: u64,
}

impl StatsSnapshot {
    /// Mean encryption latency in milliseconds
    pub fn average_encryption_ms(&self) -> f64 {
        if self.frames_published > 0 {
            self.total_encryption_ms / self.frames_published as f64
        } else {
            0.0
        }
    }

    /// Published frames per second over the uptime
    pub fn publish_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.frames_published as f64 / secs
        } else {
            0.0
        }
    }
}

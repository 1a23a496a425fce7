//! Per-room coalescing of roster-snapshot broadcasts.
//!
//! Mass joins and leaves produce an update storm; this layer guarantees at
//! most one broadcast per room per window, while the final snapshot of any
//! burst is always delivered. Snapshots that arrive inside a window replace
//! the pending one and a timer flushes the survivor when the window
//! reopens.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Minimum spacing between broadcasts for one room.
pub const MIN_INTERVAL: Duration = Duration::from_millis(250);

/// Roster snapshot: `userId → userName`.
pub type Snapshot = HashMap<String, String>;

#[derive(Default)]
struct Entry {
    last_sent: Option<Instant>,
    pending: Option<Snapshot>,
    timer_armed: bool,
}

/// Coalesces `room_info` updates per room. Flushed snapshots are emitted on
/// the output channel; the consumer does the actual gateway broadcast.
pub struct RoomInfoCoalescer {
    min_interval: Duration,
    /// Entries idle longer than this are swept.
    idle_max: Duration,
    entries: Mutex<HashMap<i64, Entry>>,
    out: mpsc::Sender<(i64, Snapshot)>,
}

impl RoomInfoCoalescer {
    #[must_use]
    pub fn new(out: mpsc::Sender<(i64, Snapshot)>) -> Arc<Self> {
        Self::with_intervals(out, MIN_INTERVAL, Duration::from_secs(300))
    }

    #[must_use]
    pub fn with_intervals(
        out: mpsc::Sender<(i64, Snapshot)>,
        min_interval: Duration,
        idle_max: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            min_interval,
            idle_max,
            entries: Mutex::new(HashMap::new()),
            out,
        })
    }

    /// Offer the latest snapshot for a room. Sends immediately when the
    /// room's window is open, otherwise defers to the window boundary.
    pub async fn offer(self: Arc<Self>, room_id: i64, snapshot: Snapshot) {
        let now = Instant::now();
        let (immediate, timer) = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(room_id).or_default();

            let window_open = entry
                .last_sent
                .map_or(true, |last| now.duration_since(last) >= self.min_interval);

            if !entry.timer_armed && window_open {
                entry.last_sent = Some(now);
                (Some(snapshot), None)
            } else {
                entry.pending = Some(snapshot);
                if entry.timer_armed {
                    return;
                }
                entry.timer_armed = true;
                let elapsed = entry
                    .last_sent
                    .map_or(Duration::ZERO, |last| now.duration_since(last));
                (None, Some(self.min_interval.saturating_sub(elapsed)))
            }
        };

        if let Some(snapshot) = immediate {
            if self.out.send((room_id, snapshot)).await.is_err() {
                tracing::warn!(room_id, "room info sink closed");
            }
        }

        if let Some(wait) = timer {
            let coalescer = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(wait).await;
                coalescer.flush(room_id).await;
            });
        }
    }

    /// Timer fire: deliver whatever snapshot survived the window.
    async fn flush(self: Arc<Self>, room_id: i64) {
        let pending = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&room_id) else {
                return;
            };
            entry.timer_armed = false;
            entry.last_sent = Some(Instant::now());
            entry.pending.take()
        };

        if let Some(snapshot) = pending {
            if self.out.send((room_id, snapshot)).await.is_err() {
                tracing::warn!(room_id, "room info sink closed");
            }
        }
    }

    /// Drop entries for rooms that have been quiet for a while, so churned
    /// rooms do not leak their per-room state.
    pub async fn run_sweeper(self: Arc<Self>, shutdown: CancellationToken) {
        let period = self.idle_max / 2;
        loop {
            tokio::select! {
                () = shutdown.cancelled() => return,
                () = tokio::time::sleep(period) => {}
            }

            let now = Instant::now();
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|_, entry| {
                entry.timer_armed
                    || entry.pending.is_some()
                    || entry
                        .last_sent
                        .is_some_and(|last| now.duration_since(last) < self.idle_max)
            });
            let swept = before - entries.len();
            drop(entries);

            if swept > 0 {
                tracing::debug!(swept, "idle room info entries swept");
            }
        }
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl std::fmt::Debug for RoomInfoCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomInfoCoalescer")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(n: usize) -> Snapshot {
        (0..n).map(|i| (i.to_string(), format!("user{i}"))).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_first_plus_final() {
        let (tx, mut rx) = mpsc::channel(32);
        let coalescer = RoomInfoCoalescer::new(tx);

        // Ten joins inside 50ms.
        for i in 1..=10 {
            coalescer.clone().offer(9, snapshot(i)).await;
            tokio::time::advance(Duration::from_millis(5)).await;
        }

        // First one went out immediately.
        let (room, first) = rx.recv().await.unwrap();
        assert_eq!(room, 9);
        assert_eq!(first.len(), 1);

        // Let the window elapse; exactly the final snapshot follows.
        tokio::time::advance(MIN_INTERVAL).await;
        let (_, last) = rx.recv().await.unwrap();
        assert_eq!(last.len(), 10);

        assert!(rx.try_recv().is_err(), "no further broadcasts expected");
    }

    #[tokio::test(start_paused = true)]
    async fn window_reopens_after_min_interval() {
        let (tx, mut rx) = mpsc::channel(32);
        let coalescer = RoomInfoCoalescer::new(tx);

        coalescer.clone().offer(1, snapshot(1)).await;
        assert!(rx.recv().await.is_some());

        tokio::time::advance(MIN_INTERVAL).await;
        coalescer.clone().offer(1, snapshot(2)).await;

        // Window had reopened, so this one is immediate.
        let (_, second) = rx.recv().await.unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_keeps_only_the_latest_pending() {
        let (tx, mut rx) = mpsc::channel(32);
        let coalescer = RoomInfoCoalescer::new(tx);

        coalescer.clone().offer(5, snapshot(1)).await;
        let _ = rx.recv().await;

        coalescer.clone().offer(5, snapshot(2)).await;
        coalescer.clone().offer(5, snapshot(3)).await;
        coalescer.clone().offer(5, snapshot(4)).await;

        tokio::time::advance(MIN_INTERVAL).await;
        let (_, flushed) = rx.recv().await.unwrap();
        assert_eq!(flushed.len(), 4, "latest snapshot wins");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rooms_do_not_interfere() {
        let (tx, mut rx) = mpsc::channel(32);
        let coalescer = RoomInfoCoalescer::new(tx);

        coalescer.clone().offer(1, snapshot(1)).await;
        coalescer.clone().offer(2, snapshot(2)).await;

        let mut rooms = vec![rx.recv().await.unwrap().0, rx.recv().await.unwrap().0];
        rooms.sort_unstable();
        assert_eq!(rooms, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_idle_entries() {
        let (tx, mut rx) = mpsc::channel(32);
        let idle_max = Duration::from_secs(10);
        let coalescer = RoomInfoCoalescer::with_intervals(tx, MIN_INTERVAL, idle_max);

        coalescer.clone().offer(1, snapshot(1)).await;
        let _ = rx.recv().await;
        assert_eq!(coalescer.entry_count(), 1);

        let shutdown = CancellationToken::new();
        let sweeper = tokio::spawn(coalescer.clone().run_sweeper(shutdown.clone()));

        tokio::time::advance(idle_max * 2).await;
        tokio::task::yield_now().await;

        assert_eq!(coalescer.entry_count(), 0);
        shutdown.cancel();
        sweeper.await.unwrap();
    }
}

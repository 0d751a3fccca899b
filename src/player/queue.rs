//! The per-guild playback queue.
//!
//! One task (the session's playback loop) dequeues, any number of command
//! handlers enqueue. Internally uses an [Arc], so it's cheap to clone.

use std::collections::VecDeque;
use std::sync::Arc;

use delegate::delegate;
use rand::seq::SliceRandom;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout_at, Duration, Instant};

use super::track::Song;

/// The bounded wait in [PlaybackQueue::dequeue] ran out before a song arrived.
///
/// This is an expected condition that drives session teardown, distinct from
/// any real error.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no song arrived within the starvation bound")]
pub struct QueueStarved;

/// Ordered FIFO queue of [Song]s with a blocking dequeue.
#[derive(Debug, Default, Clone)]
pub struct PlaybackQueue {
    /// Queued songs, insertion order meaningful.
    items: Arc<Mutex<VecDeque<Song>>>,
    /// Wakes the dequeuer when a song is enqueued.
    added: Arc<Notify>,
}

impl PlaybackQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a song at the tail. Never blocks.
    pub async fn enqueue(&self, song: Song) {
        self.items.lock().await.push_back(song);
        self.added.notify_one();
    }

    /// Removes and returns the head song, suspending until one exists.
    ///
    /// If nothing arrives within `limit`, returns [QueueStarved] so the
    /// caller can decide to tear the session down.
    pub async fn dequeue(&self, limit: Duration) -> Result<Song, QueueStarved> {
        let deadline = Instant::now() + limit;
        loop {
            // Arm the notification before checking, so an enqueue racing
            // with the check can't be missed.
            let added = self.added.notified();
            if let Some(song) = self.items.lock().await.pop_front() {
                return Ok(song);
            }
            match timeout_at(deadline, added).await {
                Ok(()) => continue,
                Err(_elapsed) => return Err(QueueStarved),
            }
        }
    }

    /// Clones the songs in `[start, end)`. Out-of-range bounds are clamped.
    pub async fn snapshot_range(&self, start: usize, end: usize) -> Vec<Song> {
        let items = self.items.lock().await;
        let end = end.min(items.len());
        let start = start.min(end);
        items.iter().skip(start).take(end - start).cloned().collect()
    }

    /// Removes the song at a 0-based index.
    ///
    /// Callers are expected to bounds-check against [PlaybackQueue::len]
    /// first; out-of-range indices return `None`.
    pub async fn remove_at(&self, index: usize) -> Option<Song> {
        self.items.lock().await.remove(index)
    }

    /// Randomly permutes the remaining songs in place.
    pub async fn shuffle(&self) {
        let mut items = self.items.lock().await;
        items.make_contiguous().shuffle(&mut rand::thread_rng());
    }

    delegate! {
        to self.items.lock().await {
            /// Empties the queue. Idempotent.
            #[await(false)]
            pub async fn clear(&self);
            /// Current number of queued songs.
            #[await(false)]
            pub async fn len(&self) -> usize;
            /// Whether the queue holds no songs.
            #[await(false)]
            pub async fn is_empty(&self) -> bool;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::track::Track;

    fn song(title: &str, requester: u64) -> Song {
        Song::new(
            Track {
                title: title.to_string(),
                ..Default::default()
            },
            requester.into(),
        )
    }

    #[tokio::test]
    async fn dequeue_is_fifo() {
        let queue = PlaybackQueue::new();
        for title in ["a", "b", "c"] {
            queue.enqueue(song(title, 1)).await;
        }

        for expected in ["a", "b", "c"] {
            let got = queue.dequeue(Duration::from_secs(1)).await.unwrap();
            assert_eq!(got.title(), expected);
        }
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn dequeue_wakes_on_enqueue() {
        let queue = PlaybackQueue::new();
        let waiter = queue.clone();
        let handle =
            tokio::spawn(async move { waiter.dequeue(Duration::from_secs(5)).await });

        tokio::task::yield_now().await;
        queue.enqueue(song("late", 1)).await;

        let got = handle.await.unwrap().unwrap();
        assert_eq!(got.title(), "late");
    }

    #[tokio::test(start_paused = true)]
    async fn dequeue_times_out_starved() {
        let queue = PlaybackQueue::new();
        let out = queue.dequeue(Duration::from_secs(86400)).await;
        assert_eq!(out.unwrap_err(), QueueStarved);
    }

    #[tokio::test]
    async fn shuffle_preserves_multiset() {
        let queue = PlaybackQueue::new();
        for i in 0..20 {
            queue.enqueue(song(&format!("t{i}"), 1)).await;
        }

        let before_len = queue.len().await;
        let mut before: Vec<String> = queue
            .snapshot_range(0, usize::MAX)
            .await
            .iter()
            .map(|s| s.title().to_string())
            .collect();

        queue.shuffle().await;

        assert_eq!(queue.len().await, before_len);
        let mut after: Vec<String> = queue
            .snapshot_range(0, usize::MAX)
            .await
            .iter()
            .map(|s| s.title().to_string())
            .collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn remove_at_removes_exactly_one() {
        let queue = PlaybackQueue::new();
        for title in ["a", "b", "c"] {
            queue.enqueue(song(title, 1)).await;
        }

        let removed = queue.remove_at(1).await.unwrap();
        assert_eq!(removed.title(), "b");
        assert_eq!(queue.len().await, 2);

        let rest: Vec<String> = queue
            .snapshot_range(0, 10)
            .await
            .iter()
            .map(|s| s.title().to_string())
            .collect();
        assert_eq!(rest, ["a", "c"]);

        assert!(queue.remove_at(10).await.is_none());
    }

    #[tokio::test]
    async fn snapshot_range_clamps() {
        let queue = PlaybackQueue::new();
        for title in ["a", "b"] {
            queue.enqueue(song(title, 1)).await;
        }

        assert_eq!(queue.snapshot_range(1, 50).await.len(), 1);
        assert!(queue.snapshot_range(5, 9).await.is_empty());
        assert!(queue.snapshot_range(2, 1).await.is_empty());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let queue = PlaybackQueue::new();
        queue.enqueue(song("a", 1)).await;
        queue.clear().await;
        queue.clear().await;
        assert!(queue.is_empty().await);
    }
}

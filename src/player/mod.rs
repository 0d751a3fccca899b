//! The playback engine: queue, per-guild session state machine, registry,
//! and the seams to the voice driver and the reply surface.

pub mod announce;
pub mod queue;
pub mod registry;
pub mod session;
pub mod track;
pub mod transport;

use std::time::Duration;

pub use announce::{Announcer, ChannelAnnouncer};
pub use queue::PlaybackQueue;
pub use registry::SessionRegistry;
pub use session::{GuildSession, Phase, SkipOutcome};
pub use track::{Song, Track};
pub use transport::{CallTransport, VoiceTransport};

/// Tunables shared by every session, read from the `[playback]` config
/// section.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSettings {
    /// Volume fraction new sessions start with.
    pub default_volume: f32,
    /// Non-requester votes needed to skip a song.
    pub skip_threshold: usize,
    /// How long an idle session may wait for a song before it leaves.
    pub starvation_timeout: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            default_volume: 0.5,
            skip_threshold: 1,
            // One day; avoids holding a voice connection forever when
            // abandoned.
            starvation_timeout: Duration::from_secs(86400),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test doubles for the session state machine.

    use std::sync::{Arc, Mutex as StdMutex};

    use async_trait::async_trait;
    use tokio::sync::{oneshot, Notify};

    use crate::error::PlaybackError;

    use super::announce::Announcer;
    use super::track::{Song, Track};
    use super::transport::VoiceTransport;

    /// A song with just a title and requester.
    pub fn song(title: &str, requester: u64) -> Song {
        Song::new(
            Track {
                title: title.to_string(),
                ..Default::default()
            },
            requester.into(),
        )
    }

    #[derive(Default)]
    struct MockState {
        played: Vec<(String, f32)>,
        finish: Option<oneshot::Sender<Result<(), PlaybackError>>>,
        paused: bool,
        stops: usize,
        disconnects: usize,
    }

    /// Scripted [VoiceTransport]. In manual mode `play` blocks until the
    /// test finishes or fails the current track.
    pub struct MockTransport {
        manual: bool,
        state: StdMutex<MockState>,
        started: Notify,
    }

    impl MockTransport {
        /// Transport whose tracks must be finished explicitly.
        pub fn manual() -> Arc<Self> {
            Arc::new(Self {
                manual: true,
                state: StdMutex::new(MockState::default()),
                started: Notify::new(),
            })
        }

        /// Waits until the next `play` call has begun.
        pub async fn started(&self) {
            self.started.notified().await
        }

        /// `(title, volume)` pairs in playback order.
        pub fn played(&self) -> Vec<(String, f32)> {
            self.state.lock().unwrap().played.clone()
        }

        /// Lets the current track complete naturally.
        pub fn finish_current(&self) {
            if let Some(tx) = self.state.lock().unwrap().finish.take() {
                let _ = tx.send(Ok(()));
            }
        }

        /// Makes the current track end with a driver error.
        pub fn fail_current(&self, why: &str) {
            if let Some(tx) = self.state.lock().unwrap().finish.take() {
                let _ = tx.send(Err(PlaybackError::Driver(why.to_string())));
            }
        }

        /// Whether the transport is paused.
        pub fn paused(&self) -> bool {
            self.state.lock().unwrap().paused
        }

        /// Number of disconnect calls seen.
        pub fn disconnects(&self) -> usize {
            self.state.lock().unwrap().disconnects
        }
    }

    #[async_trait]
    impl VoiceTransport for MockTransport {
        async fn play(&self, song: &Song, volume: f32) -> Result<(), PlaybackError> {
            let rx = {
                let mut state = self.state.lock().unwrap();
                state.played.push((song.title().to_string(), volume));
                if self.manual {
                    let (tx, rx) = oneshot::channel();
                    state.finish = Some(tx);
                    Some(rx)
                } else {
                    None
                }
            };
            self.started.notify_one();

            match rx {
                Some(rx) => rx.await.unwrap_or(Ok(())),
                None => Ok(()),
            }
        }

        async fn stop(&self) {
            let tx = {
                let mut state = self.state.lock().unwrap();
                state.stops += 1;
                state.finish.take()
            };
            if let Some(tx) = tx {
                let _ = tx.send(Ok(()));
            }
        }

        async fn pause(&self) -> Result<(), PlaybackError> {
            self.state.lock().unwrap().paused = true;
            Ok(())
        }

        async fn resume(&self) -> Result<(), PlaybackError> {
            self.state.lock().unwrap().paused = false;
            Ok(())
        }

        async fn disconnect(&self) {
            self.state.lock().unwrap().disconnects += 1;
        }
    }

    /// [Announcer] that records announced titles.
    #[derive(Default)]
    pub struct RecordingAnnouncer {
        titles: StdMutex<Vec<String>>,
    }

    impl RecordingAnnouncer {
        /// Titles announced so far.
        pub fn announced(&self) -> Vec<String> {
            self.titles.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Announcer for RecordingAnnouncer {
        async fn now_playing(&self, song: &Song) {
            self.titles.lock().unwrap().push(song.title().to_string());
        }
    }
}

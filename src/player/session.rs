//! The per-guild voice playback state machine.
//!
//! One [GuildSession] exists per guild (enforced by the
//! [registry](super::registry::SessionRegistry)). It owns the playback
//! queue and a background loop task that pulls songs off the queue and
//! feeds them to the [VoiceTransport]. Command handlers talk to the
//! session through its methods; the loop is the only dequeuer.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use poise::serenity_prelude as serenity;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::error::{MagpieError, UserError};

use super::announce::Announcer;
use super::queue::{PlaybackQueue, QueueStarved};
use super::track::Song;
use super::transport::VoiceTransport;
use super::PlayerSettings;

/// Where the playback loop currently is.
///
/// Pause is not a phase: the transport owns the paused flag and the session
/// only forwards pause/resume calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Blocked on the queue, nothing playing.
    Waiting,
    /// A song is streaming.
    Playing,
    /// Terminal. The loop ended and the transport disconnected.
    Stopped,
}

/// Result of a `/skip` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The current song was skipped.
    Skipped,
    /// A vote was counted but the threshold isn't reached yet.
    VoteAdded {
        /// Votes so far.
        votes: usize,
        /// Votes required.
        needed: usize,
    },
    /// This user already voted for the current song.
    AlreadyVoted {
        /// Votes so far.
        votes: usize,
        /// Votes required.
        needed: usize,
    },
}

/// Session state mutated by both the loop and command handlers.
#[derive(Debug)]
struct Shared {
    /// The song currently in the "playing" slot.
    current: Option<Song>,
    /// When set, the loop replays `current` instead of dequeuing.
    looping: bool,
    /// Volume fraction in `[0, 1]`, applied to each new source.
    volume: f32,
    /// Deduplicated skip votes for the current song.
    skip_votes: HashSet<serenity::UserId>,
    /// See [Phase].
    phase: Phase,
}

/// Per-guild playback state machine. See the module docs.
pub struct GuildSession {
    /// The guild this session belongs to.
    guild_id: serenity::GuildId,
    /// Songs waiting to play.
    queue: PlaybackQueue,
    /// Mutable state shared between the loop and command handlers.
    shared: Mutex<Shared>,
    /// The live voice connection.
    transport: Arc<dyn VoiceTransport>,
    /// Where "now playing" goes.
    announcer: Arc<dyn Announcer>,
    /// Skip threshold, starvation bound, default volume.
    settings: PlayerSettings,
    /// Cancels the loop at its next suspension point. Cancelled is the
    /// session's terminal marker.
    cancel: CancellationToken,
    /// Handle of the playback loop task.
    loop_task: StdMutex<Option<JoinHandle<()>>>,
}

impl GuildSession {
    /// Creates the session and starts its playback loop, which immediately
    /// enters [Phase::Waiting].
    pub fn spawn(
        guild_id: serenity::GuildId,
        transport: Arc<dyn VoiceTransport>,
        announcer: Arc<dyn Announcer>,
        settings: PlayerSettings,
    ) -> Arc<Self> {
        let session = Arc::new(Self {
            guild_id,
            queue: PlaybackQueue::new(),
            shared: Mutex::new(Shared {
                current: None,
                looping: false,
                volume: settings.default_volume,
                skip_votes: HashSet::new(),
                phase: Phase::Waiting,
            }),
            transport,
            announcer,
            settings,
            cancel: CancellationToken::new(),
            loop_task: StdMutex::new(None),
        });

        let task = tokio::spawn(Self::playback_loop(session.clone()));
        *session.loop_task.lock().expect("loop task lock poisoned") = Some(task);

        session
    }

    /// The background task driving this session.
    ///
    /// Cancellation is observed at the suspension points (the dequeue and
    /// the wait for the current song to finish), never mid-callback.
    async fn playback_loop(self: Arc<Self>) {
        info!(guild = %self.guild_id, "Playback loop started.");

        loop {
            // With the loop flag set the dequeue step is skipped entirely
            // and the previous song replays.
            let replay = {
                let shared = self.shared.lock().await;
                if shared.looping {
                    shared.current.clone()
                } else {
                    None
                }
            };

            let song = match replay {
                Some(song) => song,
                None => {
                    let next = self.queue.dequeue(self.settings.starvation_timeout);
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        dequeued = next => match dequeued {
                            Ok(song) => song,
                            Err(QueueStarved) => {
                                // Expected teardown path, not an error.
                                info!(
                                    guild = %self.guild_id,
                                    "No song within the starvation bound, leaving voice."
                                );
                                self.teardown().await;
                                break;
                            }
                        },
                    }
                }
            };

            let volume = {
                let mut shared = self.shared.lock().await;
                shared.skip_votes.clear();
                shared.current = Some(song.clone());
                shared.phase = Phase::Playing;
                shared.volume
            };

            self.announcer.now_playing(&song).await;

            let played = tokio::select! {
                _ = self.cancel.cancelled() => break,
                outcome = self.transport.play(&song, volume) => outcome,
            };
            if let Err(why) = played {
                // Fatal for this song, not for the session.
                error!(
                    guild = %self.guild_id,
                    "Playback of '{}' failed: {why}",
                    song.title()
                );
            }

            if self.cancel.is_cancelled() {
                break;
            }
            let mut shared = self.shared.lock().await;
            shared.phase = Phase::Waiting;
            if !shared.looping {
                shared.current = None;
            }
        }

        info!(guild = %self.guild_id, "Playback loop ended.");
    }

    /// Shared teardown for explicit stops and queue starvation.
    /// Every step is idempotent.
    async fn teardown(&self) {
        self.cancel.cancel();
        self.queue.clear().await;
        {
            let mut shared = self.shared.lock().await;
            shared.phase = Phase::Stopped;
            shared.current = None;
            shared.skip_votes.clear();
        }
        self.transport.stop().await;
        self.transport.disconnect().await;
    }

    /// Stops the session: clears the queue, disconnects, cancels the loop
    /// and waits for it to wind down. Safe to call repeatedly and safe to
    /// call while the loop is suspended.
    #[instrument(skip(self), fields(guild = %self.guild_id))]
    pub async fn stop(&self) {
        self.teardown().await;

        let task = self.loop_task.lock().expect("loop task lock poisoned").take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Vote to skip the current song.
    ///
    /// The requester of the current song always force-skips; other users
    /// cast one deduplicated vote each until the configured threshold.
    pub async fn skip(&self, voter: serenity::UserId) -> Result<SkipOutcome, UserError> {
        let needed = self.settings.skip_threshold;

        let mut shared = self.shared.lock().await;
        let current = shared.current.as_ref().ok_or(UserError::NothingPlaying)?;
        let force = current.requester == voter;

        if !force {
            if !shared.skip_votes.insert(voter) {
                return Ok(SkipOutcome::AlreadyVoted {
                    votes: shared.skip_votes.len(),
                    needed,
                });
            }
            if shared.skip_votes.len() < needed {
                return Ok(SkipOutcome::VoteAdded {
                    votes: shared.skip_votes.len(),
                    needed,
                });
            }
        }

        shared.skip_votes.clear();
        drop(shared);

        // Stopping the transport resolves the loop's play await, which
        // drives the Playing -> Waiting transition.
        self.transport.stop().await;
        Ok(SkipOutcome::Skipped)
    }

    /// Forwards a pause to the transport.
    pub async fn pause(&self) -> Result<(), MagpieError> {
        self.require_current().await?;
        Ok(self.transport.pause().await?)
    }

    /// Forwards a resume to the transport.
    pub async fn resume(&self) -> Result<(), MagpieError> {
        self.require_current().await?;
        Ok(self.transport.resume().await?)
    }

    /// Errors with [UserError::NothingPlaying] unless a song is current.
    async fn require_current(&self) -> Result<(), UserError> {
        match self.shared.lock().await.current {
            Some(_) => Ok(()),
            None => Err(UserError::NothingPlaying),
        }
    }

    /// The song currently playing, if any.
    pub async fn current(&self) -> Option<Song> {
        self.shared.lock().await.current.clone()
    }

    /// Stored volume fraction in `[0, 1]`.
    pub async fn volume(&self) -> f32 {
        self.shared.lock().await.volume
    }

    /// Stores a new volume fraction. Callers validate the `[0, 1]` range;
    /// it applies to the next source that starts.
    pub async fn set_volume(&self, fraction: f32) {
        self.shared.lock().await.volume = fraction;
    }

    /// Flips the loop flag, returning the new value.
    pub async fn toggle_looping(&self) -> bool {
        let mut shared = self.shared.lock().await;
        shared.looping = !shared.looping;
        shared.looping
    }

    /// Current [Phase].
    pub async fn phase(&self) -> Phase {
        self.shared.lock().await.phase
    }

    /// Whether this session reached its terminal state.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the session is stopping, for shutdown coordination.
    pub async fn wait_until_stopped(&self) {
        self.cancel.cancelled().await
    }

    /// The guild this session serves.
    pub fn guild_id(&self) -> serenity::GuildId {
        self.guild_id
    }

    /// The session's queue. Enqueuing is done directly on it.
    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::player::testing::{song, MockTransport, RecordingAnnouncer};

    fn test_settings() -> PlayerSettings {
        PlayerSettings {
            starvation_timeout: Duration::from_secs(600),
            ..PlayerSettings::default()
        }
    }

    fn spawn_manual(settings: PlayerSettings) -> (Arc<GuildSession>, Arc<MockTransport>, Arc<RecordingAnnouncer>) {
        let transport = MockTransport::manual();
        let announcer = Arc::new(RecordingAnnouncer::default());
        let session = GuildSession::spawn(
            serenity::GuildId::new(1),
            transport.clone(),
            announcer.clone(),
            settings,
        );
        (session, transport, announcer)
    }

    #[tokio::test]
    async fn plays_queued_songs_in_fifo_order() {
        let (session, transport, announcer) = spawn_manual(test_settings());

        session.queue().enqueue(song("a", 1)).await;
        session.queue().enqueue(song("b", 2)).await;
        session.queue().enqueue(song("c", 3)).await;

        transport.started().await;
        assert_eq!(session.phase().await, Phase::Playing);
        let current = session.current().await.unwrap();
        assert_eq!(current.title(), "a");
        assert_eq!(current.requester, serenity::UserId::new(1));

        transport.finish_current();
        transport.started().await;
        assert_eq!(session.current().await.unwrap().title(), "b");

        assert_eq!(announcer.announced(), ["a", "b"]);
        session.stop().await;
    }

    #[tokio::test]
    async fn requester_always_force_skips() {
        let (session, transport, _) = spawn_manual(PlayerSettings {
            skip_threshold: 50,
            ..test_settings()
        });

        session.queue().enqueue(song("a", 7)).await;
        session.queue().enqueue(song("b", 8)).await;
        transport.started().await;

        let outcome = session.skip(serenity::UserId::new(7)).await.unwrap();
        assert_eq!(outcome, SkipOutcome::Skipped);

        transport.started().await;
        assert_eq!(session.current().await.unwrap().title(), "b");
        session.stop().await;
    }

    #[tokio::test]
    async fn skip_votes_are_deduplicated() {
        let (session, transport, _) = spawn_manual(PlayerSettings {
            skip_threshold: 2,
            ..test_settings()
        });

        session.queue().enqueue(song("a", 7)).await;
        transport.started().await;

        let first = session.skip(serenity::UserId::new(9)).await.unwrap();
        assert_eq!(first, SkipOutcome::VoteAdded { votes: 1, needed: 2 });

        // Same user again: tally stays at 1.
        let second = session.skip(serenity::UserId::new(9)).await.unwrap();
        assert_eq!(second, SkipOutcome::AlreadyVoted { votes: 1, needed: 2 });

        assert_eq!(session.current().await.unwrap().title(), "a");
        session.stop().await;
    }

    #[tokio::test]
    async fn skip_threshold_of_one_skips_on_first_foreign_vote() {
        let (session, transport, _) = spawn_manual(test_settings());

        session.queue().enqueue(song("a", 7)).await;
        session.queue().enqueue(song("b", 7)).await;
        transport.started().await;

        let outcome = session.skip(serenity::UserId::new(9)).await.unwrap();
        assert_eq!(outcome, SkipOutcome::Skipped);

        transport.started().await;
        assert_eq!(session.current().await.unwrap().title(), "b");
        session.stop().await;
    }

    #[tokio::test]
    async fn skip_with_nothing_playing_is_a_user_error() {
        let (session, _, _) = spawn_manual(test_settings());
        let err = session.skip(serenity::UserId::new(9)).await.unwrap_err();
        assert!(matches!(err, UserError::NothingPlaying));
        session.stop().await;
    }

    #[tokio::test]
    async fn loop_flag_replays_current_without_dequeuing() {
        let (session, transport, _) = spawn_manual(test_settings());

        session.queue().enqueue(song("a", 1)).await;
        session.queue().enqueue(song("b", 2)).await;
        transport.started().await;

        assert!(session.toggle_looping().await);
        transport.finish_current();
        transport.started().await;

        // Replayed the same song, "b" stayed queued.
        assert_eq!(session.current().await.unwrap().title(), "a");
        assert_eq!(session.queue().len().await, 1);

        assert!(!session.toggle_looping().await);
        transport.finish_current();
        transport.started().await;
        assert_eq!(session.current().await.unwrap().title(), "b");
        session.stop().await;
    }

    #[tokio::test]
    async fn volume_is_applied_to_the_new_source() {
        let (session, transport, _) = spawn_manual(test_settings());

        session.set_volume(0.07).await;
        session.queue().enqueue(song("a", 1)).await;
        transport.started().await;

        let played = transport.played();
        assert_eq!(played, [("a".to_string(), 0.07)]);
        session.stop().await;
    }

    #[tokio::test]
    async fn playback_error_does_not_kill_the_session() {
        let (session, transport, _) = spawn_manual(test_settings());

        session.queue().enqueue(song("a", 1)).await;
        session.queue().enqueue(song("b", 1)).await;
        transport.started().await;

        transport.fail_current("stream collapsed");
        transport.started().await;

        assert!(!session.is_stopped());
        assert_eq!(session.current().await.unwrap().title(), "b");
        session.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (session, transport, _) = spawn_manual(test_settings());

        session.queue().enqueue(song("a", 1)).await;
        transport.started().await;

        session.stop().await;
        session.stop().await;

        assert!(session.is_stopped());
        assert_eq!(session.phase().await, Phase::Stopped);
        assert!(session.queue().is_empty().await);
        assert!(session.current().await.is_none());
        assert!(transport.disconnects() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn starved_session_stops_itself() {
        let (session, transport, _) = spawn_manual(PlayerSettings {
            starvation_timeout: Duration::from_secs(86400),
            ..PlayerSettings::default()
        });

        session.wait_until_stopped().await;

        assert!(session.is_stopped());
        assert_eq!(session.phase().await, Phase::Stopped);
        assert_eq!(transport.disconnects(), 1);
    }
}

//! The voice transport seam between the playback state machine and songbird.
//!
//! The session only ever needs five operations, so they live behind a trait
//! and the state machine can be driven by a fake in tests.

use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use songbird::input::HttpRequest;
use songbird::tracks::{PlayMode, Track as DriverTrack, TrackHandle};
use songbird::{Event, EventContext, EventHandler, TrackEvent};
use tokio::sync::{oneshot, Mutex};

use crate::error::PlaybackError;

use super::track::Song;

/// Convenience type alias for [songbird::Call].
pub type CallRef = Arc<Mutex<songbird::Call>>;

/// What a session needs from a live voice connection.
#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    /// Streams the song at the given volume and resolves when playback
    /// finishes naturally, is stopped, or errors.
    async fn play(&self, song: &Song, volume: f32) -> Result<(), PlaybackError>;

    /// Stops the active playback, if any. This makes a pending
    /// [play](VoiceTransport::play) resolve.
    async fn stop(&self);

    /// Pauses the active playback. The transport owns the paused flag.
    async fn pause(&self) -> Result<(), PlaybackError>;

    /// Resumes a paused playback.
    async fn resume(&self) -> Result<(), PlaybackError>;

    /// Leaves the voice channel. Safe to call when already disconnected.
    async fn disconnect(&self);
}

/// [VoiceTransport] backed by a songbird [Call].
pub struct CallTransport {
    /// The guild's voice call.
    call: CallRef,
    /// Client used to stream the track's source url.
    client: reqwest::Client,
    /// Handle of the currently playing track.
    active: StdMutex<Option<TrackHandle>>,
}

impl CallTransport {
    /// Wraps an established call.
    pub fn new(call: CallRef, client: reqwest::Client) -> Self {
        Self {
            call,
            client,
            active: StdMutex::new(None),
        }
    }

    /// Stores or clears the active track handle.
    fn set_active(&self, handle: Option<TrackHandle>) {
        *self.active.lock().expect("active handle lock poisoned") = handle;
    }

    /// Clones the active track handle, if a track is playing.
    fn active(&self) -> Option<TrackHandle> {
        self.active.lock().expect("active handle lock poisoned").clone()
    }
}

#[async_trait]
impl VoiceTransport for CallTransport {
    async fn play(&self, song: &Song, volume: f32) -> Result<(), PlaybackError> {
        let source = HttpRequest::new(self.client.clone(), song.track.stream_url.clone());
        // Volume is applied to the new source before playback starts.
        let track = DriverTrack::new(source.into()).volume(volume);

        let (tx, rx) = oneshot::channel();
        let signal = Arc::new(StdMutex::new(Some(tx)));

        let handle = self.call.lock().await.play(track);
        handle.add_event(
            Event::Track(TrackEvent::End),
            TrackDone {
                signal: signal.clone(),
            },
        )?;
        handle.add_event(Event::Track(TrackEvent::Error), TrackDone { signal })?;
        self.set_active(Some(handle));

        // If the driver goes away without firing either event, treat the
        // track as ended.
        let outcome = rx.await.unwrap_or(Ok(()));
        self.set_active(None);
        outcome
    }

    async fn stop(&self) {
        if let Some(handle) = self.active() {
            // A failed stop means the track already ended.
            let _ = handle.stop();
        }
    }

    async fn pause(&self) -> Result<(), PlaybackError> {
        match self.active() {
            Some(handle) => Ok(handle.pause()?),
            None => Ok(()),
        }
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        match self.active() {
            Some(handle) => Ok(handle.play()?),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) {
        // Ignore the error when we're already out of the channel.
        let _ = self.call.lock().await.leave().await;
    }
}

/// Signals the end of a track back to [CallTransport::play].
///
/// Registered for both [TrackEvent::End] and [TrackEvent::Error]; whichever
/// fires first consumes the sender.
struct TrackDone {
    /// Shared one-shot sender, taken on first fire.
    signal: Arc<StdMutex<Option<oneshot::Sender<Result<(), PlaybackError>>>>>,
}

#[async_trait]
impl EventHandler for TrackDone {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let outcome = match ctx {
            EventContext::Track([(state, _handle), ..]) => match &state.playing {
                PlayMode::Errored(why) => Err(PlaybackError::Driver(why.to_string())),
                _ => Ok(()),
            },
            _ => Ok(()),
        };

        if let Ok(mut slot) = self.signal.lock() {
            if let Some(tx) = slot.take() {
                let _ = tx.send(outcome);
            }
        }

        Some(Event::Cancel)
    }
}

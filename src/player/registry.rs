//! Maps guilds to their playback sessions.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use poise::serenity_prelude as serenity;
use tokio::sync::Mutex;
use tracing::info;

use super::session::GuildSession;

/// Guild id keyed storage of [GuildSession]s, at most one live session per
/// guild. Shared by all command invocations.
#[derive(Default)]
pub struct SessionRegistry {
    /// The sessions. The mutex serializes creation and removal.
    inner: Mutex<HashMap<serenity::GuildId, Arc<GuildSession>>>,
}

impl SessionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The live session for a guild.
    ///
    /// Sessions that stopped on their own (queue starvation) are purged
    /// here, so callers never see a dead session.
    pub async fn get(&self, guild_id: serenity::GuildId) -> Option<Arc<GuildSession>> {
        let mut map = self.inner.lock().await;
        match map.get(&guild_id) {
            Some(session) if session.is_stopped() => {
                map.remove(&guild_id);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    /// Returns the live session for a guild, or atomically registers the
    /// one produced by `create`.
    pub async fn get_or_create<F>(&self, guild_id: serenity::GuildId, create: F) -> Arc<GuildSession>
    where
        F: FnOnce() -> Arc<GuildSession>,
    {
        let mut map = self.inner.lock().await;
        match map.get(&guild_id) {
            Some(session) if !session.is_stopped() => session.clone(),
            _ => {
                info!("Creating playback session for guild {guild_id}.");
                let session = create();
                map.insert(guild_id, session.clone());
                session
            }
        }
    }

    /// Stops and drops the session for a guild, so no orphaned playback
    /// loop survives eviction. A missing session is fine.
    pub async fn remove(&self, guild_id: serenity::GuildId) {
        let session = self.inner.lock().await.remove(&guild_id);
        if let Some(session) = session {
            session.stop().await;
        }
    }

    /// Stops every session. Used for process shutdown.
    pub async fn shutdown_all(&self) {
        let sessions: Vec<_> = {
            let mut map = self.inner.lock().await;
            map.drain().map(|(_, session)| session).collect()
        };

        if !sessions.is_empty() {
            info!("Stopping {} playback session(s).", sessions.len());
        }
        join_all(sessions.iter().map(|session| session.stop())).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::player::testing::{MockTransport, RecordingAnnouncer};
    use crate::player::PlayerSettings;

    fn make_session(guild: u64, settings: PlayerSettings) -> Arc<GuildSession> {
        GuildSession::spawn(
            serenity::GuildId::new(guild),
            MockTransport::manual(),
            Arc::new(RecordingAnnouncer::default()),
            settings,
        )
    }

    fn long_wait() -> PlayerSettings {
        PlayerSettings {
            starvation_timeout: Duration::from_secs(3600),
            ..PlayerSettings::default()
        }
    }

    #[tokio::test]
    async fn get_or_create_is_one_session_per_guild() {
        let registry = SessionRegistry::new();
        let guild = serenity::GuildId::new(5);

        let first = registry
            .get_or_create(guild, || make_session(5, long_wait()))
            .await;
        let second = registry
            .get_or_create(guild, || panic!("must reuse the existing session"))
            .await;

        assert!(Arc::ptr_eq(&first, &second));
        registry.shutdown_all().await;
    }

    #[tokio::test]
    async fn remove_stops_the_session() {
        let registry = SessionRegistry::new();
        let guild = serenity::GuildId::new(5);

        let session = registry
            .get_or_create(guild, || make_session(5, long_wait()))
            .await;
        registry.remove(guild).await;

        assert!(session.is_stopped());
        assert!(registry.get(guild).await.is_none());
    }

    #[tokio::test]
    async fn removing_an_unknown_guild_is_fine() {
        let registry = SessionRegistry::new();
        registry.remove(serenity::GuildId::new(404)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn starved_session_is_no_longer_returned() {
        let registry = SessionRegistry::new();
        let guild = serenity::GuildId::new(5);

        let session = registry
            .get_or_create(guild, || {
                make_session(
                    5,
                    PlayerSettings {
                        starvation_timeout: Duration::from_secs(86400),
                        ..PlayerSettings::default()
                    },
                )
            })
            .await;

        session.wait_until_stopped().await;
        assert!(registry.get(guild).await.is_none());

        // A later lookup may lazily create a fresh session.
        let fresh = registry
            .get_or_create(guild, || make_session(5, long_wait()))
            .await;
        assert!(!fresh.is_stopped());
        registry.shutdown_all().await;
    }

    #[tokio::test]
    async fn shutdown_all_stops_everything() {
        let registry = SessionRegistry::new();
        let a = registry
            .get_or_create(serenity::GuildId::new(1), || make_session(1, long_wait()))
            .await;
        let b = registry
            .get_or_create(serenity::GuildId::new(2), || make_session(2, long_wait()))
            .await;

        registry.shutdown_all().await;

        assert!(a.is_stopped());
        assert!(b.is_stopped());
        assert!(registry.get(serenity::GuildId::new(1)).await.is_none());
    }
}

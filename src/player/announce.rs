//! "Now playing" announcements from the playback loop.

use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::{CreateEmbed, CreateMessage};

use super::track::Song;

/// Where the playback loop reports that a new song started.
#[async_trait]
pub trait Announcer: Send + Sync + 'static {
    /// Called as a side effect of a song starting. Failures are the
    /// announcer's problem, playback never depends on them.
    async fn now_playing(&self, song: &Song);
}

/// Announces into the text channel the session was created from.
pub struct ChannelAnnouncer {
    /// Discord HTTP handle.
    http: Arc<serenity::Http>,
    /// Target text channel.
    channel: serenity::ChannelId,
}

impl ChannelAnnouncer {
    /// Announcer for the given channel.
    pub fn new(http: Arc<serenity::Http>, channel: serenity::ChannelId) -> Self {
        Self { http, channel }
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn now_playing(&self, song: &Song) {
        let message = CreateMessage::new().embed(now_playing_embed(song));
        if let Err(why) = self.channel.send_message(&self.http, message).await {
            tracing::warn!("Failed to announce '{}': {why}", song.title());
        }
    }
}

/// The embed shown when a song starts and for `/now_playing`.
pub fn now_playing_embed(song: &Song) -> CreateEmbed {
    let track = &song.track;

    let uploader = match &track.uploader_url {
        Some(url) => format!("[{}]({url})", track.uploader),
        None => track.uploader.clone(),
    };

    let mut embed = CreateEmbed::new()
        .title("Now playing")
        .description(format!("```css\n{}\n```", track.title))
        .field("Duration", track.duration(), true)
        .field("Requested by", format!("<@{}>", song.requester), true)
        .field("Uploader", uploader, true)
        .field("URL", format!("[Click]({})", track.url), true);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
}

//! Voice connection plumbing shared by the commands.
//!
//! Commands never talk to songbird directly; they go through here to join
//! channels and to look up (or lazily create) the guild's [GuildSession].

use std::sync::Arc;

use tracing::instrument;

use crate::data::GetData;
use crate::error::{MagpieError, UserError};
use crate::player::transport::CallRef;
use crate::player::{CallTransport, ChannelAnnouncer, GuildSession};
use crate::serenity;
use crate::Context;

type Manager = Arc<songbird::Songbird>;

/// Gets the voice manager registered at setup.
pub async fn get_manager(ctx: &Context<'_>) -> Result<Manager, MagpieError> {
    songbird::get(ctx.serenity_context())
        .await
        .ok_or(MagpieError::MissingFromSetup {
            reason: "Expected a songbird voice manager.".to_string(),
        })
}

/// The guild and voice channel the invoking user is in.
fn author_channel(
    ctx: &Context<'_>,
) -> Result<(serenity::GuildId, serenity::ChannelId), MagpieError> {
    let author = ctx.author();
    // The guard can't be held across an await, clone what we need.
    let (guild_id, voice_states) = match ctx.guild() {
        Some(guild) => (guild.id, guild.voice_states.clone()),
        None => return Err(UserError::GuildOnly.into()),
    };

    let channel_id = voice_states
        .get(&author.id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or(UserError::NotInVoice)?;

    Ok((guild_id, channel_id))
}

/// Joins (or moves to) the given voice channel.
#[instrument(skip(ctx))]
pub async fn join_channel(
    ctx: &Context<'_>,
    guild_id: serenity::GuildId,
    channel_id: serenity::ChannelId,
) -> Result<CallRef, MagpieError> {
    let manager = get_manager(ctx).await?;
    let call = manager.join(guild_id, channel_id).await?;
    Ok(call)
}

/// Joins (or moves to) the invoking user's voice channel.
pub async fn join_author(
    ctx: &Context<'_>,
) -> Result<(serenity::GuildId, CallRef), MagpieError> {
    let (guild_id, channel_id) = author_channel(ctx)?;
    let call = join_channel(ctx, guild_id, channel_id).await?;
    Ok((guild_id, call))
}

/// The guild's live session. Errors if there is none.
pub async fn session(ctx: &Context<'_>) -> Result<Arc<GuildSession>, MagpieError> {
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    ctx.data()
        .registry
        .get(guild_id)
        .await
        .ok_or_else(|| UserError::NotConnected.into())
}

/// Registers a session backed by the given call, or returns the live one.
///
/// Announcements go to the text channel the creating command was invoked
/// in.
pub async fn ensure_session(
    ctx: &Context<'_>,
    guild_id: serenity::GuildId,
    call: CallRef,
) -> Arc<GuildSession> {
    let client = ctx.http_client().await;
    let http = ctx.serenity_context().http.clone();
    let text_channel = ctx.channel_id();
    let settings = ctx.data().settings;

    ctx.data()
        .registry
        .get_or_create(guild_id, || {
            GuildSession::spawn(
                guild_id,
                Arc::new(CallTransport::new(call, client)),
                Arc::new(ChannelAnnouncer::new(http, text_channel)),
                settings,
            )
        })
        .await
}

/// The guild's live session, joining the invoking user's channel and
/// creating one when there is none yet.
pub async fn obtain_session(ctx: &Context<'_>) -> Result<Arc<GuildSession>, MagpieError> {
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    if let Some(session) = ctx.data().registry.get(guild_id).await {
        return Ok(session);
    }

    let (guild_id, call) = join_author(ctx).await?;
    Ok(ensure_session(ctx, guild_id, call).await)
}

use tracing::instrument;

use crate::call;
use crate::error::UserError;
use crate::serenity;
use crate::{Context, MagpieError};

/// Joins your voice channel.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn join(ctx: Context<'_>) -> Result<(), MagpieError> {
    let (guild_id, call) = call::join_author(&ctx).await?;
    call::ensure_session(&ctx, guild_id, call).await;

    ctx.reply("Joining your channel.").await?;
    Ok(())
}

/// Moves the bot to the given voice channel.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn move_to(
    ctx: Context<'_>,
    #[description = "The voice channel to move to"]
    #[channel_types("Voice")]
    channel: serenity::GuildChannel,
) -> Result<(), MagpieError> {
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    let call = call::join_channel(&ctx, guild_id, channel.id).await?;
    call::ensure_session(&ctx, guild_id, call).await;

    ctx.reply(format!("Moving to **{}**.", channel.name)).await?;
    Ok(())
}

use tracing::instrument;

use crate::call;
use crate::error::UserError;
use crate::{Context, MagpieError};

/// Clears the queue and leaves the voice channel.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn leave(ctx: Context<'_>) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;
    ctx.data().registry.remove(session.guild_id()).await;

    ctx.reply("Bye.").await?;
    Ok(())
}

/// Force-resets the voice state for this server.
///
/// Unlike `/leave` this never errors on missing state, so it can recover a
/// half-dead connection.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn fix(ctx: Context<'_>) -> Result<(), MagpieError> {
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;

    ctx.data().registry.remove(guild_id).await;
    // A raw call can linger when the session was never created.
    if let Ok(manager) = call::get_manager(&ctx).await {
        let _ = manager.remove(guild_id).await;
    }

    ctx.reply("Voice state reset.").await?;
    Ok(())
}

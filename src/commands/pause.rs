use tracing::instrument;

use crate::call;
use crate::{Context, MagpieError};

/// Pauses the current song.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;
    session.pause().await?;

    ctx.reply("Paused.").await?;
    Ok(())
}

/// Resumes a paused song.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn resume(ctx: Context<'_>) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;
    session.resume().await?;

    ctx.reply("Resumed.").await?;
    Ok(())
}

/// Toggles looping of the current song.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, rename = "loop")]
pub async fn looping(ctx: Context<'_>) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;

    let reply = if session.toggle_looping().await {
        "Looping the current song."
    } else {
        "Looping disabled."
    };

    ctx.reply(reply).await?;
    Ok(())
}

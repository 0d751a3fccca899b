use tracing::instrument;

use crate::call;
use crate::{Context, MagpieError};

/// Stops playback, deletes the queue, and leaves the voice channel.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;
    ctx.data().registry.remove(session.guild_id()).await;

    ctx.reply("Stopped and cleared the queue.").await?;
    Ok(())
}

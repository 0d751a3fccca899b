use poise::CreateReply;
use tracing::instrument;

use crate::call;
use crate::error::UserError;
use crate::player::announce::now_playing_embed;
use crate::{Context, MagpieError};

/// Shows the currently playing song.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn now_playing(ctx: Context<'_>) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;
    let song = session.current().await.ok_or(UserError::NothingPlaying)?;

    ctx.send(CreateReply::default().embed(now_playing_embed(&song)))
        .await?;
    Ok(())
}

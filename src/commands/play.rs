use tracing::instrument;

use crate::call;
use crate::error::UserError;
use crate::player::Song;
use crate::resolver;
use crate::{Context, MagpieError};

/// Plays a song from a search query or url.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "A song title to search for, or a url"] query: String,
) -> Result<(), MagpieError> {
    let session = call::obtain_session(&ctx).await?;

    // Resolution shells out and can outlive the interaction token.
    ctx.defer().await?;

    let track = resolver::resolve(&query).await.map_err(UserError::from)?;
    let song = Song::new(track, ctx.author().id);
    let reply = format!("Enqueued {song}.");
    session.queue().enqueue(song).await;

    ctx.reply(reply).await?;
    Ok(())
}

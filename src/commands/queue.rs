use std::fmt::Write;

use poise::CreateReply;
use tracing::instrument;

use crate::call;
use crate::error::UserError;
use crate::serenity::{CreateEmbed, CreateEmbedFooter};
use crate::{Context, MagpieError};

/// Tracks shown per queue page.
const PAGE_SIZE: usize = 10;

/// Shows the queued songs, ten per page.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn queue(
    ctx: Context<'_>,
    #[description = "Page to show, starting at 1"] page: Option<u32>,
) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;

    let len = session.queue().len().await;
    if len == 0 {
        return Err(UserError::EmptyQueue.into());
    }

    let page = page.unwrap_or(1) as usize;
    let (start, pages) = page_bounds(len, page)?;
    let songs = session.queue().snapshot_range(start, start + PAGE_SIZE).await;

    let mut listing = format!("**{len} track(s) queued:**\n\n");
    for (offset, song) in songs.iter().enumerate() {
        let _ = writeln!(
            listing,
            "`{}.` [**{}**]({})",
            start + offset + 1,
            song.title(),
            song.track.url
        );
    }

    let embed = CreateEmbed::new()
        .description(listing)
        .footer(CreateEmbedFooter::new(format!("Viewing page {page}/{pages}")));
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Maps a 1-based page onto the 0-based start offset, validating against
/// the total page count.
fn page_bounds(len: usize, page: usize) -> Result<(usize, usize), UserError> {
    let pages = len.div_ceil(PAGE_SIZE);
    if page == 0 || page > pages {
        return Err(UserError::NoSuchPage { page, pages });
    }
    Ok(((page - 1) * PAGE_SIZE, pages))
}

/// Shuffles the queued songs. The current song keeps playing.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn shuffle(ctx: Context<'_>) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;

    if session.queue().is_empty().await {
        return Err(UserError::EmptyQueue.into());
    }
    session.queue().shuffle().await;

    ctx.reply("Shuffled the queue.").await?;
    Ok(())
}

/// Removes the song at the given queue position.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Queue position, as shown by /queue"] index: u32,
) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;

    let len = session.queue().len().await;
    if len == 0 {
        return Err(UserError::EmptyQueue.into());
    }
    let index = index as usize;
    if index == 0 || index > len {
        return Err(UserError::BadIndex { index, len }.into());
    }

    // The queue may have shrunk since the length check.
    match session.queue().remove_at(index - 1).await {
        Some(song) => {
            ctx.reply(format!("Removed **{}** from position {index}.", song.title()))
                .await?;
            Ok(())
        }
        None => {
            let len = session.queue().len().await;
            Err(UserError::BadIndex { index, len }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_tracks_make_two_pages() {
        // Page 2 starts at offset 10, so it shows tracks 11 through 15.
        assert_eq!(page_bounds(15, 1).unwrap(), (0, 2));
        assert_eq!(page_bounds(15, 2).unwrap(), (10, 2));
    }

    #[test]
    fn out_of_range_pages_are_rejected() {
        assert!(matches!(
            page_bounds(15, 3),
            Err(UserError::NoSuchPage { page: 3, pages: 2 })
        ));
        assert!(matches!(
            page_bounds(5, 0),
            Err(UserError::NoSuchPage { page: 0, pages: 1 })
        ));
    }

    #[test]
    fn exact_multiples_do_not_grow_a_page() {
        assert_eq!(page_bounds(10, 1).unwrap(), (0, 1));
        assert!(page_bounds(10, 2).is_err());
    }
}

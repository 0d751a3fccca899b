use tracing::instrument;

use crate::call;
use crate::player::SkipOutcome;
use crate::{Context, MagpieError};

/// Votes to skip the current song. The requester skips immediately.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;

    let reply = match session.skip(ctx.author().id).await? {
        SkipOutcome::Skipped => "Skipping.".to_string(),
        SkipOutcome::VoteAdded { votes, needed } => {
            format!("Skip vote added, now at **{votes}/{needed}**.")
        }
        SkipOutcome::AlreadyVoted { votes, needed } => {
            format!("You already voted to skip this song ({votes}/{needed}).")
        }
    };

    ctx.reply(reply).await?;
    Ok(())
}

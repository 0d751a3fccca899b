use tracing::instrument;

use crate::call;
use crate::error::UserError;
use crate::{Context, MagpieError};

/// Shows or sets the playback volume.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "New volume from 0 to 100; omit to show the current one"]
    volume: Option<i64>,
) -> Result<(), MagpieError> {
    let session = call::session(&ctx).await?;

    let reply = match volume {
        None => {
            let percent = (session.volume().await * 100.0).round() as i64;
            format!("Volume is at **{percent}%**.")
        }
        Some(given) => {
            session.set_volume(parse_volume(given)?).await;
            format!("Volume set to **{given}%**. Applies from the next song.")
        }
    };

    ctx.reply(reply).await?;
    Ok(())
}

/// Maps a user-facing percentage onto the `[0, 1]` fraction the driver
/// wants, rejecting anything outside 0-100.
fn parse_volume(given: i64) -> Result<f32, UserError> {
    if (0..=100).contains(&given) {
        Ok(given as f32 / 100.0)
    } else {
        Err(UserError::VolumeOutOfRange { given })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_whole_percent_range() {
        assert_eq!(parse_volume(0).unwrap(), 0.0);
        assert_eq!(parse_volume(73).unwrap(), 0.73);
        assert_eq!(parse_volume(100).unwrap(), 1.0);
    }

    #[test]
    fn rejects_out_of_range_volumes() {
        assert!(matches!(
            parse_volume(150),
            Err(UserError::VolumeOutOfRange { given: 150 })
        ));
        assert!(matches!(
            parse_volume(-1),
            Err(UserError::VolumeOutOfRange { given: -1 })
        ));
    }
}

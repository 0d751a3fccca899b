//! Track metadata and the [Song] queue entry.

use std::fmt::Display;
use std::sync::Arc;

use poise::serenity_prelude as serenity;

/// Metadata for a resolved, playable track.
///
/// Immutable once built by the resolver. The `stream_url` is ephemeral and
/// only valid for roughly as long as the upstream provider allows.
#[derive(Debug, Clone, Default)]
pub struct Track {
    /// Title of the track.
    pub title: String,
    /// The uploader's channel name.
    pub uploader: String,
    /// Link to the uploader's channel.
    pub uploader_url: Option<String>,
    /// Upload date, rendered as `DD.MM.YYYY`.
    pub upload_date: Option<String>,
    /// Duration in whole seconds.
    pub duration_secs: u64,
    /// The track description.
    pub description: Option<String>,
    /// Url to a thumbnail image.
    pub thumbnail: Option<String>,
    /// Tags attached to the upload.
    pub tags: Vec<String>,
    /// The canonical page url.
    pub url: String,
    /// View count, if the provider reports one.
    pub views: Option<u64>,
    /// Like count, if the provider reports one.
    pub likes: Option<u64>,
    /// Dislike count, if the provider reports one.
    pub dislikes: Option<u64>,
    /// Ephemeral direct-stream url used by the voice transport.
    pub stream_url: String,
}

impl Track {
    /// Human readable duration, see [format_duration].
    pub fn duration(&self) -> String {
        format_duration(self.duration_secs)
    }
}

impl Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "**{}** by **{}**", self.title, self.uploader)
    }
}

/// A queued track together with who asked for it.
///
/// Cloning is cheap, the track itself is shared.
#[derive(Debug, Clone)]
pub struct Song {
    /// The resolved track.
    pub track: Arc<Track>,
    /// The user that requested it.
    pub requester: serenity::UserId,
}

impl Song {
    /// Pair a resolved track with its requester.
    pub fn new(track: Track, requester: serenity::UserId) -> Self {
        Self {
            track: Arc::new(track),
            requester,
        }
    }

    /// Title shorthand used by replies and logs.
    pub fn title(&self) -> &str {
        &self.track.title
    }
}

impl Display for Song {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.track.fmt(f)
    }
}

/// Renders seconds as `d days, h hours, m minutes, s seconds`, leaving out
/// zero-valued units. A zero duration still renders as `0 seconds`.
pub fn format_duration(total_secs: u64) -> String {
    let (minutes, seconds) = (total_secs / 60, total_secs % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    let (days, hours) = (hours / 24, hours % 24);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days} days"));
    }
    if hours > 0 {
        parts.push(format!("{hours} hours"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} minutes"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds} seconds"));
    }

    parts.join(", ")
}

/// Renders yt-dlp's `YYYYMMDD` upload date as `DD.MM.YYYY`.
/// Anything that isn't 8 digits is passed through untouched.
pub fn format_upload_date(raw: &str) -> String {
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}.{}.{}", &raw[6..8], &raw[4..6], &raw[0..4])
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_omits_zero_units() {
        assert_eq!(format_duration(3601), "1 hours, 1 seconds");
        assert_eq!(format_duration(120), "2 minutes");
        assert_eq!(format_duration(90061), "1 days, 1 hours, 1 minutes, 1 seconds");
    }

    #[test]
    fn duration_always_has_seconds_when_otherwise_empty() {
        assert_eq!(format_duration(0), "0 seconds");
        assert_eq!(format_duration(59), "59 seconds");
    }

    #[test]
    fn upload_date_is_reordered() {
        assert_eq!(format_upload_date("20240131"), "31.01.2024");
        assert_eq!(format_upload_date("unknown"), "unknown");
    }
}

//! Track resolution via yt-dlp.
//!
//! Resolution is two-phase, like the upstream tool wants it: a cheap flat
//! search (skipped for direct urls) to find the canonical page, then a full
//! metadata fetch for that page. Sessions never see any of this; they only
//! get a [Track] or a [ResolutionError].

use std::process::Stdio;

use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::instrument;
use url::Url;

use crate::error::ResolutionError;
use crate::player::track::{format_upload_date, Track};

/// The resolver binary. Must be on PATH.
const YTDLP_BIN: &str = "yt-dlp";

/// Resolves a search query or url into a playable [Track].
#[instrument(err)]
pub async fn resolve(query: &str) -> Result<Track, ResolutionError> {
    let page_url = match Url::parse(query) {
        Ok(url) => url.to_string(),
        Err(_) => flat_search(query).await?,
    };
    fetch_track(&page_url, query).await
}

/// Phase one: flat search for the canonical page url.
async fn flat_search(query: &str) -> Result<String, ResolutionError> {
    let uri = format!("ytsearch1:{query}");
    let args = [
        "-J",
        "--flat-playlist",
        "--no-warnings",
        "--ignore-config",
        uri.as_str(),
    ];
    let json = run_ytdlp(&args, query).await?;

    first_entry_url(&json).ok_or_else(|| ResolutionError::NoMatches {
        query: query.to_string(),
    })
}

/// Phase two: full metadata for the page found in phase one.
async fn fetch_track(page_url: &str, query: &str) -> Result<Track, ResolutionError> {
    let args = [
        "-J",
        "--no-playlist",
        "--no-warnings",
        "--ignore-config",
        "-f",
        "bestaudio/best",
        page_url,
    ];
    let json = run_ytdlp(&args, query).await?;

    // Playlist pages still come back with an "entries" list; fall through
    // to the first usable one.
    let raw = match json.get("entries").and_then(Value::as_array) {
        Some(entries) => entries
            .iter()
            .find(|entry| !entry.is_null())
            .cloned()
            .ok_or_else(|| ResolutionError::NoMatches {
                query: query.to_string(),
            })?,
        None => json,
    };

    Ok(track_from_json(raw)?)
}

/// Runs yt-dlp and parses its JSON output.
async fn run_ytdlp(args: &[&str], query: &str) -> Result<Value, ResolutionError> {
    let output = Command::new(YTDLP_BIN)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| ResolutionError::Fetch {
            query: query.to_string(),
            source,
        })?;

    let stdout = String::from_utf8(output.stdout)?;
    if stdout.trim().is_empty() {
        // yt-dlp prints nothing on a fruitless search.
        return Err(ResolutionError::NoMatches {
            query: query.to_string(),
        });
    }

    Ok(serde_json::from_str(&stdout)?)
}

/// Picks the canonical url out of a flat search result.
fn first_entry_url(value: &Value) -> Option<String> {
    match value.get("entries").and_then(Value::as_array) {
        Some(entries) => entries
            .iter()
            .filter(|entry| !entry.is_null())
            .find_map(|entry| {
                entry
                    .get("url")
                    .or_else(|| entry.get("webpage_url"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string),
        None => value
            .get("webpage_url")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// The subset of yt-dlp's metadata we keep.
#[derive(Debug, Deserialize)]
struct RawTrack {
    title: Option<String>,
    uploader: Option<String>,
    uploader_url: Option<String>,
    upload_date: Option<String>,
    duration: Option<f64>,
    description: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    webpage_url: Option<String>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    dislike_count: Option<u64>,
    /// The direct stream url for the selected format.
    url: String,
}

/// Converts one yt-dlp video object into a [Track].
fn track_from_json(value: Value) -> Result<Track, serde_json::Error> {
    let raw: RawTrack = serde_json::from_value(value)?;

    Ok(Track {
        title: raw.title.unwrap_or_else(|| "<unknown title>".to_string()),
        uploader: raw.uploader.unwrap_or_else(|| "<unknown uploader>".to_string()),
        uploader_url: raw.uploader_url,
        upload_date: raw.upload_date.as_deref().map(format_upload_date),
        duration_secs: raw.duration.unwrap_or_default().round() as u64,
        description: raw.description,
        thumbnail: raw.thumbnail,
        tags: raw.tags,
        url: raw.webpage_url.unwrap_or_default(),
        views: raw.view_count,
        likes: raw.like_count,
        dislikes: raw.dislike_count,
        stream_url: raw.url,
    })
}

//! Error types for the bot.
//!
//! Errors are split by who should see them: [UserError]s are expected
//! conditions reported back to the invoking user, everything else in
//! [MagpieError] is unexpected and goes through the central error handler
//! in [crate::log].

use poise::serenity_prelude as serenity;
use thiserror::Error;

/// Top-level error for commands and framework hooks.
#[derive(Debug, Error)]
pub enum MagpieError {
    /// Expected errors that are shown to the user.
    #[error(transparent)]
    UserError(#[from] UserError),

    /// Configuration problems at startup.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Errors from the voice transport.
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// Errors from the discord API.
    #[error("Discord API error: {0}")]
    Serenity(#[from] serenity::Error),

    /// Failed to join a voice channel.
    #[error("Failed to join voice channel: {0}")]
    Join(#[from] songbird::error::JoinError),

    /// A command panicked during execution.
    #[error("Command panicked. Payload: {payload:?}")]
    Panic {
        /// Panic payload, if it was a string.
        payload: Option<String>,
    },

    /// A command check failed without a more specific error.
    #[error("Command check failed. Reason: {reason:?}")]
    CheckFailed {
        /// Optional reason given by the check.
        reason: Option<String>,
    },

    /// Discord sent a command invocation that doesn't match our schema.
    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch {
        /// What didn't line up.
        description: String,
    },

    /// Something that must be registered at startup is missing.
    #[error("Missing from setup: {reason}")]
    MissingFromSetup {
        /// What was expected.
        reason: String,
    },
}

/// Expected error conditions, rendered to the invoking user.
#[derive(Debug, Error)]
pub enum UserError {
    /// Command was used outside a guild.
    #[error("That can only be used in a server.")]
    GuildOnly,

    /// The invoking user is not in a voice channel.
    #[error("You're not in a voice channel.")]
    NotInVoice,

    /// The bot has no live session for this guild.
    #[error("Not connected to a voice channel here. Use `/join` or `/play` first.")]
    NotConnected,

    /// A playback-control command was used while nothing plays.
    #[error("Nothing is playing right now.")]
    NothingPlaying,

    /// A queue command was used on an empty queue.
    #[error("The queue is empty.")]
    EmptyQueue,

    /// Removal index outside the queue.
    #[error("No track at position {index}, the queue has {len} track(s).")]
    BadIndex {
        /// 1-based index the user gave.
        index: usize,
        /// Queue length at the time.
        len: usize,
    },

    /// Queue page outside the page count.
    #[error("No page {page}, the queue only has {pages} page(s).")]
    NoSuchPage {
        /// 1-based page the user gave.
        page: usize,
        /// Number of pages available.
        pages: usize,
    },

    /// Volume outside the accepted 0-100 range.
    #[error("Volume must be between 0 and 100, got {given}.")]
    VolumeOutOfRange {
        /// Raw value the user gave.
        given: i64,
    },

    /// Track resolution failed; shown verbatim.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A required subcommand was not given.
    #[error("Missing subcommand. Expected one of: {subcmds}")]
    MissingSubcommand {
        /// Comma separated list of subcommands.
        subcmds: String,
    },

    /// Arguments failed to parse.
    #[error("Bad arguments: {input:?}")]
    BadArgs {
        /// The raw input, if poise kept it.
        input: Option<String>,
    },

    /// Command used again while still on cooldown.
    #[error("On cooldown, try again in {}s.", remaining_cooldown.as_secs())]
    OnCooldown {
        /// Time until the command is usable again.
        remaining_cooldown: std::time::Duration,
    },
}

/// Failure to resolve a search query or URL into a playable track.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The search returned nothing.
    #[error("Couldn't find anything that matches `{query}`.")]
    NoMatches {
        /// The original query.
        query: String,
    },

    /// yt-dlp could not be spawned or exited abnormally.
    #[error("Couldn't fetch `{query}`: {source}")]
    Fetch {
        /// The original query.
        query: String,
        /// Underlying subprocess error.
        #[source]
        source: std::io::Error,
    },

    /// yt-dlp produced output we couldn't understand.
    #[error("Couldn't read track metadata: {0}")]
    Parse(#[from] serde_json::Error),

    /// yt-dlp produced non-UTF-8 output.
    #[error("Couldn't read track metadata: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Failure raised by the voice transport while playing a track.
///
/// These end the current song but never the session.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The driver reported the track errored.
    #[error("Track ended with error: {0}")]
    Driver(String),

    /// A track control (stop/pause/resume) failed.
    #[error("Track control failed: {0}")]
    Control(#[from] songbird::tracks::ControlError),
}

/// Problems reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file existed; a default one was written.
    #[error("Missing config file. {action_msg}")]
    MissingConfig {
        /// What was done about it.
        action_msg: String,
    },

    /// The config file exists but couldn't be used.
    #[error("Invalid config: {reason}")]
    InvalidConfig {
        /// Deserialization or validation failure.
        reason: String,
    },

    /// Filesystem error while reading/writing the config.
    #[error("Config file IO error: {0}")]
    IoError(#[from] std::io::Error),
}

//! A music bot for discord servers.

use std::sync::Arc;

mod call;
mod commands;
mod data;
mod error;
mod log;
mod player;
mod resolver;
mod setup;

/// Convenient alias for the serenity re-exports.
pub use poise::serenity_prelude as serenity;

pub use data::Data;
pub use error::MagpieError;
pub use setup::Config;

use player::SessionRegistry;

/// Convenient type alias for the poise context.
pub type Context<'a> = poise::Context<'a, Data, MagpieError>;

#[tokio::main]
async fn main() -> Result<(), MagpieError> {
    let config = Config::read()?;

    // Keep the guard alive for the lifetime of the program, otherwise file
    // logs stop being written.
    let _guard = log::install_tracing(&config);

    let registry = Arc::new(SessionRegistry::new());
    let mut client = setup::client(config, registry.clone()).await?;

    // On Ctrl-C, wind down every playback session before the gateway drops.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, shutting down.");
            registry.shutdown_all().await;
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await?;
    Ok(())
}

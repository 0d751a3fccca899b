//! Client and framework construction.

mod config;
mod framework;

use std::sync::Arc;

use songbird::SerenityInit;

use crate::data::HttpKey;
use crate::player::SessionRegistry;
use crate::serenity;
use crate::MagpieError;

pub use config::Config;

/// Constructs a [serenity::Client] with initialized [songbird] and [reqwest::Client].
pub(super) async fn client(
    config: Config,
    registry: Arc<SessionRegistry>,
) -> Result<serenity::Client, MagpieError> {
    // Get discord token from config file
    let token = config.token()?;

    // Intents we wish to use
    // See https://discord.com/developers/docs/topics/gateway#gateway-intents
    let intents = serenity::GatewayIntents::non_privileged();

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework::framework(config, registry))
        .register_songbird()
        .type_map_insert::<HttpKey>(reqwest::Client::new())
        .await?;

    Ok(client)
}

//! This module contains everything relating to [Data].

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Client;
use serenity::UserId;

use crate::player::{PlayerSettings, SessionRegistry};
use crate::serenity;
use crate::Context;

/// The data kept between shards.
pub struct Data {
    /// List of users to send bug notifications.
    pub notify_list: HashSet<UserId>,
    /// Per-guild playback sessions.
    pub registry: Arc<SessionRegistry>,
    /// Playback tunables from the config file.
    pub settings: PlayerSettings,
}

/// Key to store a [Client] in the serenity TypeMap.
pub struct HttpKey;
impl serenity::prelude::TypeMapKey for HttpKey {
    type Value = Client;
}

/// Is able to get the shared [Client].
pub trait GetData {
    /// Returns the [Client] registered at setup.
    async fn http_client(&self) -> Client;
}

impl GetData for Context<'_> {
    async fn http_client(&self) -> Client {
        self.serenity_context()
            .data
            .read()
            .await
            .get::<HttpKey>()
            // Client internally uses an Arc, so this is cheap to clone
            .cloned()
            .expect("Expected http client")
    }
}

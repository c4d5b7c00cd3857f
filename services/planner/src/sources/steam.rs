use super::http::{endpoint, get_json};
use super::traits::LibrarySource;
use crate::config::LibraryConfig;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

/// True for a 17-digit SteamID64. Other ids are still sent; the service
/// decides whether they resolve.
pub fn is_steam_id64(user_id: &str) -> bool {
    match Regex::new(r"^7656\d{13}$") {
        Ok(re) => re.is_match(user_id.trim()),
        Err(_) => false,
    }
}

/// Owned games from the Steam Web API (`IPlayerService/GetOwnedGames`).
pub struct SteamLibrary {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SteamLibrary {
    pub fn new(client: Client, config: &LibraryConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

#[async_trait]
impl LibrarySource for SteamLibrary {
    fn name(&self) -> &str {
        "steam"
    }

    async fn fetch_owned_games(&self, user_id: &str) -> Result<serde_json::Value> {
        let url = endpoint(
            &self.base_url,
            &["IPlayerService", "GetOwnedGames", "v0001", ""],
        )?;
        tracing::debug!("Fetching owned games for {}", user_id);

        get_json(
            &self.client,
            url,
            &[
                ("key", self.api_key.clone()),
                ("steamid", user_id.to_string()),
                ("format", "json".to_string()),
                ("include_appinfo", "true".to_string()),
            ],
        )
        .await
    }
}

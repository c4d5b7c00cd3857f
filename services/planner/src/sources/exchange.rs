use super::http::{endpoint, get_json};
use super::traits::RateSource;
use crate::config::ExchangeConfig;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

/// Pair conversion from exchangerate-api v6 (`/{key}/pair/{base}/{quote}`).
pub struct ExchangeRateApi {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ExchangeRateApi {
    pub fn new(client: Client, config: &ExchangeConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

#[async_trait]
impl RateSource for ExchangeRateApi {
    fn name(&self) -> &str {
        "exchangerate-api"
    }

    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<serde_json::Value> {
        let url = endpoint(&self.base_url, &[&self.api_key, "pair", base, quote])?;
        tracing::debug!("Fetching {}/{} conversion rate", base, quote);
        get_json(&self.client, url, &[]).await
    }
}

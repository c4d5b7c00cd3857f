use super::http::{endpoint, get_json};
use super::traits::{DealFilter, DealSource, PriceHistorySource};
use crate::config::DealsConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// CheapShark deals listing and multi-game price lookup.
pub struct CheapShark {
    client: Client,
    base_url: String,
    lookup_batch_size: usize,
}

impl CheapShark {
    pub fn new(client: Client, config: &DealsConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            lookup_batch_size: config.lookup_batch_size.max(1),
        }
    }

    async fn fetch_games_batch(&self, ids: &[String]) -> Result<Map<String, Value>> {
        let url = endpoint(&self.base_url, &["games"])?;
        let payload = get_json(&self.client, url, &[("ids", ids.join(","))]).await?;
        match payload {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!(
                "Unexpected games lookup response format: {}",
                type_name(&other)
            ),
        }
    }
}

#[async_trait]
impl DealSource for CheapShark {
    fn name(&self) -> &str {
        "cheapshark"
    }

    async fn fetch_deals(&self, filter: &DealFilter) -> Result<Value> {
        let url = endpoint(&self.base_url, &["deals"])?;
        get_json(
            &self.client,
            url,
            &[
                ("storeID", filter.store_id.clone()),
                ("upperPrice", filter.upper_price.to_string()),
                ("pageSize", filter.page_size.to_string()),
            ],
        )
        .await
        .context("Failed to fetch deals from CheapShark")
    }
}

#[async_trait]
impl PriceHistorySource for CheapShark {
    fn name(&self) -> &str {
        "cheapshark"
    }

    /// Looks ids up in batches; a failed batch only loses its own ids.
    /// Fails as a whole only when no batch succeeds.
    async fn fetch_lowest_prices(&self, game_ids: &[String]) -> Result<Value> {
        let batches = batch_ids(game_ids, self.lookup_batch_size);
        if batches.is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let results =
            futures::future::join_all(batches.iter().map(|batch| self.fetch_games_batch(batch))).await;

        let mut merged = Map::new();
        let mut last_error = None;
        let mut ok_batches = 0;
        for (batch, result) in batches.iter().zip(results) {
            match result {
                Ok(map) => {
                    ok_batches += 1;
                    merged.extend(map);
                }
                Err(e) => {
                    warn!("Price lookup failed for {} game ids: {:#}", batch.len(), e);
                    last_error = Some(e);
                }
            }
        }

        if ok_batches == 0 {
            if let Some(e) = last_error {
                return Err(e.context("Every price lookup batch failed"));
            }
        }

        debug!("Resolved price history for {} of {} games", merged.len(), game_ids.len());
        Ok(Value::Object(merged))
    }
}

/// De-duplicates ids (keeping first occurrence) and splits them into chunks.
pub fn batch_ids(game_ids: &[String], batch_size: usize) -> Vec<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let unique: Vec<String> = game_ids
        .iter()
        .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
        .cloned()
        .collect();

    unique
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

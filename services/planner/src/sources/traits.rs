use anyhow::Result;
use async_trait::async_trait;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Query parameters for the deals listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealFilter {
    pub store_id: String,
    pub upper_price: f64,
    pub page_size: usize,
}

/// Personal budget spreadsheet. Failure here aborts the run.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    fn name(&self) -> &str;

    async fn load_ledger(&self) -> Result<DataFrame>;
}

/// Game-library service; returns the raw owned-games payload.
#[async_trait]
pub trait LibrarySource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_owned_games(&self, user_id: &str) -> Result<serde_json::Value>;
}

/// Currency-conversion service; returns the raw pair payload.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<serde_json::Value>;
}

/// Deals marketplace listing.
#[async_trait]
pub trait DealSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_deals(&self, filter: &DealFilter) -> Result<serde_json::Value>;
}

/// Price-history lookup keyed by game id; returns an object of id -> game info.
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_lowest_prices(&self, game_ids: &[String]) -> Result<serde_json::Value>;
}

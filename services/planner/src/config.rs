use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data_dir: String,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub deals: DealsConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub staging: StagingConfig,
    #[serde(default)]
    pub mock: MockConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: String,
    #[serde(default = "default_period_column")]
    pub period_column: String,
    #[serde(default = "default_amount_column")]
    pub amount_column: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_library_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_exchange_url")]
    pub base_url: String,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,
    /// Local-currency units per base unit used when the rate lookup fails.
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DealsConfig {
    #[serde(default = "default_deals_url")]
    pub base_url: String,
    #[serde(default = "default_store_id")]
    pub store_id: String,
    #[serde(default = "default_upper_price")]
    pub upper_price: f64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_lookup_batch_size")]
    pub lookup_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_source_secs")]
    pub source_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StagingConfig {
    #[serde(default = "default_false")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MockConfig {
    #[serde(default = "default_false")]
    pub enabled: bool,
    #[serde(default = "default_deal_count")]
    pub deal_count: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        let config: Config = toml::from_str(&content)
            .context("Failed to parse config TOML")?;
        Ok(config)
    }

    /// Upper bound applied to every collaborator call.
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.source_secs)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            period_column: default_period_column(),
            amount_column: default_amount_column(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_library_url(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_exchange_url(),
            base_currency: default_base_currency(),
            quote_currency: default_quote_currency(),
            fallback_rate: default_fallback_rate(),
        }
    }
}

impl Default for DealsConfig {
    fn default() -> Self {
        Self {
            base_url: default_deals_url(),
            store_id: default_store_id(),
            upper_price: default_upper_price(),
            page_size: default_page_size(),
            lookup_batch_size: default_lookup_batch_size(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            source_secs: default_source_secs(),
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            deal_count: default_deal_count(),
            seed: default_seed(),
        }
    }
}

fn default_ledger_path() -> String {
    "finance_data.csv".to_string()
}

fn default_period_column() -> String {
    "bulan_id".to_string()
}

fn default_amount_column() -> String {
    "budget_final_game".to_string()
}

fn default_library_url() -> String {
    "http://api.steampowered.com".to_string()
}

fn default_exchange_url() -> String {
    "https://v6.exchangerate-api.com/v6".to_string()
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_quote_currency() -> String {
    "IDR".to_string()
}

fn default_fallback_rate() -> f64 {
    16000.0
}

fn default_deals_url() -> String {
    "https://www.cheapshark.com/api/1.0".to_string()
}

fn default_store_id() -> String {
    "1".to_string()
}

fn default_upper_price() -> f64 {
    50.0
}

fn default_page_size() -> usize {
    30
}

// CheapShark rejects multi-id game lookups above 25 ids.
fn default_lookup_batch_size() -> usize {
    25
}

fn default_source_secs() -> u64 {
    20
}

fn default_false() -> bool {
    false
}

fn default_deal_count() -> usize {
    30
}

fn default_seed() -> u64 {
    7
}

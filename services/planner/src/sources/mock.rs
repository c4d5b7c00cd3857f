use super::traits::{DealFilter, DealSource, LedgerSource, LibrarySource, PriceHistorySource, RateSource};
use crate::schema::{BudgetRecord, MarketDeal};
use crate::storage::tables::budget_frame;
use anyhow::{bail, Result};
use async_trait::async_trait;
use polars::prelude::DataFrame;
use serde_json::{json, Map, Value};
use std::time::Duration;

const CATALOGUE: &[&str] = &[
    "Hollow Knight",
    "Celeste",
    "Hades",
    "Stardew Valley",
    "Disco Elysium",
    "Outer Wilds",
    "Slay the Spire",
    "Dead Cells",
    "Into the Breach",
    "Return of the Obra Dinn",
    "Terraria",
    "Factorio",
    "RimWorld",
    "Portal 2",
    "Inside",
    "Cuphead",
    "Subnautica",
    "Katana ZERO",
    "Tunic",
    "Spiritfarer",
];

enum LedgerFixture {
    Records(Vec<BudgetRecord>),
    Frame(DataFrame),
    Unavailable,
}

pub struct MockLedger {
    fixture: LedgerFixture,
    period_column: String,
    amount_column: String,
    delay: Option<Duration>,
}

impl MockLedger {
    pub fn new(records: Vec<BudgetRecord>) -> Self {
        Self {
            fixture: LedgerFixture::Records(records),
            period_column: "bulan_id".to_string(),
            amount_column: "budget_final_game".to_string(),
            delay: None,
        }
    }

    /// Serves an arbitrary frame, e.g. one with missing or mistyped columns.
    pub fn from_frame(frame: DataFrame) -> Self {
        Self {
            fixture: LedgerFixture::Frame(frame),
            ..Self::new(Vec::new())
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fixture: LedgerFixture::Unavailable,
            ..Self::new(Vec::new())
        }
    }

    pub fn with_columns(mut self, period_column: &str, amount_column: &str) -> Self {
        self.period_column = period_column.to_string();
        self.amount_column = amount_column.to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// A year of monthly allowances ending in `last_period`.
    pub fn monthly(last_period: i64, amount: f64) -> Self {
        let mut records = Vec::new();
        let (mut year, mut month) = (last_period / 100, last_period % 100);
        for _ in 0..12 {
            records.push(BudgetRecord {
                period_id: year * 100 + month,
                amount,
            });
            month -= 1;
            if month == 0 {
                month = 12;
                year -= 1;
            }
        }
        records.reverse();
        Self::new(records)
    }
}

#[async_trait]
impl LedgerSource for MockLedger {
    fn name(&self) -> &str {
        "mock-ledger"
    }

    async fn load_ledger(&self) -> Result<DataFrame> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fixture {
            LedgerFixture::Records(records) => {
                Ok(budget_frame(records, &self.period_column, &self.amount_column)?)
            }
            LedgerFixture::Frame(frame) => Ok(frame.clone()),
            LedgerFixture::Unavailable => bail!("Mock ledger is unavailable"),
        }
    }
}

pub struct MockLibrary {
    titles: Vec<String>,
    fail: bool,
}

impl MockLibrary {
    pub fn new(titles: &[&str]) -> Self {
        Self {
            titles: titles.iter().map(|t| t.to_string()).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            titles: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl LibrarySource for MockLibrary {
    fn name(&self) -> &str {
        "mock-library"
    }

    async fn fetch_owned_games(&self, _user_id: &str) -> Result<Value> {
        if self.fail {
            bail!("Mock library is unavailable");
        }
        let games: Vec<Value> = self
            .titles
            .iter()
            .enumerate()
            .map(|(i, title)| json!({ "appid": 1000 + i, "name": title, "playtime_forever": 0 }))
            .collect();
        Ok(json!({ "response": { "game_count": games.len(), "games": games } }))
    }
}

pub struct MockRates {
    rate: Option<f64>,
    delay: Option<Duration>,
}

impl MockRates {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: Some(rate),
            delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            rate: None,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl RateSource for MockRates {
    fn name(&self) -> &str {
        "mock-rates"
    }

    async fn fetch_rate(&self, base: &str, quote: &str) -> Result<Value> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.rate {
            Some(rate) => Ok(json!({
                "result": "success",
                "base_code": base,
                "target_code": quote,
                "conversion_rate": rate,
            })),
            None => bail!("Mock rate service is unavailable"),
        }
    }
}

/// Serves a deals listing and its price-history lookup.
///
/// Payloads mirror the marketplace wire format, including prices rendered
/// as strings. Either payload can be replaced or removed to simulate
/// malformed or failing responses.
pub struct MockDeals {
    deals: Option<Value>,
    history: Option<Value>,
}

impl MockDeals {
    pub fn new(deals: &[MarketDeal]) -> Self {
        let listing: Vec<Value> = deals
            .iter()
            .map(|d| {
                json!({
                    "internalName": d.title.to_uppercase().replace(' ', ""),
                    "title": d.title,
                    "dealID": d.deal_id,
                    "storeID": "1",
                    "gameID": d.game_id,
                    "salePrice": format!("{:.2}", d.sale_price),
                    "normalPrice": format!("{:.2}", d.normal_price),
                    "savings": format!("{:.6}", d.discount_percent),
                    "metacriticScore": format!("{}", d.metacritic_score),
                    "dealRating": format!("{:.1}", d.deal_rating),
                })
            })
            .collect();

        let mut history = Map::new();
        for d in deals {
            history.insert(
                d.game_id.clone(),
                json!({
                    "info": { "title": d.title },
                    "cheapestPriceEver": { "price": format!("{:.2}", d.historical_low_price), "date": 1_600_000_000 },
                    "deals": [],
                }),
            );
        }

        Self {
            deals: Some(Value::Array(listing)),
            history: Some(Value::Object(history)),
        }
    }

    /// Seeded catalogue used by `--mock` runs.
    pub fn generated(count: usize, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let deals: Vec<MarketDeal> = (0..count)
            .map(|i| {
                let title = match CATALOGUE.get(i) {
                    Some(t) => t.to_string(),
                    None => format!("{} {}", CATALOGUE[i % CATALOGUE.len()], i / CATALOGUE.len() + 1),
                };
                let normal = (rng.u32(5..50) as f64) - 0.01;
                let discount = rng.u32(10..90) as f64;
                let sale = ((normal * (100.0 - discount)) / 100.0 * 100.0).round() / 100.0;
                let low = if rng.bool() { sale } else { (sale * 0.8 * 100.0).round() / 100.0 };
                let mut deal = MarketDeal::new(&title, &(100 + i).to_string())
                    .with_prices(sale, normal)
                    .with_historical_low(low)
                    .with_quality(discount, rng.u32(0..=100) as f64 / 10.0, rng.u32(55..96) as f64);
                deal.deal_id = format!("mock-deal-{}", i);
                deal
            })
            .collect();
        Self::new(&deals)
    }

    pub fn with_deals_payload(mut self, payload: Value) -> Self {
        self.deals = Some(payload);
        self
    }

    pub fn with_history_payload(mut self, payload: Value) -> Self {
        self.history = Some(payload);
        self
    }

    pub fn failing_deals(mut self) -> Self {
        self.deals = None;
        self
    }

    pub fn failing_history(mut self) -> Self {
        self.history = None;
        self
    }
}

#[async_trait]
impl DealSource for MockDeals {
    fn name(&self) -> &str {
        "mock-deals"
    }

    async fn fetch_deals(&self, filter: &DealFilter) -> Result<Value> {
        match &self.deals {
            Some(Value::Array(items)) => Ok(Value::Array(
                items.iter().take(filter.page_size).cloned().collect(),
            )),
            Some(other) => Ok(other.clone()),
            None => bail!("Mock deals service is unavailable"),
        }
    }
}

#[async_trait]
impl PriceHistorySource for MockDeals {
    fn name(&self) -> &str {
        "mock-deals"
    }

    async fn fetch_lowest_prices(&self, game_ids: &[String]) -> Result<Value> {
        match &self.history {
            Some(Value::Object(map)) => {
                let subset: Map<String, Value> = map
                    .iter()
                    .filter(|(id, _)| game_ids.contains(id))
                    .map(|(id, v)| (id.clone(), v.clone()))
                    .collect();
                Ok(Value::Object(subset))
            }
            Some(other) => Ok(other.clone()),
            None => bail!("Mock price history is unavailable"),
        }
    }
}

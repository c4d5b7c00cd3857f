//! Raw collaborator payloads -> canonical rows.
//!
//! Budget problems are fatal. Library, rate, deals and price-history problems
//! degrade to a default and are reported as `Fallback`. A malformed field on
//! a single deal zeroes that field only.

use crate::config::LedgerConfig;
use crate::error::PipelineError;
use crate::schema::{BudgetRecord, MarketDeal, OwnedGame};
use polars::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// A normalized value plus whether it came from the collaborator or a default.
#[derive(Debug, Clone, PartialEq)]
pub enum Sourced<T> {
    Fetched(T),
    Fallback { value: T, reason: String },
}

impl<T> Sourced<T> {
    pub fn value(&self) -> &T {
        match self {
            Sourced::Fetched(value) => value,
            Sourced::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Sourced::Fetched(value) => value,
            Sourced::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Sourced::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Sourced::Fetched(_) => None,
            Sourced::Fallback { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Library,
    ExchangeRate,
    Deals,
    PriceHistory,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Library => "library",
            SourceKind::ExchangeRate => "exchange_rate",
            SourceKind::Deals => "deals",
            SourceKind::PriceHistory => "price_history",
        };
        f.write_str(name)
    }
}

/// A substitution made during the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Degradation {
    pub source: SourceKind,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

/// Every row must carry an integer period and a numeric amount.
pub fn normalize_budget(frame: &DataFrame, columns: &LedgerConfig) -> Result<Vec<BudgetRecord>, PipelineError> {
    let periods = ledger_column(frame, &columns.period_column, &DataType::Int64)?;
    let amounts = ledger_column(frame, &columns.amount_column, &DataType::Float64)?;

    let periods = periods.i64().map_err(|e| column_error(&columns.period_column, e))?;
    let amounts = amounts.f64().map_err(|e| column_error(&columns.amount_column, e))?;

    let mut records = Vec::with_capacity(frame.height());
    for (row_idx, (period, amount)) in periods.into_iter().zip(amounts.into_iter()).enumerate() {
        let period_id = period.ok_or_else(|| PipelineError::LedgerColumn {
            column: columns.period_column.clone(),
            reason: format!("row {} has no value", row_idx + 1),
        })?;
        let amount = amount.ok_or_else(|| PipelineError::LedgerColumn {
            column: columns.amount_column.clone(),
            reason: format!("row {} has no value", row_idx + 1),
        })?;
        records.push(BudgetRecord { period_id, amount });
    }

    Ok(records)
}

fn ledger_column(frame: &DataFrame, name: &str, dtype: &DataType) -> Result<Series, PipelineError> {
    let column = frame.column(name).map_err(|_| PipelineError::LedgerColumn {
        column: name.to_string(),
        reason: "column is missing".to_string(),
    })?;
    column.strict_cast(dtype).map_err(|e| column_error(name, e))
}

fn column_error(name: &str, e: PolarsError) -> PipelineError {
    PipelineError::LedgerColumn {
        column: name.to_string(),
        reason: e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

/// Expects `{"response": {"games": [{"name": ...}]}}`. A response without a
/// games list is an empty (private or new) library, not a failure.
pub fn normalize_library(result: anyhow::Result<Value>) -> Sourced<Vec<OwnedGame>> {
    let payload = match result {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Library fetch failed, treating library as empty: {:#}", e);
            return Sourced::Fallback {
                value: Vec::new(),
                reason: format!("{:#}", e),
            };
        }
    };

    let response = match payload.get("response") {
        Some(response) if response.is_object() => response,
        _ => {
            warn!("Library payload has no response object, treating library as empty");
            return Sourced::Fallback {
                value: Vec::new(),
                reason: "malformed library payload".to_string(),
            };
        }
    };

    let games = match response.get("games").and_then(|g| g.as_array()) {
        Some(games) => games,
        None => return Sourced::Fetched(Vec::new()),
    };

    let owned = games
        .iter()
        .filter_map(|g| g.get("name").and_then(|n| n.as_str()))
        .map(|title| OwnedGame {
            title: title.to_string(),
        })
        .collect();

    Sourced::Fetched(owned)
}

// ---------------------------------------------------------------------------
// Exchange rate
// ---------------------------------------------------------------------------

/// Reads `conversion_rate`; anything unusable yields `fallback_rate`.
pub fn normalize_rate(result: anyhow::Result<Value>, fallback_rate: f64) -> Sourced<f64> {
    let reason = match result {
        Ok(payload) => match payload.get("conversion_rate").and_then(parse_number) {
            Some(rate) if rate > 0.0 => return Sourced::Fetched(rate),
            Some(rate) => format!("non-positive conversion rate {}", rate),
            None => "conversion_rate missing or not numeric".to_string(),
        },
        Err(e) => format!("{:#}", e),
    };

    warn!("Exchange rate unavailable ({}), using fallback {}", reason, fallback_rate);
    Sourced::Fallback {
        value: fallback_rate,
        reason,
    }
}

// ---------------------------------------------------------------------------
// Deals
// ---------------------------------------------------------------------------

/// Deal rows without `historical_low_price`; see [`apply_historical_lows`].
pub fn normalize_deals(result: anyhow::Result<Value>) -> Sourced<Vec<MarketDeal>> {
    let payload = match result {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Deals fetch failed, no candidates this run: {:#}", e);
            return Sourced::Fallback {
                value: Vec::new(),
                reason: format!("{:#}", e),
            };
        }
    };

    let entries = match payload.as_array() {
        Some(entries) => entries,
        None => {
            warn!("Deals payload is not a list, no candidates this run");
            return Sourced::Fallback {
                value: Vec::new(),
                reason: "deals payload is not a list".to_string(),
            };
        }
    };

    let mut deals = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        if !entry.is_object() {
            warn!("Skipping deal entry {}: not an object", idx);
            continue;
        }
        deals.push(deal_from_entry(entry));
    }

    Sourced::Fetched(deals)
}

fn deal_from_entry(entry: &Value) -> MarketDeal {
    let title = text_field(entry, "title");
    let mut deal = MarketDeal::new(&title, &text_field(entry, "gameID"));
    deal.deal_id = text_field(entry, "dealID");
    deal.sale_price = number_field(entry, "salePrice", &title);
    deal.normal_price = number_field(entry, "normalPrice", &title);
    deal.discount_percent = number_field(entry, "savings", &title);
    deal.deal_rating = number_field(entry, "dealRating", &title);
    deal.metacritic_score = number_field(entry, "metacriticScore", &title);
    deal
}

fn text_field(entry: &Value, key: &str) -> String {
    match entry.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Absent fields are 0.0 quietly; present but unparseable ones are logged.
fn number_field(entry: &Value, key: &str, title: &str) -> f64 {
    match entry.get(key) {
        None | Some(Value::Null) => 0.0,
        Some(value) => parse_number(value).unwrap_or_else(|| {
            warn!("Deal '{}': field {} is not numeric ({}), using 0", title, key, value);
            0.0
        }),
    }
}

/// Numbers may arrive as JSON numbers or numeric strings. Non-finite is rejected.
pub fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

// ---------------------------------------------------------------------------
// Price history
// ---------------------------------------------------------------------------

/// Reads `{id: {"cheapestPriceEver": {"price": ...}}}`. A malformed entry maps
/// its id to 0.0; a failed or malformed response yields an empty map.
pub fn normalize_lowest_prices(result: anyhow::Result<Value>) -> Sourced<HashMap<String, f64>> {
    let payload = match result {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Price history unavailable, all-time-low detection disabled: {:#}", e);
            return Sourced::Fallback {
                value: HashMap::new(),
                reason: format!("{:#}", e),
            };
        }
    };

    let entries = match payload.as_object() {
        Some(entries) => entries,
        None => {
            warn!("Price history payload is not an object, all-time-low detection disabled");
            return Sourced::Fallback {
                value: HashMap::new(),
                reason: "price history payload is not an object".to_string(),
            };
        }
    };

    let lows = entries
        .iter()
        .map(|(id, info)| {
            let price = info
                .get("cheapestPriceEver")
                .and_then(|c| c.get("price"))
                .and_then(parse_number);
            if price.is_none() {
                warn!("Price history for game {} is malformed, using 0", id);
            }
            (id.clone(), price.unwrap_or(0.0))
        })
        .collect();

    Sourced::Fetched(lows)
}

/// Ids absent from `lows` get 0.0.
pub fn apply_historical_lows(deals: &mut [MarketDeal], lows: &HashMap<String, f64>) {
    for deal in deals.iter_mut() {
        deal.historical_low_price = lows.get(&deal.game_id).copied().unwrap_or(0.0);
    }
}

/// Ids for the price-history lookup, first occurrence order, no duplicates.
pub fn lookup_ids(deals: &[MarketDeal]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    deals
        .iter()
        .filter(|d| !d.game_id.is_empty() && seen.insert(d.game_id.as_str()))
        .map(|d| d.game_id.clone())
        .collect()
}

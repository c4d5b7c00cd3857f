//! Columnar views of the canonical row sets.

use crate::schema::{BudgetRecord, DecisionRow, MarketDeal, OwnedGame};
use polars::prelude::*;

pub fn budget_frame(records: &[BudgetRecord], period_column: &str, amount_column: &str) -> PolarsResult<DataFrame> {
    let period: Vec<i64> = records.iter().map(|r| r.period_id).collect();
    let amount: Vec<f64> = records.iter().map(|r| r.amount).collect();

    DataFrame::new(vec![
        Series::new(period_column, period),
        Series::new(amount_column, amount),
    ])
}

pub fn library_frame(games: &[OwnedGame]) -> PolarsResult<DataFrame> {
    let title: Vec<&str> = games.iter().map(|g| g.title.as_str()).collect();
    DataFrame::new(vec![Series::new("game_title", title)])
}

pub fn rate_frame(rate: f64) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![Series::new("rate", vec![rate])])
}

pub fn market_frame(deals: &[MarketDeal]) -> PolarsResult<DataFrame> {
    let title: Vec<&str> = deals.iter().map(|d| d.title.as_str()).collect();
    let game_id: Vec<&str> = deals.iter().map(|d| d.game_id.as_str()).collect();
    let deal_id: Vec<&str> = deals.iter().map(|d| d.deal_id.as_str()).collect();
    let sale: Vec<f64> = deals.iter().map(|d| d.sale_price).collect();
    let normal: Vec<f64> = deals.iter().map(|d| d.normal_price).collect();
    let low: Vec<f64> = deals.iter().map(|d| d.historical_low_price).collect();
    let discount: Vec<f64> = deals.iter().map(|d| d.discount_percent).collect();
    let rating: Vec<f64> = deals.iter().map(|d| d.deal_rating).collect();
    let metacritic: Vec<f64> = deals.iter().map(|d| d.metacritic_score).collect();

    DataFrame::new(vec![
        Series::new("title", title),
        Series::new("game_id", game_id),
        Series::new("deal_id", deal_id),
        Series::new("sale_price", sale),
        Series::new("normal_price", normal),
        Series::new("historical_low_price", low),
        Series::new("discount_percent", discount),
        Series::new("deal_rating", rating),
        Series::new("metacritic_score", metacritic),
    ])
}

pub fn decision_frame(rows: &[DecisionRow]) -> PolarsResult<DataFrame> {
    let rank: Vec<u32> = (1..=rows.len() as u32).collect();
    let title: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    let game_id: Vec<&str> = rows.iter().map(|r| r.game_id.as_str()).collect();
    let local_normal: Vec<f64> = rows.iter().map(|r| r.local_normal_price).collect();
    let local_sale: Vec<f64> = rows.iter().map(|r| r.local_sale_price).collect();
    let local_low: Vec<f64> = rows.iter().map(|r| r.local_historical_low).collect();
    let discount: Vec<f64> = rows.iter().map(|r| r.discount_percent).collect();
    let rating: Vec<f64> = rows.iter().map(|r| r.deal_rating).collect();
    let metacritic: Vec<f64> = rows.iter().map(|r| r.metacritic_score).collect();
    let owned: Vec<bool> = rows.iter().map(|r| r.owned).collect();
    let score: Vec<f64> = rows.iter().map(|r| r.final_score).collect();
    let label: Vec<&str> = rows.iter().map(|r| r.decision_label.as_str()).collect();
    let budget: Vec<f64> = rows.iter().map(|r| r.budget_total).collect();

    DataFrame::new(vec![
        Series::new("rank", rank),
        Series::new("title", title),
        Series::new("game_id", game_id),
        Series::new("local_normal_price", local_normal),
        Series::new("local_sale_price", local_sale),
        Series::new("local_historical_low", local_low),
        Series::new("discount_percent", discount),
        Series::new("deal_rating", rating),
        Series::new("metacritic_score", metacritic),
        Series::new("owned", owned),
        Series::new("final_score", score),
        Series::new("decision_label", label),
        Series::new("budget_total", budget),
    ])
}

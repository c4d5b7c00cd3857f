use serde::{Deserialize, Serialize};
use std::fmt;

/// One budget ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub period_id: i64,
    pub amount: f64,
}

/// A title already present in the user's library. Matched by exact string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnedGame {
    pub title: String,
}

/// Candidate game from the deals service. Prices are USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDeal {
    pub title: String,
    pub game_id: String,
    pub deal_id: String,
    pub sale_price: f64,
    pub normal_price: f64,
    /// Lowest price ever recorded; 0.0 when unknown.
    pub historical_low_price: f64,
    pub discount_percent: f64,
    pub deal_rating: f64,
    pub metacritic_score: f64,
}

impl MarketDeal {
    pub fn new(title: &str, game_id: &str) -> Self {
        Self {
            title: title.to_string(),
            game_id: game_id.to_string(),
            deal_id: String::new(),
            sale_price: 0.0,
            normal_price: 0.0,
            historical_low_price: 0.0,
            discount_percent: 0.0,
            deal_rating: 0.0,
            metacritic_score: 0.0,
        }
    }

    pub fn with_prices(mut self, sale: f64, normal: f64) -> Self {
        self.sale_price = sale;
        self.normal_price = normal;
        self
    }

    pub fn with_historical_low(mut self, low: f64) -> Self {
        self.historical_low_price = low;
        self
    }

    pub fn with_quality(mut self, discount_percent: f64, deal_rating: f64, metacritic_score: f64) -> Self {
        self.discount_percent = discount_percent;
        self.deal_rating = deal_rating;
        self.metacritic_score = metacritic_score;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionLabel {
    AlreadyOwned,
    SaveUp,
    AllTimeLow,
    GoodDeal,
    ThinkAboutIt,
    Skip,
}

impl DecisionLabel {
    pub const ALL: [DecisionLabel; 6] = [
        DecisionLabel::AlreadyOwned,
        DecisionLabel::SaveUp,
        DecisionLabel::AllTimeLow,
        DecisionLabel::GoodDeal,
        DecisionLabel::ThinkAboutIt,
        DecisionLabel::Skip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionLabel::AlreadyOwned => "ALREADY_OWNED",
            DecisionLabel::SaveUp => "SAVE_UP",
            DecisionLabel::AllTimeLow => "ALL_TIME_LOW",
            DecisionLabel::GoodDeal => "GOOD_DEAL",
            DecisionLabel::ThinkAboutIt => "THINK_ABOUT_IT",
            DecisionLabel::Skip => "SKIP",
        }
    }
}

impl fmt::Display for DecisionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored, labelled output row. `local_*` prices are USD times the run's rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRow {
    pub title: String,
    pub game_id: String,
    pub deal_id: String,
    pub sale_price_usd: f64,
    pub normal_price_usd: f64,
    pub historical_low_usd: f64,
    pub local_sale_price: f64,
    pub local_normal_price: f64,
    pub local_historical_low: f64,
    pub discount_percent: f64,
    pub deal_rating: f64,
    pub metacritic_score: f64,
    pub owned: bool,
    pub final_score: f64,
    pub decision_label: DecisionLabel,
    pub budget_total: f64,
}

impl DecisionRow {
    pub fn is_all_time_low(&self) -> bool {
        self.decision_label == DecisionLabel::AllTimeLow
    }
}

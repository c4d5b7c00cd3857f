//! Composite score and the labelling decision table.
//!
//! Rules are evaluated in order and the first match wins:
//! owned, over budget, all-time low, then the two score thresholds.

use super::join::JoinedRow;
use crate::schema::{DecisionLabel, DecisionRow};

pub const DISCOUNT_WEIGHT: f64 = 0.4;
pub const RATING_WEIGHT: f64 = 0.3;
pub const METACRITIC_WEIGHT: f64 = 0.3;
/// Deal rating arrives on a 0-10 scale.
pub const RATING_SCALE: f64 = 10.0;

pub const GOOD_DEAL_THRESHOLD: f64 = 75.0;
pub const THINK_ABOUT_IT_THRESHOLD: f64 = 50.0;
/// USD tolerance for the all-time-low comparison.
pub const ATL_EPSILON: f64 = 0.01;

/// Not clamped; out-of-range inputs give out-of-range scores.
pub fn final_score(discount_percent: f64, deal_rating: f64, metacritic_score: f64) -> f64 {
    discount_percent * DISCOUNT_WEIGHT
        + (deal_rating * RATING_SCALE) * RATING_WEIGHT
        + metacritic_score * METACRITIC_WEIGHT
}

/// The all-time-low check compares USD prices, before conversion.
pub fn is_all_time_low(sale_price_usd: f64, historical_low_usd: f64) -> bool {
    sale_price_usd <= historical_low_usd + ATL_EPSILON
}

pub fn classify(row: &JoinedRow, score: f64) -> DecisionLabel {
    let local_sale = row.deal.sale_price * row.rate;

    if row.owned {
        DecisionLabel::AlreadyOwned
    } else if local_sale > row.budget_total {
        DecisionLabel::SaveUp
    } else if is_all_time_low(row.deal.sale_price, row.deal.historical_low_price) {
        DecisionLabel::AllTimeLow
    } else if score >= GOOD_DEAL_THRESHOLD {
        DecisionLabel::GoodDeal
    } else if score >= THINK_ABOUT_IT_THRESHOLD {
        DecisionLabel::ThinkAboutIt
    } else {
        DecisionLabel::Skip
    }
}

pub fn evaluate(row: JoinedRow) -> DecisionRow {
    let score = final_score(row.deal.discount_percent, row.deal.deal_rating, row.deal.metacritic_score);
    let label = classify(&row, score);
    let JoinedRow { deal, rate, budget_total, owned } = row;

    DecisionRow {
        local_sale_price: deal.sale_price * rate,
        local_normal_price: deal.normal_price * rate,
        local_historical_low: deal.historical_low_price * rate,
        sale_price_usd: deal.sale_price,
        normal_price_usd: deal.normal_price,
        historical_low_usd: deal.historical_low_price,
        discount_percent: deal.discount_percent,
        deal_rating: deal.deal_rating,
        metacritic_score: deal.metacritic_score,
        title: deal.title,
        game_id: deal.game_id,
        deal_id: deal.deal_id,
        owned,
        final_score: score,
        decision_label: label,
        budget_total,
    }
}

pub fn evaluate_all(rows: Vec<JoinedRow>) -> Vec<DecisionRow> {
    rows.into_iter().map(evaluate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MarketDeal;

    fn row(deal: MarketDeal, owned: bool, budget_total: f64) -> JoinedRow {
        JoinedRow {
            deal,
            rate: 15_800.0,
            budget_total,
            owned,
        }
    }

    fn priced(sale: f64, low: f64) -> MarketDeal {
        MarketDeal::new("X", "1")
            .with_prices(sale, sale * 2.0)
            .with_historical_low(low)
    }

    #[test]
    fn test_final_score_formula() {
        assert_eq!(final_score(80.0, 9.0, 90.0), 80.0 * 0.4 + 90.0 * 0.3 + 90.0 * 0.3);
        assert!((final_score(80.0, 9.0, 90.0) - 86.0).abs() < 1e-9);
        assert_eq!(final_score(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_final_score_is_not_clamped() {
        assert!(final_score(-50.0, 0.0, 0.0) < 0.0);
        assert!(final_score(100.0, 50.0, 100.0) > 100.0);
    }

    #[test]
    fn test_owned_beats_everything() {
        let deal = priced(10.0, 10.0).with_quality(99.0, 10.0, 99.0);
        let joined = row(deal, true, 1e12);
        let score = final_score(99.0, 10.0, 99.0);
        assert_eq!(classify(&joined, score), DecisionLabel::AlreadyOwned);
    }

    #[test]
    fn test_over_budget_beats_all_time_low() {
        // 10 USD * 15800 = 158000 local
        let joined = row(priced(10.0, 10.0), false, 157_999.0);
        assert_eq!(classify(&joined, 90.0), DecisionLabel::SaveUp);

        let joined = row(priced(10.0, 10.0), false, 158_000.0);
        assert_eq!(classify(&joined, 90.0), DecisionLabel::AllTimeLow);
    }

    #[test]
    fn test_all_time_low_beats_low_score() {
        let joined = row(priced(10.0, 10.0), false, 500_000.0);
        assert_eq!(classify(&joined, 10.0), DecisionLabel::AllTimeLow);

        let joined = row(priced(10.0, 9.995), false, 500_000.0);
        assert_eq!(classify(&joined, 10.0), DecisionLabel::AllTimeLow);

        let joined = row(priced(10.0, 9.98), false, 500_000.0);
        assert_eq!(classify(&joined, 10.0), DecisionLabel::Skip);
    }

    #[test]
    fn test_unknown_history_never_all_time_low() {
        let joined = row(priced(10.0, 0.0), false, 500_000.0);
        assert_eq!(classify(&joined, 10.0), DecisionLabel::Skip);
    }

    #[test]
    fn test_score_thresholds() {
        let joined = row(priced(10.0, 5.0), false, 500_000.0);
        assert_eq!(classify(&joined, 75.0), DecisionLabel::GoodDeal);
        assert_eq!(classify(&joined, 74.99), DecisionLabel::ThinkAboutIt);
        assert_eq!(classify(&joined, 50.0), DecisionLabel::ThinkAboutIt);
        assert_eq!(classify(&joined, 49.99), DecisionLabel::Skip);
    }

    #[test]
    fn test_evaluate_converts_prices() {
        let deal = MarketDeal::new("X", "1")
            .with_prices(10.0, 20.0)
            .with_historical_low(5.0)
            .with_quality(80.0, 9.0, 90.0);
        let decision = evaluate(row(deal, false, 500_000.0));

        assert_eq!(decision.local_sale_price, 158_000.0);
        assert_eq!(decision.local_normal_price, 316_000.0);
        assert_eq!(decision.local_historical_low, 79_000.0);
        assert_eq!(decision.sale_price_usd, 10.0);
        assert_eq!(decision.budget_total, 500_000.0);
        assert_eq!(decision.decision_label, DecisionLabel::GoodDeal);
        assert!((decision.final_score - 86.0).abs() < 1e-9);
    }

    #[test]
    fn test_zeroed_row_is_still_emitted() {
        let rows = evaluate_all(vec![row(MarketDeal::new("Broken", "9"), false, 0.0)]);
        assert_eq!(rows.len(), 1);
        // sale 0 <= low 0 + 0.01
        assert_eq!(rows[0].decision_label, DecisionLabel::AllTimeLow);
        assert_eq!(rows[0].final_score, 0.0);
    }
}

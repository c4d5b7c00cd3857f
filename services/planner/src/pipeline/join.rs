use crate::period::PeriodId;
use crate::schema::{BudgetRecord, MarketDeal, OwnedGame};
use std::collections::HashSet;

/// A deal annotated with the run-wide scalars and its ownership flag.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub deal: MarketDeal,
    pub rate: f64,
    pub budget_total: f64,
    pub owned: bool,
}

/// Sum of ledger amounts dated at or before `period`.
pub fn budget_total(records: &[BudgetRecord], period: PeriodId) -> f64 {
    records
        .iter()
        .filter(|r| period.includes(r.period_id))
        .map(|r| r.amount)
        .sum()
}

/// One row per deal, in arrival order. Ownership is an exact title match.
pub fn join(deals: Vec<MarketDeal>, library: &[OwnedGame], rate: f64, budget_total: f64) -> Vec<JoinedRow> {
    let owned: HashSet<&str> = library.iter().map(|g| g.title.as_str()).collect();

    deals
        .into_iter()
        .map(|deal| {
            let is_owned = owned.contains(deal.title.as_str());
            JoinedRow {
                deal,
                rate,
                budget_total,
                owned: is_owned,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(period_id: i64, amount: f64) -> BudgetRecord {
        BudgetRecord { period_id, amount }
    }

    fn owned(titles: &[&str]) -> Vec<OwnedGame> {
        titles
            .iter()
            .map(|t| OwnedGame { title: t.to_string() })
            .collect()
    }

    #[test]
    fn test_budget_total_excludes_future_periods() {
        let records = vec![
            record(202501, 100_000.0),
            record(202502, 150_000.0),
            record(202503, 250_000.0),
            record(202504, 999_999.0),
        ];
        assert_eq!(budget_total(&records, PeriodId(202503)), 500_000.0);
        assert_eq!(budget_total(&records, PeriodId(202412)), 0.0);
    }

    #[test]
    fn test_budget_total_includes_negative_entries() {
        let records = vec![record(202501, 300_000.0), record(202502, -120_000.0)];
        assert_eq!(budget_total(&records, PeriodId(202502)), 180_000.0);
    }

    #[test]
    fn test_join_broadcasts_scalars() {
        let deals = vec![MarketDeal::new("Hades", "1"), MarketDeal::new("Celeste", "2")];
        let rows = join(deals, &[], 15_800.0, 500_000.0);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.rate == 15_800.0 && r.budget_total == 500_000.0));
        assert_eq!(rows[0].deal.title, "Hades");
        assert_eq!(rows[1].deal.title, "Celeste");
    }

    #[test]
    fn test_join_ownership_is_exact() {
        let deals = vec![
            MarketDeal::new("Hades", "1"),
            MarketDeal::new("hades", "1"),
            MarketDeal::new("Hades: Deluxe Edition", "1"),
        ];
        let rows = join(deals, &owned(&["Hades"]), 1.0, 0.0);
        let flags: Vec<bool> = rows.iter().map(|r| r.owned).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn test_join_empty_deals() {
        assert!(join(Vec::new(), &owned(&["Hades"]), 1.0, 1.0).is_empty());
    }
}

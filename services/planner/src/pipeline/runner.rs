use super::join::{budget_total, join};
use super::normalize::{
    apply_historical_lows, lookup_ids, normalize_budget, normalize_deals, normalize_library,
    normalize_lowest_prices, normalize_rate, Degradation, SourceKind, Sourced,
};
use super::rank::rank;
use super::scoring::evaluate_all;
use crate::config::Config;
use crate::error::PipelineError;
use crate::period::PeriodId;
use crate::schema::{DecisionLabel, DecisionRow};
use crate::sources::{DealFilter, Sources};
use crate::storage::{StagedTables, StagingWriter};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Output of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_at: DateTime<Utc>,
    pub period: PeriodId,
    pub rate: f64,
    pub budget_total: f64,
    pub rows: Vec<DecisionRow>,
    pub degradations: Vec<Degradation>,
    /// Gold directory when staging ran and succeeded.
    pub staged_to: Option<PathBuf>,
}

impl RunReport {
    pub fn atl_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_all_time_low()).count()
    }

    /// Every label in precedence order, including those with zero rows.
    pub fn label_counts(&self) -> Vec<(DecisionLabel, usize)> {
        DecisionLabel::ALL
            .iter()
            .map(|label| {
                let count = self.rows.iter().filter(|r| r.decision_label == *label).count();
                (*label, count)
            })
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

pub struct Pipeline {
    config: Config,
    sources: Sources,
}

impl Pipeline {
    pub fn new(config: Config, sources: Sources) -> Self {
        Self { config, sources }
    }

    /// Runs every stage for `user_id`. `Err` means no table was produced;
    /// a run with zero candidates is still `Ok`.
    pub async fn run(&self, user_id: &str, period: PeriodId) -> Result<RunReport, PipelineError> {
        let run_at = Utc::now();
        let limit = self.config.source_timeout();
        let exchange = &self.config.exchange;
        let filter = DealFilter {
            store_id: self.config.deals.store_id.clone(),
            upper_price: self.config.deals.upper_price,
            page_size: self.config.deals.page_size,
        };

        info!("Starting run for period {} (user {})", period, user_id);

        let (ledger, library, rate, deals) = tokio::join!(
            tokio::time::timeout(limit, self.sources.ledger.load_ledger()),
            bounded(limit, self.sources.library.name(), self.sources.library.fetch_owned_games(user_id)),
            bounded(
                limit,
                self.sources.rates.name(),
                self.sources.rates.fetch_rate(&exchange.base_currency, &exchange.quote_currency),
            ),
            bounded(limit, self.sources.deals.name(), self.sources.deals.fetch_deals(&filter)),
        );

        let ledger = match ledger {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => return Err(PipelineError::LedgerUnavailable(format!("{:#}", e))),
            Err(_) => return Err(PipelineError::LedgerTimeout(limit)),
        };
        let budget = normalize_budget(&ledger, &self.config.ledger)?;
        let budget_total = budget_total(&budget, period);
        debug!("Ledger has {} records, {} usable this period", budget.len(), budget_total);

        let mut degradations = Vec::new();
        let library = track(SourceKind::Library, normalize_library(library), &mut degradations);
        let rate = track(SourceKind::ExchangeRate, normalize_rate(rate, exchange.fallback_rate), &mut degradations);
        let mut market = track(SourceKind::Deals, normalize_deals(deals), &mut degradations);

        let ids = lookup_ids(&market);
        if !ids.is_empty() {
            let history = bounded(
                limit,
                self.sources.history.name(),
                self.sources.history.fetch_lowest_prices(&ids),
            )
            .await;
            let lows = track(SourceKind::PriceHistory, normalize_lowest_prices(history), &mut degradations);
            apply_historical_lows(&mut market, &lows);
        }

        let joined = join(market.clone(), &library, rate, budget_total);
        let rows = rank(evaluate_all(joined));

        let mut report = RunReport {
            run_at,
            period,
            rate,
            budget_total,
            rows,
            degradations,
            staged_to: None,
        };

        if self.config.staging.enabled {
            let writer = StagingWriter::new(&self.config.data_dir);
            let staged = StagedTables {
                budget: &budget,
                library: &library,
                rate,
                market: &market,
                decisions: &report.rows,
            };
            match writer.stage(period, run_at, &staged) {
                Ok((_, gold)) => report.staged_to = Some(gold),
                Err(e) => warn!("Staging failed, run result kept in memory only: {:#}", e),
            }
        }

        info!(
            "Run complete: {} rows, {} all-time lows, rate {}, budget {}, {} degradation(s)",
            report.rows.len(),
            report.atl_count(),
            report.rate,
            report.budget_total,
            report.degradations.len()
        );

        Ok(report)
    }
}

/// Bounds a collaborator call; an elapsed timer becomes an ordinary failure.
async fn bounded<T, F>(limit: Duration, source: &str, call: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("{} did not respond within {:?}", source, limit)),
    }
}

fn track<T>(source: SourceKind, sourced: Sourced<T>, degradations: &mut Vec<Degradation>) -> T {
    if let Some(reason) = sourced.fallback_reason() {
        degradations.push(Degradation {
            source,
            reason: reason.to_string(),
        });
    }
    sourced.into_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DealsConfig, ExchangeConfig, LedgerConfig, LibraryConfig, MockConfig, StagingConfig, TimeoutConfig,
    };
    use crate::schema::{BudgetRecord, MarketDeal};
    use crate::sources::{MockDeals, MockLedger, MockLibrary, MockRates};
    use polars::prelude::{DataFrame, NamedFrom, Series};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    const USER: &str = "76561198000000000";

    fn test_config(data_dir: &str) -> Config {
        Config {
            data_dir: data_dir.to_string(),
            ledger: LedgerConfig::default(),
            library: LibraryConfig::default(),
            exchange: ExchangeConfig::default(),
            deals: DealsConfig::default(),
            timeouts: TimeoutConfig { source_secs: 1 },
            staging: StagingConfig { enabled: false },
            mock: MockConfig::default(),
        }
    }

    fn ledger_500k() -> MockLedger {
        MockLedger::new(vec![
            BudgetRecord { period_id: 202501, amount: 100_000.0 },
            BudgetRecord { period_id: 202502, amount: 150_000.0 },
            BudgetRecord { period_id: 202503, amount: 250_000.0 },
        ])
    }

    fn deal_x(low: f64, discount: f64, rating: f64, metacritic: f64) -> MarketDeal {
        MarketDeal::new("X", "42")
            .with_prices(10.0, 20.0)
            .with_historical_low(low)
            .with_quality(discount, rating, metacritic)
    }

    fn sources(ledger: MockLedger, library: MockLibrary, rates: MockRates, deals: MockDeals) -> Sources {
        let deals = Arc::new(deals);
        Sources {
            ledger: Arc::new(ledger),
            library: Arc::new(library),
            rates: Arc::new(rates),
            deals: deals.clone(),
            history: deals,
        }
    }

    async fn run_with(sources: Sources) -> Result<RunReport, PipelineError> {
        Pipeline::new(test_config("unused"), sources)
            .run(USER, PeriodId(202503))
            .await
    }

    #[tokio::test]
    async fn test_run_all_time_low_scenario() {
        let report = run_with(sources(
            ledger_500k(),
            MockLibrary::new(&[]),
            MockRates::new(15_800.0),
            MockDeals::new(&[deal_x(10.0, 50.0, 8.0, 85.0)]),
        ))
        .await
        .unwrap();

        assert_eq!(report.budget_total, 500_000.0);
        assert_eq!(report.rate, 15_800.0);
        assert_eq!(report.period, PeriodId(202503));
        assert!(!report.is_degraded());

        let row = &report.rows[0];
        assert_eq!(row.local_sale_price, 158_000.0);
        assert_eq!(row.decision_label, DecisionLabel::AllTimeLow);
        assert_eq!(report.atl_count(), 1);
    }

    #[tokio::test]
    async fn test_run_good_deal_scenario() {
        let report = run_with(sources(
            ledger_500k(),
            MockLibrary::new(&[]),
            MockRates::new(15_800.0),
            MockDeals::new(&[deal_x(5.0, 80.0, 9.0, 90.0)]),
        ))
        .await
        .unwrap();

        let row = &report.rows[0];
        assert!((row.final_score - 86.0).abs() < 1e-9);
        assert_eq!(row.historical_low_usd, 5.0);
        assert_eq!(row.decision_label, DecisionLabel::GoodDeal);
        assert_eq!(report.atl_count(), 0);
    }

    #[tokio::test]
    async fn test_run_excludes_future_budget() {
        let ledger = MockLedger::new(vec![
            BudgetRecord { period_id: 202503, amount: 100_000.0 },
            BudgetRecord { period_id: 202504, amount: 900_000.0 },
        ]);
        let report = run_with(sources(
            ledger,
            MockLibrary::new(&[]),
            MockRates::new(15_800.0),
            MockDeals::new(&[deal_x(5.0, 80.0, 9.0, 90.0)]),
        ))
        .await
        .unwrap();

        assert_eq!(report.budget_total, 100_000.0);
        assert_eq!(report.rows[0].decision_label, DecisionLabel::SaveUp);
    }

    #[tokio::test]
    async fn test_run_owned_title() {
        let report = run_with(sources(
            ledger_500k(),
            MockLibrary::new(&["X"]),
            MockRates::new(15_800.0),
            MockDeals::new(&[deal_x(10.0, 99.0, 10.0, 99.0)]),
        ))
        .await
        .unwrap();

        assert!(report.rows[0].owned);
        assert_eq!(report.rows[0].decision_label, DecisionLabel::AlreadyOwned);
    }

    #[tokio::test]
    async fn test_run_rate_failure_uses_fallback() {
        let report = run_with(sources(
            ledger_500k(),
            MockLibrary::new(&[]),
            MockRates::failing(),
            MockDeals::new(&[deal_x(10.0, 50.0, 8.0, 85.0)]),
        ))
        .await
        .unwrap();

        assert_eq!(report.rate, 16_000.0);
        assert_eq!(report.rows[0].local_sale_price, 160_000.0);
        assert_eq!(report.degradations.len(), 1);
        assert_eq!(report.degradations[0].source, SourceKind::ExchangeRate);
    }

    #[tokio::test]
    async fn test_run_rate_timeout_uses_fallback() {
        let report = run_with(sources(
            ledger_500k(),
            MockLibrary::new(&[]),
            MockRates::new(15_800.0).with_delay(Duration::from_secs(3)),
            MockDeals::new(&[deal_x(10.0, 50.0, 8.0, 85.0)]),
        ))
        .await
        .unwrap();

        assert_eq!(report.rate, 16_000.0);
        assert!(report.degradations[0].reason.contains("did not respond"));
    }

    #[tokio::test]
    async fn test_run_library_failure_owns_nothing() {
        let report = run_with(sources(
            ledger_500k(),
            MockLibrary::failing(),
            MockRates::new(15_800.0),
            MockDeals::new(&[deal_x(10.0, 50.0, 8.0, 85.0), deal_x(5.0, 80.0, 9.0, 90.0)]),
        ))
        .await
        .unwrap();

        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().all(|r| !r.owned));
        assert!(report.rows.iter().all(|r| r.decision_label != DecisionLabel::AlreadyOwned));
        assert_eq!(report.degradations[0].source, SourceKind::Library);
    }

    #[tokio::test]
    async fn test_run_history_failure_disables_atl() {
        let report = run_with(sources(
            ledger_500k(),
            MockLibrary::new(&[]),
            MockRates::new(15_800.0),
            MockDeals::new(&[deal_x(10.0, 50.0, 8.0, 85.0)]).failing_history(),
        ))
        .await
        .unwrap();

        let row = &report.rows[0];
        assert_eq!(row.historical_low_usd, 0.0);
        assert_eq!(row.decision_label, DecisionLabel::ThinkAboutIt);
        assert_eq!(report.degradations[0].source, SourceKind::PriceHistory);
    }

    #[tokio::test]
    async fn test_run_malformed_history_entry_is_isolated() {
        let deals = MockDeals::new(&[
            deal_x(10.0, 50.0, 8.0, 85.0),
            MarketDeal::new("Y", "43").with_prices(4.0, 8.0).with_historical_low(4.0),
        ])
        .with_history_payload(json!({
            "42": {"cheapestPriceEver": {"price": "10.00"}},
            "43": {"cheapestPriceEver": null}
        }));
        let report = run_with(sources(ledger_500k(), MockLibrary::new(&[]), MockRates::new(15_800.0), deals))
            .await
            .unwrap();

        let x = report.rows.iter().find(|r| r.title == "X").unwrap();
        let y = report.rows.iter().find(|r| r.title == "Y").unwrap();
        assert_eq!(x.decision_label, DecisionLabel::AllTimeLow);
        assert_eq!(y.historical_low_usd, 0.0);
        assert_eq!(y.decision_label, DecisionLabel::Skip);
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn test_run_with_no_deals_is_ok() {
        let report = run_with(sources(
            ledger_500k(),
            MockLibrary::new(&[]),
            MockRates::new(15_800.0),
            MockDeals::new(&[]).failing_deals(),
        ))
        .await
        .unwrap();

        assert!(report.rows.is_empty());
        assert_eq!(report.budget_total, 500_000.0);
        assert_eq!(report.degradations[0].source, SourceKind::Deals);
    }

    #[tokio::test]
    async fn test_run_ranks_atl_first() {
        let deals = MockDeals::new(&[
            MarketDeal::new("Great", "1").with_prices(10.0, 40.0).with_historical_low(2.0).with_quality(95.0, 9.5, 95.0),
            MarketDeal::new("Cheap", "2").with_prices(3.0, 4.0).with_historical_low(3.0).with_quality(25.0, 3.0, 60.0),
            MarketDeal::new("Meh", "3").with_prices(5.0, 8.0).with_historical_low(1.0).with_quality(40.0, 6.0, 70.0),
        ]);
        let report = run_with(sources(ledger_500k(), MockLibrary::new(&[]), MockRates::new(15_800.0), deals))
            .await
            .unwrap();

        let titles: Vec<&str> = report.rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Cheap", "Great", "Meh"]);

        let counts = report.label_counts();
        assert_eq!(counts.len(), DecisionLabel::ALL.len());
        assert!(counts.contains(&(DecisionLabel::AllTimeLow, 1)));
        assert!(counts.contains(&(DecisionLabel::GoodDeal, 1)));
        assert!(counts.contains(&(DecisionLabel::ThinkAboutIt, 1)));
        assert!(counts.contains(&(DecisionLabel::Skip, 0)));
    }

    #[tokio::test]
    async fn test_run_ledger_unavailable_is_fatal() {
        let err = run_with(sources(
            MockLedger::unavailable(),
            MockLibrary::new(&[]),
            MockRates::new(15_800.0),
            MockDeals::new(&[deal_x(10.0, 50.0, 8.0, 85.0)]),
        ))
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::LedgerUnavailable(_)));
        assert!(err.is_missing_input());
    }

    #[tokio::test]
    async fn test_run_ledger_bad_column_is_fatal() {
        let frame = DataFrame::new(vec![
            Series::new("bulan_id", vec![202503i64]),
            Series::new("budget_final_game", vec!["lots"]),
        ])
        .unwrap();
        let err = run_with(sources(
            MockLedger::from_frame(frame),
            MockLibrary::new(&[]),
            MockRates::new(15_800.0),
            MockDeals::new(&[]),
        ))
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::LedgerColumn { .. }));
        assert!(!err.is_missing_input());
    }

    #[tokio::test]
    async fn test_run_ledger_timeout_is_fatal() {
        let err = run_with(sources(
            ledger_500k().with_delay(Duration::from_secs(3)),
            MockLibrary::new(&[]),
            MockRates::new(15_800.0),
            MockDeals::new(&[]),
        ))
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::LedgerTimeout(_)));
    }

    #[tokio::test]
    async fn test_run_stages_tables() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir.path().to_string_lossy());
        config.staging.enabled = true;

        let pipeline = Pipeline::new(
            config,
            sources(
                ledger_500k(),
                MockLibrary::new(&["Z"]),
                MockRates::new(15_800.0),
                MockDeals::new(&[deal_x(10.0, 50.0, 8.0, 85.0)]),
            ),
        );
        let report = pipeline.run(USER, PeriodId(202503)).await.unwrap();

        let gold = report.staged_to.clone().unwrap();
        assert!(gold.starts_with(temp_dir.path().join("gold").join("period=202503")));
        assert!(gold.join("decisions.parquet").exists());
    }
}

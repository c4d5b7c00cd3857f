pub mod cheapshark;
pub mod exchange;
pub mod http;
pub mod ledger;
pub mod mock;
pub mod steam;
pub mod traits;

pub use cheapshark::CheapShark;
pub use exchange::ExchangeRateApi;
pub use ledger::FileLedger;
pub use mock::{MockDeals, MockLedger, MockLibrary, MockRates};
pub use steam::{is_steam_id64, SteamLibrary};
pub use traits::{DealFilter, DealSource, LedgerSource, LibrarySource, PriceHistorySource, RateSource};

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;

/// The five collaborators a run draws on.
#[derive(Clone)]
pub struct Sources {
    pub ledger: Arc<dyn LedgerSource>,
    pub library: Arc<dyn LibrarySource>,
    pub rates: Arc<dyn RateSource>,
    pub deals: Arc<dyn DealSource>,
    pub history: Arc<dyn PriceHistorySource>,
}

impl Sources {
    /// Live HTTP sources plus the file ledger named in the config.
    pub fn live(config: &Config) -> Result<Self> {
        let client = http::build_client(config.source_timeout())?;
        let cheapshark = Arc::new(CheapShark::new(client.clone(), &config.deals));

        Ok(Self {
            ledger: Arc::new(FileLedger::new(&config.ledger.path)),
            library: Arc::new(SteamLibrary::new(client.clone(), &config.library)),
            rates: Arc::new(ExchangeRateApi::new(client, &config.exchange)),
            deals: cheapshark.clone(),
            history: cheapshark,
        })
    }

    /// Offline sources: a flat monthly allowance, an empty library, the
    /// fallback rate and a generated deal catalogue.
    pub fn mock(config: &Config, last_period: i64) -> Self {
        let deals = Arc::new(MockDeals::generated(config.mock.deal_count, config.mock.seed));

        Self {
            ledger: Arc::new(
                MockLedger::monthly(last_period, 250_000.0)
                    .with_columns(&config.ledger.period_column, &config.ledger.amount_column),
            ),
            library: Arc::new(MockLibrary::new(&[])),
            rates: Arc::new(MockRates::new(config.exchange.fallback_rate)),
            deals: deals.clone(),
            history: deals,
        }
    }
}

use crate::period::PeriodId;
use crate::schema::{BudgetRecord, DecisionRow, MarketDeal, OwnedGame};
use crate::storage::tables;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

/// Normalized inputs and the ranked output of one run.
pub struct StagedTables<'a> {
    pub budget: &'a [BudgetRecord],
    pub library: &'a [OwnedGame],
    pub rate: f64,
    pub market: &'a [MarketDeal],
    pub decisions: &'a [DecisionRow],
}

/// Writes run tables as Parquet:
/// `bronze/period=YYYYMM/run=<ts>/{budget,library,rate,market}.parquet` and
/// `gold/period=YYYYMM/run=<ts>/decisions.parquet`.
pub struct StagingWriter {
    data_dir: PathBuf,
}

impl StagingWriter {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn run_dir(&self, layer: &str, period: PeriodId, run_ts: DateTime<Utc>) -> PathBuf {
        self.data_dir
            .join(layer)
            .join(period.path_segment())
            .join(format!("run={}", run_ts.format("%Y%m%dT%H%M%S")))
    }

    /// Returns the bronze and gold directories written.
    pub fn stage(&self, period: PeriodId, run_ts: DateTime<Utc>, staged: &StagedTables<'_>) -> Result<(PathBuf, PathBuf)> {
        let bronze = self.run_dir("bronze", period, run_ts);
        let gold = self.run_dir("gold", period, run_ts);

        write_frame(&bronze, "budget", tables::budget_frame(staged.budget, "period_id", "amount")?)?;
        write_frame(&bronze, "library", tables::library_frame(staged.library)?)?;
        write_frame(&bronze, "rate", tables::rate_frame(staged.rate)?)?;
        write_frame(&bronze, "market", tables::market_frame(staged.market)?)?;
        write_frame(&gold, "decisions", tables::decision_frame(staged.decisions)?)?;

        info!("Staged run tables under {:?} and {:?}", bronze, gold);
        Ok((bronze, gold))
    }
}

fn write_frame(dir: &Path, name: &str, mut df: DataFrame) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {:?}", dir))?;

    let temp_file = dir.join(format!("{}.parquet.tmp", name));
    let final_file = dir.join(format!("{}.parquet", name));

    let file = std::fs::File::create(&temp_file)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_file))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .context("Failed to write Parquet file")?;

    // Atomic rename
    std::fs::rename(&temp_file, &final_file)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_file, final_file))?;

    info!("Wrote {} rows to {:?}", df.height(), final_file);
    Ok(())
}

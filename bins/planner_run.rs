//! Budget-aware game deal planner.
//!
//! Usage:
//!   planner_run --steam-id 76561198000000000
//!   planner_run --steam-id 76561198000000000 --period 2025-03 --json
//!   planner_run --mock --steam-id demo

use anyhow::{bail, Context, Result};
use clap::Parser;
use planner::config::Config;
use planner::period::PeriodId;
use planner::pipeline::{Pipeline, RunReport};
use planner::sources::{is_steam_id64, Sources};
use serde_json::json;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "planner_run")]
#[command(about = "Rank current game deals against your budget and library")]
struct Cli {
    #[arg(long, default_value = "config/planner.toml")]
    config: String,
    /// SteamID64 whose library marks titles as owned
    #[arg(long)]
    steam_id: String,
    /// Budget period as YYYYMM or YYYY-MM; defaults to the current month
    #[arg(long)]
    period: Option<String>,
    /// Use offline sources instead of the live services
    #[arg(long)]
    mock: bool,
    /// Emit one JSON object per row followed by a summary object
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let user_id = cli.steam_id.trim();
    if user_id.is_empty() {
        bail!("--steam-id must not be empty");
    }
    if !is_steam_id64(user_id) {
        warn!("'{}' does not look like a SteamID64, the library lookup may come back empty", user_id);
    }

    let period = match &cli.period {
        Some(raw) => match PeriodId::parse(raw) {
            Some(period) => period,
            None => bail!("Invalid --period '{}', expected YYYYMM or YYYY-MM", raw),
        },
        None => PeriodId::current(),
    };

    let config = Config::load(&cli.config)?;
    let sources = if cli.mock || config.mock.enabled {
        info!("Using mock sources");
        Sources::mock(&config, period.0)
    } else {
        Sources::live(&config).context("Failed to set up live sources")?
    };

    let pipeline = Pipeline::new(config, sources);
    let report = pipeline
        .run(user_id, period)
        .await
        .context("Planner run did not produce a result")?;

    if cli.json {
        print_json(&report)?;
    } else {
        print_table(&report);
    }

    Ok(())
}

fn print_json(report: &RunReport) -> Result<()> {
    for (idx, row) in report.rows.iter().enumerate() {
        let mut value = serde_json::to_value(row).context("Failed to serialize decision row")?;
        value["rank"] = json!(idx + 1);
        println!("{}", value);
    }

    let counts: serde_json::Map<String, serde_json::Value> = report
        .label_counts()
        .into_iter()
        .map(|(label, count)| (label.to_string(), json!(count)))
        .collect();
    let summary = json!({
        "period": report.period.to_string(),
        "rate": report.rate,
        "budget_total": report.budget_total,
        "atl_count": report.atl_count(),
        "label_counts": counts,
        "degradations": report.degradations,
        "staged_to": report.staged_to,
    });
    println!("{}", summary);
    Ok(())
}

fn print_table(report: &RunReport) {
    println!(
        "{:>4}  {:<36} {:>14} {:>14} {:>6} {:>7}  {}",
        "#", "Title", "Sale", "Lowest", "Off%", "Score", "Decision"
    );
    for (idx, row) in report.rows.iter().enumerate() {
        println!(
            "{:>4}  {:<36} {:>14.0} {:>14.0} {:>6.0} {:>7.1}  {}{}",
            idx + 1,
            truncate(&row.title, 36),
            row.local_sale_price,
            row.local_historical_low,
            row.discount_percent,
            row.final_score,
            row.decision_label,
            if row.owned { " (owned)" } else { "" }
        );
    }

    println!("\n=== Run Summary ===");
    println!("Period: {}", report.period);
    println!("Exchange rate: {}", report.rate);
    println!("Budget available: {:.0}", report.budget_total);
    println!("Candidates: {}", report.rows.len());
    println!("All-time lows: {}", report.atl_count());
    for (label, count) in report.label_counts() {
        println!("  {}: {}", label, count);
    }
    for degradation in &report.degradations {
        println!("Degraded {}: {}", degradation.source, degradation.reason);
    }
    if let Some(dir) = &report.staged_to {
        println!("Staged to: {}", dir.display());
    }
}

fn truncate(title: &str, width: usize) -> String {
    if title.chars().count() <= width {
        title.to_string()
    } else {
        let mut short: String = title.chars().take(width - 1).collect();
        short.push('~');
        short
    }
}

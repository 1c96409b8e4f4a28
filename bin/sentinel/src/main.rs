use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, IndicatorValues, MarketInput};
use store::{HoldingsLedger, SqliteSignalStore};
use strategy::{indicators, IndicatorFileConfig, SignalAnalyzer};

/// BTC cycle signal and MSTR P/BYD tracker.
#[derive(Debug, Parser)]
#[command(name = "sentinel", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the BTC signal analysis and persist the updated state.
    Analyze(AnalyzeArgs),
    /// Derive EMA and weekly RSI from close-price series (JSON arrays).
    Indicators {
        /// Daily closes, oldest first.
        #[arg(long)]
        daily: PathBuf,
        /// Weekly closes, oldest first.
        #[arg(long)]
        weekly: PathBuf,
    },
    /// Compute P/BYD against the holdings ledger.
    Pbyd {
        /// Current BTC holdings; defaults to the latest ledger entry.
        #[arg(long)]
        holdings: Option<f64>,
        /// Current mNAV.
        #[arg(long)]
        mnav: f64,
        /// Reference date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Maintain the BTC holdings ledger.
    Holdings {
        #[command(subcommand)]
        action: HoldingsAction,
    },
    /// Show the persisted signal state.
    State,
    /// Summarize signal history.
    History {
        #[arg(long, default_value_t = 90)]
        days: u32,
    },
    /// Reset the signal state to its defaults.
    Reset,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Collector record: {"price": .., "indicators": {"ema_200": .., "weekly_rsi": .., "mvrv": ..}}
    #[arg(long, conflicts_with_all = ["price", "ema_200", "weekly_rsi", "mvrv"])]
    snapshot: Option<PathBuf>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long = "ema-200")]
    ema_200: Option<f64>,
    #[arg(long)]
    weekly_rsi: Option<f64>,
    #[arg(long)]
    mvrv: Option<f64>,
    /// Analysis date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
enum HoldingsAction {
    /// Record holdings for a date.
    Add {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        btc: i64,
    },
    /// Print all ledger entries.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cli = Cli::parse();
    let cfg = Config::from_env();
    let today = Utc::now().date_naive();

    match cli.command {
        Command::Analyze(args) => {
            let input = read_input(&args).await?;
            let analyzer = build_analyzer(&cfg).await;
            let report = analyzer
                .analyze_input(&input, args.date.unwrap_or(today))
                .await;
            info!(
                status = %report.signal_status.status,
                market = %report.market_status,
                "Analysis complete"
            );
            print_json(&report)
        }

        Command::Indicators { daily, weekly } => {
            let indicator_cfg = IndicatorFileConfig::load(&cfg.indicator_config_path)?;
            let daily_closes: Vec<f64> = read_json(&daily).await?;
            let weekly_closes: Vec<f64> = read_json(&weekly).await?;
            let derived = indicators::derive(&daily_closes, &weekly_closes, &indicator_cfg)
                .context("Could not derive indicators")?;
            print_json(&derived)
        }

        Command::Pbyd {
            holdings,
            mnav,
            date,
        } => {
            let ledger = HoldingsLedger::load(&cfg.holdings_path).await?;
            let current = match holdings {
                Some(h) => h,
                None => match ledger.latest() {
                    Some((date, btc)) => {
                        info!(date, btc, "Using latest ledger entry as current holdings");
                        btc as f64
                    }
                    None => 0.0,
                },
            };
            let result = pbyd::calculate_full_pbyd(current, mnav, ledger.holdings(), date);
            if let Some(reason) = &result.reason {
                warn!(reason = %reason, "P/BYD not available");
            }
            print_json(&result)
        }

        Command::Holdings { action } => {
            let mut ledger = HoldingsLedger::load(&cfg.holdings_path).await?;
            match action {
                HoldingsAction::Add { date, btc } => {
                    ledger.add_holdings(date, btc).await?;
                    print_json(ledger.holdings())
                }
                HoldingsAction::List => print_json(ledger.holdings()),
            }
        }

        Command::State => {
            let analyzer = build_analyzer(&cfg).await;
            print_json(&analyzer.current_state(today).await)
        }

        Command::History { days } => {
            let analyzer = build_analyzer(&cfg).await;
            let history = analyzer.signal_history(days, today).await?;
            print_json(&history)
        }

        Command::Reset => {
            let analyzer = build_analyzer(&cfg).await;
            if !analyzer.reset_signal_state(today).await {
                bail!("Signal state could not be reset");
            }
            info!("Signal state reset");
            Ok(())
        }
    }
}

/// Analyzer backed by SQLite when configured. A store that cannot be opened
/// is logged and the analyzer runs without persistence.
async fn build_analyzer(cfg: &Config) -> SignalAnalyzer {
    let Some(url) = &cfg.database_url else {
        warn!("DATABASE_URL not set - signal state will not be persisted");
        return SignalAnalyzer::without_store();
    };

    match SqliteSignalStore::connect(url).await {
        Ok(store) => SignalAnalyzer::new(Arc::new(store)),
        Err(e) => {
            warn!(error = %e, "Signal state store unavailable, continuing without persistence");
            SignalAnalyzer::without_store()
        }
    }
}

async fn read_input(args: &AnalyzeArgs) -> anyhow::Result<MarketInput> {
    if let Some(path) = &args.snapshot {
        return read_json(path).await;
    }
    Ok(MarketInput {
        price: args.price,
        indicators: IndicatorValues {
            ema_200: args.ema_200,
            weekly_rsi: args.weekly_rsi,
            mvrv: args.mvrv,
        },
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "sentinel", "analyze", "--price", "100", "--ema-200", "90", "--weekly-rsi", "71",
            "--mvrv", "3.1", "--date", "2025-03-01",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.price, Some(100.0));
        assert_eq!(args.ema_200, Some(90.0));
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn snapshot_conflicts_with_inline_values() {
        let parsed = Cli::try_parse_from([
            "sentinel", "analyze", "--snapshot", "snap.json", "--price", "100",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_parses_holdings_add() {
        let cli = Cli::try_parse_from([
            "sentinel", "holdings", "add", "--date", "2025-07-21", "--btc", "607770",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Holdings {
                action: HoldingsAction::Add { btc: 607770, .. }
            }
        ));
    }

    #[tokio::test]
    async fn inline_flags_build_partial_input() {
        let args = AnalyzeArgs {
            snapshot: None,
            price: Some(100.0),
            ema_200: None,
            weekly_rsi: Some(50.0),
            mvrv: None,
            date: None,
        };
        let snapshot = read_input(&args).await.unwrap().snapshot();
        assert_eq!(snapshot.price, 100.0);
        assert_eq!(snapshot.ema_200, 0.0);
        assert_eq!(snapshot.weekly_rsi, 50.0);
    }
}

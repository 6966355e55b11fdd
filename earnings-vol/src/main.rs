//! Earnings Event Strategy Analyzer CLI
//!
//! # Usage
//!
//! ```bash
//! # Analyze a parquet chain snapshot
//! earnings-vol analyze --chains data/nvda.parquet --event-date 2026-02-25 --historical-p75 0.07
//!
//! # Run on a synthetic scenario
//! earnings-vol demo --scenario baseline --seed 42 --output report.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use earnings_vol::analytics::{earnings_move_p75, implied_move_from_chain};
use earnings_vol::data::synthetic::DEFAULT_SPOT;
use earnings_vol::data::{generate_data_set, select_term_structure, ChainLoader, SyntheticScenario};
use earnings_vol::error::ModelWarning;
use earnings_vol::{AnalysisEngine, AnalysisReport, EngineConfig, RunInputs, SlippageModel, TermStructure};

#[derive(Parser)]
#[command(name = "earnings-vol")]
#[command(about = "Earnings event option structure analyzer")]
#[command(version)]
struct Cli {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a chain snapshot from a parquet file
    Analyze {
        /// Parquet file with one or more trade dates of chain rows
        #[arg(long)]
        chains: PathBuf,

        /// Ticker label for the report
        #[arg(long, default_value = "UNDERLYING")]
        ticker: String,

        /// Earnings event date (YYYY-MM-DD)
        #[arg(long)]
        event_date: String,

        /// Implied move fraction; computed from the front ATM straddle if omitted
        #[arg(long)]
        implied_move: Option<f64>,

        /// 75th percentile absolute historical earnings move (fraction)
        #[arg(long)]
        historical_p75: f64,

        /// Trade date to analyze (YYYY-MM-DD); latest in file if omitted
        #[arg(long)]
        valuation_date: Option<String>,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze a synthetic market scenario
    Demo {
        /// Scenario name (baseline, high_vol, low_vol, term_inverted, flat_term,
        /// negative_event_var, extreme_front_premium, sparse_chain)
        #[arg(long, default_value = "baseline")]
        scenario: String,

        /// Seed for the synthetic data
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Spot price of the synthetic underlying
        #[arg(long, default_value_t = DEFAULT_SPOT)]
        spot: f64,

        /// Valuation date (YYYY-MM-DD); today if omitted
        #[arg(long)]
        valuation_date: Option<String>,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_date(raw: &str, what: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("Invalid {} format", what))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::from_json_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Implied move from the front chain, with its warning.
fn front_implied_move(
    config: &EngineConfig,
    ts: &TermStructure,
    spot: f64,
) -> Result<(f64, Option<ModelWarning>)> {
    let im = implied_move_from_chain(
        &ts.front,
        spot,
        &SlippageModel::new(config.payoff.slippage_fraction),
        config.event.implied_move_max_spread_pct,
    )
    .context("Failed to compute implied move")?;
    Ok((im.fraction, im.warning))
}

fn finish(report: &AnalysisReport, output: Option<&Path>) -> Result<()> {
    println!("{}", report.summary());
    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = report.to_json().context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote report");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    config: EngineConfig,
    chains: PathBuf,
    ticker: String,
    event_date: NaiveDate,
    implied_move: Option<f64>,
    historical_p75: f64,
    valuation_date: Option<NaiveDate>,
    output: Option<PathBuf>,
) -> Result<()> {
    let loader = ChainLoader::new(&chains);
    let snapshot = loader
        .load_snapshot(&ticker, valuation_date)
        .with_context(|| format!("Failed to load chains from {}", chains.display()))?;
    let spot = snapshot.spot();
    let ts = select_term_structure(&snapshot, event_date, snapshot.date)?;

    let (implied_move, im_warning) = match implied_move {
        Some(m) => (m, None),
        None => front_implied_move(&config, &ts, spot)?,
    };

    let engine = AnalysisEngine::new(config)?;
    let inputs = RunInputs {
        spot,
        valuation_date: snapshot.date,
        event_date,
        implied_move,
        historical_p75,
    };
    let mut report = engine.run(&ts, &inputs)?;
    report.warnings.extend(im_warning);
    finish(&report, output.as_deref())
}

fn cmd_demo(
    config: EngineConfig,
    scenario: String,
    seed: u64,
    spot: f64,
    valuation_date: NaiveDate,
    output: Option<PathBuf>,
) -> Result<()> {
    let scenario = SyntheticScenario::from_name(&scenario).ok_or_else(|| {
        let names: Vec<_> = SyntheticScenario::ALL.iter().map(|s| s.name()).collect();
        anyhow!("Unknown scenario '{}'; expected one of {}", scenario, names.join(", "))
    })?;
    let data = generate_data_set(scenario, spot, valuation_date, seed);

    let (implied_move, im_warning) = front_implied_move(&config, &data.term_structure, spot)?;
    let historical_p75 = earnings_move_p75(&data.history, &data.earnings_dates)
        .context("Failed to compute historical P75")?;

    let engine = AnalysisEngine::new(config)?;
    let inputs = RunInputs {
        spot,
        valuation_date: data.valuation_date,
        event_date: data.event_date,
        implied_move,
        historical_p75,
    };
    let mut report = engine.run(&data.term_structure, &inputs)?;
    report.warnings.extend(im_warning);
    finish(&report, output.as_deref())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("earnings_vol=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            chains,
            ticker,
            event_date,
            implied_move,
            historical_p75,
            valuation_date,
            output,
        } => {
            let event_date = parse_date(&event_date, "event date")?;
            let valuation_date = valuation_date
                .map(|d| parse_date(&d, "valuation date"))
                .transpose()?;
            cmd_analyze(
                config,
                chains,
                ticker,
                event_date,
                implied_move,
                historical_p75,
                valuation_date,
                output,
            )?;
        }
        Commands::Demo {
            scenario,
            seed,
            spot,
            valuation_date,
            output,
        } => {
            let valuation_date = match valuation_date {
                Some(d) => parse_date(&d, "valuation date")?,
                None => Utc::now().date_naive(),
            };
            cmd_demo(config, scenario, seed, spot, valuation_date, output)?;
        }
    }

    Ok(())
}

//! CLI definition and dispatch.

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{fetch_series, run_backtest, BacktestConfig, BacktestResult};
use crate::domain::candle::Candle;
use crate::domain::config_validation::{
    load_backtest_config, load_strategy, load_sweep_ranges,
};
use crate::domain::error::TradebenchError;
use crate::domain::indicator::TrendBias;
use crate::domain::optimize::{combination_count, ParamSweep, SweepReport};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "tradebench", about = "Single-symbol strategy backtester")]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>_<timeframe>.csv files
        #[arg(short, long)]
        data: PathBuf,
        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Sweep the [optimize] parameter ranges
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Run combinations one at a time
        #[arg(long)]
        sequential: bool,
    },
    /// Validate a configuration without running it
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols with data for a timeframe
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        timeframe: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            symbol,
        } => run_backtest_command(&config, &data, output.as_deref(), symbol.as_deref()),
        Command::Optimize {
            config,
            data,
            output,
            sequential,
        } => run_optimize(&config, &data, output.as_deref(), sequential),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data, timeframe } => run_list_symbols(&data, &timeframe),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_backtest_command(
    config_path: &Path,
    data_dir: &Path,
    output_path: Option<&Path>,
    symbol_override: Option<&str>,
) -> Result<(), TradebenchError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let mut bt_config = load_backtest_config(&adapter)?;
    if let Some(symbol) = symbol_override {
        bt_config.symbol = symbol.to_string();
    }
    let strategy = load_strategy(&adapter)?;
    eprintln!("Loading strategy: {}", strategy);

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let candles = fetch_nonempty(&data_port, &bt_config)?;

    eprintln!(
        "Running backtest: {} {} bars, {} to {}",
        bt_config.symbol,
        candles.len(),
        bt_config.start,
        bt_config.end,
    );
    let result = run_backtest(&candles, &strategy, &bt_config)?;
    print_summary(&result);

    match output_path {
        Some(path) => {
            JsonReportAdapter::new().write(&result, path)?;
            eprintln!("\nReport written to: {}", path.display());
        }
        None => println!("{}", to_json(&result)?),
    }
    Ok(())
}

fn run_optimize(
    config_path: &Path,
    data_dir: &Path,
    output_path: Option<&Path>,
    sequential: bool,
) -> Result<(), TradebenchError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let bt_config = load_backtest_config(&adapter)?;
    let strategy = load_strategy(&adapter)?;
    let ranges = load_sweep_ranges(&adapter)?;
    if ranges.is_empty() {
        return Err(TradebenchError::ConfigMissing {
            section: "optimize".to_string(),
            key: "params".to_string(),
        });
    }

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let candles = fetch_nonempty(&data_port, &bt_config)?;

    eprintln!(
        "Optimizing {} over {} ({} ranges)",
        strategy,
        bt_config.symbol,
        ranges.len()
    );
    let parallel = !sequential && adapter.get_bool("optimize", "parallel", true);
    let report = ParamSweep::new(ranges)
        .with_parallelism(parallel)
        .run(&candles, &strategy, &bt_config, None)?;
    print_sweep_summary(&report);

    match output_path {
        Some(path) => {
            JsonReportAdapter::new().write_sweep(&report, path)?;
            eprintln!("\nReport written to: {}", path.display());
        }
        None => println!("{}", to_json(&report)?),
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), TradebenchError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let bt_config = load_backtest_config(&adapter)?;
    let strategy = load_strategy(&adapter)?;
    let ranges = load_sweep_ranges(&adapter)?;
    if let Some(unknown) = ranges.iter().find(|r| !strategy.accepts_parameter(&r.name)) {
        return Err(TradebenchError::invalid_parameter(
            unknown.name.clone(),
            format!("not a parameter of {}", strategy.kind.type_name()),
        ));
    }

    eprintln!("Config validated successfully");
    eprintln!("\nBacktest:");
    eprintln!("  symbol:    {} ({})", bt_config.symbol, bt_config.timeframe);
    eprintln!("  range:     {} to {}", bt_config.start, bt_config.end);
    eprintln!("  balance:   {:.2}", bt_config.initial_balance);
    eprintln!("\nStrategy: {}", strategy);
    let mut indicators: Vec<String> = strategy
        .required_indicators()
        .iter()
        .map(|i| i.to_string())
        .collect();
    indicators.sort();
    eprintln!("\nIndicators to compute:");
    for ind in &indicators {
        eprintln!("  {}", ind);
    }
    if !ranges.is_empty() {
        let combos = combination_count(&ranges)?;
        eprintln!("\nSweep ranges ({} combinations):", combos);
        for r in &ranges {
            eprintln!("  {}: {} to {} step {} ({} values)", r.name, r.min, r.max, r.step, r.value_count());
        }
    }
    Ok(())
}

fn run_list_symbols(data_dir: &Path, timeframe: &str) -> Result<(), TradebenchError> {
    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = data_port.list_symbols(timeframe)?;
    if symbols.is_empty() {
        eprintln!("No symbols found for timeframe {}", timeframe);
    }
    for symbol in &symbols {
        println!("{}", symbol);
    }
    Ok(())
}

fn fetch_nonempty(data_port: &dyn DataPort, config: &BacktestConfig) -> Result<Vec<Candle>, TradebenchError> {
    let candles = fetch_series(data_port, config)?;
    if candles.is_empty() {
        return Err(TradebenchError::Data {
            reason: format!(
                "no {} candles for {} between {} and {}",
                config.timeframe, config.symbol, config.start, config.end
            ),
        });
    }
    Ok(candles)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, TradebenchError> {
    serde_json::to_string_pretty(value).map_err(|e| TradebenchError::Report {
        reason: format!("failed to serialize report: {}", e),
    })
}

fn print_summary(result: &BacktestResult) {
    let p = &result.performance;
    eprintln!("\n=== Results: {} ===", result.strategy);
    eprintln!("Final Balance:    {:.2}", result.final_balance);
    eprintln!("Total Return:     {:.2}%", p.total_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", p.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", p.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", p.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", p.total_trades);
    eprintln!("Win Rate:         {:.1}%", p.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", p.profit_factor);
    eprintln!("Expectancy:       {:.2}", p.expectancy);

    let bias = |b: Option<TrendBias>| match b {
        Some(TrendBias::Bullish) => "bullish",
        Some(TrendBias::Bearish) => "bearish",
        None => "n/a",
    };
    let trend = &result.market.trend;
    eprintln!(
        "Trend 20/50/200:  {} / {} / {}",
        bias(trend.short),
        bias(trend.medium),
        bias(trend.long)
    );
    let levels = &result.market.key_levels;
    eprintln!(
        "Key Levels:       {} support, {} resistance",
        levels.support.len(),
        levels.resistance.len()
    );
}

fn print_sweep_summary(report: &SweepReport) {
    eprintln!("\n=== Sweep: {} ===", report.strategy);
    eprintln!("Combinations:     {}", report.combinations);
    eprintln!("Completed:        {}", report.entries.len());
    eprintln!("Rejected:         {}", report.rejected.len());
    eprintln!("Failed:           {}", report.failed.len());
    if report.was_cancelled() {
        eprintln!("Cancelled:        {}", report.cancelled);
    }
    if !report.robust.is_empty() {
        eprintln!("\n=== Most Robust ===");
        for ranked in &report.robust {
            let params: Vec<String> = ranked
                .entry
                .parameters
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            eprintln!(
                "  score {:.3}:  {}  ({} trades, PF {:.2})",
                ranked.score,
                params.join(", "),
                ranked.entry.performance.total_trades,
                ranked.entry.performance.profit_factor,
            );
        }
    }
}

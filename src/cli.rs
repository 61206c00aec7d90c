//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_feed_adapter::CsvFeedAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sim_broker_adapter::SimBrokerAdapter;
use crate::domain::config_validation::{parse_instruments, validate_session_config};
use crate::domain::error::AlphaledgerError;
use crate::domain::instrument::Instrument;
use crate::domain::ledger::ConfirmationState;
use crate::domain::session::{CycleSummary, Session};
use crate::domain::strategy::channel_breakout::ChannelBreakout;
use crate::domain::strategy::momentum_rank::MomentumRank;
use crate::domain::strategy::new_high_breakout::NewHighBreakout;
use crate::domain::strategy::StrategyRule;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "alphaledger", about = "Multi-strategy signal and position engine")]
pub struct Cli {
    /// Enable debug-level engine logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay CSV market data through the configured strategies
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of SYMBOL.csv bar files
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Validate a session configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data ranges for the configured instruments
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run { config, data } => run_session(&config, &data),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, data } => run_info(&config, &data),
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = AlphaledgerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match validate_session_config(&adapter) {
        Ok(()) => {
            eprintln!("{} is valid", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_info(config_path: &PathBuf, data_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let instruments = match configured_instruments(&adapter) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let feed = CsvFeedAdapter::new(data_path.clone(), None);
    for instrument in &instruments {
        match feed.data_range(instrument) {
            Ok(Some((first, last, count))) => {
                println!("{instrument}: {count} bars, {first} to {last}");
            }
            Ok(None) => println!("{instrument}: no data"),
            Err(e) => println!("{instrument}: {e}"),
        }
    }
    ExitCode::SUCCESS
}

fn run_session(config_path: &PathBuf, data_path: &PathBuf) -> ExitCode {
    // Stage 1: load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_session_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let instruments = match configured_instruments(&adapter) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let start_date = adapter
        .get_string("session", "start_date")
        .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok());
    let initial_cash = adapter.get_double("session", "initial_cash", 0.0);

    // Stage 2: assemble session; declaration order fixes evaluation order
    let strategies = build_strategies(&adapter);
    let strategy_ids: Vec<_> = strategies.iter().map(|(rule, _)| rule.id().clone()).collect();
    let mut session = Session::new();
    for (rule, risk_fraction) in strategies {
        eprintln!("Loading strategy: {}", rule.id());
        session.add_strategy(rule, risk_fraction);
    }

    // Stage 3: track the universe, warming indicators from pre-start rows
    let feed = CsvFeedAdapter::new(data_path.clone(), start_date);
    for instrument in &instruments {
        if let Err(e) = session.on_instrument_added(instrument, &feed) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }
    eprintln!("Tracking {} instruments", instruments.len());

    // Stage 4: replay bars chronologically, one cycle per timestamp
    let bars = match feed.replay_bars(&instruments) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let mut broker = SimBrokerAdapter::new(initial_cash);
    let mut totals = CycleSummary::default();
    let mut cycles = 0usize;

    let mut idx = 0;
    while idx < bars.len() {
        let ts = bars[idx].timestamp;
        let end = bars[idx..]
            .iter()
            .position(|bar| bar.timestamp != ts)
            .map(|offset| idx + offset)
            .unwrap_or(bars.len());
        let cycle = &bars[idx..end];

        for bar in cycle {
            broker.observe(&bar.instrument, bar.close);
        }
        match session.run_cycle(cycle, &mut broker) {
            Ok(summary) => {
                totals.intents_submitted += summary.intents_submitted;
                totals.fills += summary.fills;
                totals.rejections += summary.rejections;
                totals.failed_strategies += summary.failed_strategies;
            }
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
        cycles += 1;
        idx = end;
    }

    // Stage 5: report
    println!(
        "{} cycles: {} intents, {} fills, {} rejections",
        cycles, totals.intents_submitted, totals.fills, totals.rejections
    );
    println!("Cash: {:.2}", broker.cash());
    for id in &strategy_ids {
        let positions = session.ledger().positions_for(id);
        if positions.is_empty() {
            continue;
        }
        println!("{id}:");
        for (instrument, record) in positions {
            let state = match record.state {
                ConfirmationState::Proposed => "proposed",
                ConfirmationState::Confirmed => "confirmed",
            };
            println!("  {instrument}: {} ({state})", record.target);
        }
    }
    ExitCode::SUCCESS
}

fn configured_instruments(
    config: &dyn ConfigPort,
) -> Result<Vec<Instrument>, AlphaledgerError> {
    let raw = config
        .get_string("session", "instruments")
        .ok_or_else(|| AlphaledgerError::ConfigMissing {
            section: "session".to_string(),
            key: "instruments".to_string(),
        })?;
    Ok(parse_instruments(&raw)?
        .into_iter()
        .map(Instrument::new)
        .collect())
}

/// Instantiate the enabled strategies with their per-strategy risk budgets.
fn build_strategies(config: &dyn ConfigPort) -> Vec<(Box<dyn StrategyRule>, f64)> {
    let mut strategies: Vec<(Box<dyn StrategyRule>, f64)> = Vec::new();

    if config.get_bool("momentum_rank", "enabled", false) {
        let top_n = config.get_int("momentum_rank", "top_n", 5).max(1) as usize;
        let risk = config.get_double("momentum_rank", "risk_fraction", 0.01);
        strategies.push((Box::new(MomentumRank::new(top_n)), risk));
    }

    if config.get_bool("channel_breakout", "enabled", false) {
        let entry = config
            .get_int(
                "channel_breakout",
                "entry_lookback",
                ChannelBreakout::DEFAULT_ENTRY_LOOKBACK as i64,
            )
            .max(1) as usize;
        let exit = config
            .get_int(
                "channel_breakout",
                "exit_lookback",
                ChannelBreakout::DEFAULT_EXIT_LOOKBACK as i64,
            )
            .max(1) as usize;
        let risk = config.get_double("channel_breakout", "risk_fraction", 0.02);
        strategies.push((Box::new(ChannelBreakout::new(entry, exit)), risk));
    }

    if config.get_bool("new_high_breakout", "enabled", false) {
        let benchmark = config
            .get_string("session", "benchmark")
            .unwrap_or_default()
            .trim()
            .to_uppercase();
        let allocation = config.get_double(
            "new_high_breakout",
            "allocation_fraction",
            NewHighBreakout::DEFAULT_ALLOCATION_FRACTION,
        );
        let risk = config.get_double("new_high_breakout", "risk_fraction", 0.01);
        strategies.push((
            Box::new(NewHighBreakout::new(Instrument::new(benchmark), allocation)),
            risk,
        ));
    }

    strategies
}

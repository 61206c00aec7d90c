#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};

use alphaledger::domain::bar::TradeBar;
use alphaledger::domain::error::AlphaledgerError;
use alphaledger::domain::indicator::{IndicatorKind, IndicatorSpec};
use alphaledger::domain::instrument::Instrument;
use alphaledger::domain::ledger::StrategyId;
use alphaledger::domain::signal::{Direction, OrderIntent, Signal};
use alphaledger::domain::strategy::{EvalContext, StrategyError, StrategyRule};
use alphaledger::ports::execution_port::{ExecutionOutcome, ExecutionPort, ExecutionReport};
use alphaledger::ports::market_data_port::MarketDataPort;
use alphaledger::ports::portfolio_port::{PortfolioPort, PortfolioSnapshot};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(symbol: &str, day: i64, close: f64) -> TradeBar {
    TradeBar {
        instrument: Instrument::new(symbol),
        timestamp: date(2024, 1, 1) + chrono::Duration::days(day),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
    }
}

/// `count` bars climbing from `base` by `slope` per bar.
pub fn generate_bars(symbol: &str, count: i64, base: f64, slope: f64) -> Vec<TradeBar> {
    (0..count)
        .map(|day| make_bar(symbol, day, base + slope * day as f64))
        .collect()
}

/// Market-data port stub with scripted warm-up history per instrument.
pub struct MockDataPort {
    pub history: HashMap<Instrument, Vec<TradeBar>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        MockDataPort {
            history: HashMap::new(),
        }
    }

    pub fn with_history(mut self, symbol: &str, bars: Vec<TradeBar>) -> Self {
        self.history.insert(Instrument::new(symbol), bars);
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_history(
        &self,
        instrument: &Instrument,
        bars: usize,
    ) -> Result<Vec<TradeBar>, AlphaledgerError> {
        let mut history = self.history.get(instrument).cloned().unwrap_or_default();
        if history.len() > bars {
            history.drain(..history.len() - bars);
        }
        Ok(history)
    }

    fn release(&self, _instrument: &Instrument) {}
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BrokerMode {
    /// Fill everything, report immediately.
    Fill,
    /// Reject everything, report immediately.
    Reject,
    /// Accept submissions but never report (orders stay in flight).
    Silent,
}

/// Execution/portfolio stub with scripted acknowledgment behavior.
pub struct RecordingBroker {
    pub mode: BrokerMode,
    pub submitted: Vec<(StrategyId, OrderIntent)>,
    reports: Vec<ExecutionReport>,
    pub total_value: f64,
}

impl RecordingBroker {
    pub fn new(mode: BrokerMode) -> Self {
        RecordingBroker {
            mode,
            submitted: Vec::new(),
            reports: Vec::new(),
            total_value: 100_000.0,
        }
    }
}

impl ExecutionPort for RecordingBroker {
    fn submit(
        &mut self,
        strategy: &StrategyId,
        intent: &OrderIntent,
    ) -> Result<(), AlphaledgerError> {
        self.submitted.push((strategy.clone(), intent.clone()));
        match self.mode {
            BrokerMode::Fill => self.reports.push(ExecutionReport {
                strategy: strategy.clone(),
                instrument: intent.instrument.clone(),
                outcome: ExecutionOutcome::Filled,
            }),
            BrokerMode::Reject => self.reports.push(ExecutionReport {
                strategy: strategy.clone(),
                instrument: intent.instrument.clone(),
                outcome: ExecutionOutcome::Rejected {
                    reason: "scripted rejection".to_string(),
                },
            }),
            BrokerMode::Silent => {}
        }
        Ok(())
    }

    fn drain_reports(&mut self) -> Vec<ExecutionReport> {
        std::mem::take(&mut self.reports)
    }
}

impl PortfolioPort for RecordingBroker {
    fn snapshot(&self) -> PortfolioSnapshot {
        PortfolioSnapshot {
            total_value: self.total_value,
            available_cash: self.total_value,
        }
    }
}

/// Scripted rule: one short SMA requirement, and a shared knob holding the
/// long target it wants for every ready instrument (0 = exit).
pub struct TargetRule {
    id: StrategyId,
    pub target: Rc<Cell<i64>>,
}

impl TargetRule {
    pub fn new(name: &str, initial_target: i64) -> (Self, Rc<Cell<i64>>) {
        let target = Rc::new(Cell::new(initial_target));
        (
            TargetRule {
                id: StrategyId::new(name),
                target: Rc::clone(&target),
            },
            target,
        )
    }
}

impl StrategyRule for TargetRule {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::auto("sma_2", IndicatorKind::Sma(2))]
    }

    fn evaluate(&self, ctx: &EvalContext) -> Result<Vec<Signal>, StrategyError> {
        let target = self.target.get();
        Ok(ctx
            .ready
            .iter()
            .map(|instrument| {
                if target == 0 {
                    Signal::exit(instrument.clone())
                } else {
                    Signal::entry(instrument.clone(), Direction::Long, target)
                }
            })
            .collect())
    }
}

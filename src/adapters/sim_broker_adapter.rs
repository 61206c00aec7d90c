//! Simulated broker adapter.
//!
//! Implements the execution and portfolio ports for replay sessions: fills
//! intents at the last observed close, rejects buys that exceed available
//! cash (the budget check the reconciler's signal ordering relies on), and
//! marks holdings to market for valuation. Reports queue until the session
//! drains them, mimicking asynchronous acknowledgment.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::error::AlphaledgerError;
use crate::domain::instrument::Instrument;
use crate::domain::ledger::StrategyId;
use crate::domain::signal::OrderIntent;
use crate::ports::execution_port::{ExecutionOutcome, ExecutionPort, ExecutionReport};
use crate::ports::portfolio_port::{PortfolioPort, PortfolioSnapshot};

pub struct SimBrokerAdapter {
    cash: f64,
    holdings: HashMap<Instrument, i64>,
    last_close: HashMap<Instrument, f64>,
    pending: Vec<ExecutionReport>,
}

impl SimBrokerAdapter {
    pub fn new(initial_cash: f64) -> Self {
        SimBrokerAdapter {
            cash: initial_cash,
            holdings: HashMap::new(),
            last_close: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Record the latest close for fills and valuation. Call once per bar
    /// before the session cycle.
    pub fn observe(&mut self, instrument: &Instrument, close: f64) {
        self.last_close.insert(instrument.clone(), close);
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holding(&self, instrument: &Instrument) -> i64 {
        self.holdings.get(instrument).copied().unwrap_or(0)
    }

    fn report(&mut self, strategy: &StrategyId, instrument: &Instrument, outcome: ExecutionOutcome) {
        self.pending.push(ExecutionReport {
            strategy: strategy.clone(),
            instrument: instrument.clone(),
            outcome,
        });
    }
}

impl ExecutionPort for SimBrokerAdapter {
    fn submit(
        &mut self,
        strategy: &StrategyId,
        intent: &OrderIntent,
    ) -> Result<(), AlphaledgerError> {
        let Some(&price) = self.last_close.get(&intent.instrument) else {
            self.report(
                strategy,
                &intent.instrument,
                ExecutionOutcome::Rejected {
                    reason: "no market price observed".to_string(),
                },
            );
            return Ok(());
        };

        let cost = intent.delta as f64 * price;
        if cost > self.cash {
            self.report(
                strategy,
                &intent.instrument,
                ExecutionOutcome::Rejected {
                    reason: format!("cost {cost:.2} exceeds cash {:.2}", self.cash),
                },
            );
            return Ok(());
        }

        self.cash -= cost;
        *self.holdings.entry(intent.instrument.clone()).or_insert(0) += intent.delta;
        debug!(
            instrument = %intent.instrument,
            delta = intent.delta,
            price,
            "fill simulated"
        );
        self.report(strategy, &intent.instrument, ExecutionOutcome::Filled);
        Ok(())
    }

    fn drain_reports(&mut self) -> Vec<ExecutionReport> {
        std::mem::take(&mut self.pending)
    }
}

impl PortfolioPort for SimBrokerAdapter {
    fn snapshot(&self) -> PortfolioSnapshot {
        let position_value: f64 = self
            .holdings
            .iter()
            .filter_map(|(instrument, &units)| {
                self.last_close
                    .get(instrument)
                    .map(|&price| units as f64 * price)
            })
            .sum();
        PortfolioSnapshot {
            total_value: self.cash + position_value,
            available_cash: self.cash,
        }
    }
}

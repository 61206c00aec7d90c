//! Strategy rule contract and evaluation context.
//!
//! Every concrete rule declares the indicators it needs (consumed by the
//! registry at instrument-add time) and turns the current bar's ready
//! instruments into an ordered sequence of desired signals. `evaluate` must
//! be a pure function of its context: identical inputs reproduce identical
//! signals, which is what makes the reconciler's duplicate-proposal guard
//! meaningful rather than accidental.

pub mod channel_breakout;
pub mod momentum_rank;
pub mod new_high_breakout;

use std::collections::HashMap;

use super::bar::TradeBar;
use super::indicator::IndicatorSpec;
use super::instrument::Instrument;
use super::ledger::{PositionLedger, PositionRecord, StrategyId};
use super::registry::InstrumentRegistry;
use super::signal::Signal;
use super::sizer::{size_for, SizingError};
use crate::ports::portfolio_port::PortfolioSnapshot;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StrategyError {
    #[error("indicator role {role} missing on {instrument}")]
    MissingIndicator { instrument: Instrument, role: String },

    #[error("benchmark {0} is not tracked")]
    MissingBenchmark(Instrument),

    #[error(transparent)]
    Sizing(#[from] SizingError),
}

/// Read-only view of one bar cycle handed to `StrategyRule::evaluate`.
///
/// The ledger is reachable only through the `own_*` accessors, so a rule can
/// never read (let alone mutate) another strategy's book.
pub struct EvalContext<'a> {
    pub ready: &'a [Instrument],
    pub bars: &'a HashMap<Instrument, TradeBar>,
    pub portfolio: PortfolioSnapshot,
    pub risk_fraction: f64,
    registry: &'a InstrumentRegistry,
    ledger: &'a PositionLedger,
    strategy: &'a StrategyId,
}

impl<'a> EvalContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ready: &'a [Instrument],
        bars: &'a HashMap<Instrument, TradeBar>,
        portfolio: PortfolioSnapshot,
        risk_fraction: f64,
        registry: &'a InstrumentRegistry,
        ledger: &'a PositionLedger,
        strategy: &'a StrategyId,
    ) -> Self {
        EvalContext {
            ready,
            bars,
            portfolio,
            risk_fraction,
            registry,
            ledger,
            strategy,
        }
    }

    /// Current value of a named indicator role; missing roles on a ready
    /// instrument indicate a wiring fault and surface as errors.
    pub fn indicator(&self, instrument: &Instrument, role: &str) -> Result<f64, StrategyError> {
        self.registry
            .indicator_value(instrument, role)
            .ok_or_else(|| StrategyError::MissingIndicator {
                instrument: instrument.clone(),
                role: role.to_string(),
            })
    }

    pub fn is_tracked(&self, instrument: &Instrument) -> bool {
        self.registry.is_tracked(instrument)
    }

    pub fn bar(&self, instrument: &Instrument) -> Option<&TradeBar> {
        self.bars.get(instrument)
    }

    /// This strategy's own record for an instrument, if any.
    pub fn own_position(&self, instrument: &Instrument) -> Option<&PositionRecord> {
        self.ledger.read(self.strategy, instrument)
    }

    /// All of this strategy's records, sorted by instrument.
    pub fn own_positions(&self) -> Vec<(Instrument, &PositionRecord)> {
        self.ledger.positions_for(self.strategy)
    }

    /// Volatility-normalized size against this strategy's risk budget.
    pub fn risk_size(&self, volatility: f64) -> Result<i64, SizingError> {
        size_for(self.portfolio.total_value, self.risk_fraction, volatility)
    }
}

/// Polymorphic decision rule. Stateless with respect to positions: rules
/// query the ledger through the context's read-only view, never mutate it.
pub trait StrategyRule {
    fn id(&self) -> &StrategyId;

    /// Indicator slots the registry must provision on every tracked
    /// instrument for this rule.
    fn required_indicators(&self) -> Vec<IndicatorSpec>;

    /// Advance this rule's manual indicators. Called by the session at the
    /// end of each bar cycle, so window indicators read during `evaluate`
    /// exclude the current bar.
    fn advance_manual(
        &self,
        _registry: &mut InstrumentRegistry,
        _bars: &HashMap<Instrument, TradeBar>,
    ) {
    }

    /// Produce desired target exposures for this bar.
    fn evaluate(&self, ctx: &EvalContext) -> Result<Vec<Signal>, StrategyError>;
}

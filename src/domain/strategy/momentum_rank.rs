//! Momentum ranking rule.
//!
//! Ranks ready instruments by long-window rate of change and holds the top
//! N: unheld instruments entering the top set get a volatility-sized long
//! entry; held instruments falling out of it get an exit. The short-window
//! rate of change takes no part in ranking but participates in the
//! readiness gate, so entries wait for it to warm.

use std::collections::HashSet;

use crate::domain::indicator::{IndicatorKind, IndicatorSpec};
use crate::domain::instrument::Instrument;
use crate::domain::ledger::StrategyId;
use crate::domain::signal::{Direction, Signal};

use super::{EvalContext, StrategyError, StrategyRule};

pub struct MomentumRank {
    id: StrategyId,
    top_n: usize,
    rank_role: String,
    gate_role: String,
    atr_role: String,
    rank_lookback: usize,
    gate_lookback: usize,
    atr_period: usize,
}

impl MomentumRank {
    pub const DEFAULT_RANK_LOOKBACK: usize = 198;
    pub const DEFAULT_GATE_LOOKBACK: usize = 7;
    pub const DEFAULT_ATR_PERIOD: usize = 21;

    pub fn new(top_n: usize) -> Self {
        Self::with_lookbacks(
            top_n,
            Self::DEFAULT_RANK_LOOKBACK,
            Self::DEFAULT_GATE_LOOKBACK,
            Self::DEFAULT_ATR_PERIOD,
        )
    }

    pub fn with_lookbacks(
        top_n: usize,
        rank_lookback: usize,
        gate_lookback: usize,
        atr_period: usize,
    ) -> Self {
        MomentumRank {
            id: StrategyId::new("momentum_rank"),
            top_n,
            rank_role: format!("roc_{rank_lookback}"),
            gate_role: format!("roc_{gate_lookback}"),
            atr_role: format!("atr_{atr_period}"),
            rank_lookback,
            gate_lookback,
            atr_period,
        }
    }
}

impl StrategyRule for MomentumRank {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::auto(&self.rank_role, IndicatorKind::Roc(self.rank_lookback)),
            IndicatorSpec::auto(&self.gate_role, IndicatorKind::Roc(self.gate_lookback)),
            IndicatorSpec::auto(&self.atr_role, IndicatorKind::Atr(self.atr_period)),
        ]
    }

    fn evaluate(&self, ctx: &EvalContext) -> Result<Vec<Signal>, StrategyError> {
        let mut ranked: Vec<(&Instrument, f64)> = ctx
            .ready
            .iter()
            .map(|instrument| {
                ctx.indicator(instrument, &self.rank_role)
                    .map(|roc| (instrument, roc))
            })
            .collect::<Result<_, _>>()?;
        // highest momentum first; instrument order breaks exact ties so the
        // ranking is reproducible
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let top: HashSet<&Instrument> = ranked
            .iter()
            .take(self.top_n)
            .map(|(instrument, _)| *instrument)
            .collect();

        let mut signals = Vec::new();
        for instrument in ctx.ready {
            let held = ctx.own_position(instrument).is_some();
            if !held && top.contains(instrument) {
                let atr = ctx.indicator(instrument, &self.atr_role)?;
                let size = ctx.risk_size(atr)?;
                if size > 0 {
                    signals.push(Signal::entry(instrument.clone(), Direction::Long, size));
                }
            } else if held && !top.contains(instrument) {
                signals.push(Signal::exit(instrument.clone()));
            }
        }
        Ok(signals)
    }
}

//! Turtle-style channel breakout rule.
//!
//! Enters long when a close breaks above the prior N-bar high and exits when
//! a close falls to the prior M-bar low. The channel extremes are manual
//! indicators advanced after evaluation, so the windows read at decision
//! time never include the bar being decided on.

use std::collections::HashMap;

use crate::domain::bar::TradeBar;
use crate::domain::indicator::{IndicatorKind, IndicatorSpec};
use crate::domain::instrument::Instrument;
use crate::domain::ledger::StrategyId;
use crate::domain::registry::InstrumentRegistry;
use crate::domain::signal::{Direction, Signal};

use super::{EvalContext, StrategyError, StrategyRule};

pub struct ChannelBreakout {
    id: StrategyId,
    entry_role: String,
    exit_role: String,
    atr_role: String,
    entry_lookback: usize,
    exit_lookback: usize,
    atr_period: usize,
}

impl ChannelBreakout {
    pub const DEFAULT_ENTRY_LOOKBACK: usize = 40;
    pub const DEFAULT_EXIT_LOOKBACK: usize = 20;
    pub const DEFAULT_ATR_PERIOD: usize = 21;

    pub fn new(entry_lookback: usize, exit_lookback: usize) -> Self {
        Self::with_atr(entry_lookback, exit_lookback, Self::DEFAULT_ATR_PERIOD)
    }

    pub fn with_atr(entry_lookback: usize, exit_lookback: usize, atr_period: usize) -> Self {
        ChannelBreakout {
            id: StrategyId::new("channel_breakout"),
            entry_role: format!("high_{entry_lookback}"),
            exit_role: format!("low_{exit_lookback}"),
            atr_role: format!("atr_{atr_period}"),
            entry_lookback,
            exit_lookback,
            atr_period,
        }
    }
}

impl Default for ChannelBreakout {
    fn default() -> Self {
        ChannelBreakout::new(Self::DEFAULT_ENTRY_LOOKBACK, Self::DEFAULT_EXIT_LOOKBACK)
    }
}

impl StrategyRule for ChannelBreakout {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::manual(
                &self.entry_role,
                IndicatorKind::HighestHigh(self.entry_lookback),
            ),
            IndicatorSpec::manual(&self.exit_role, IndicatorKind::LowestLow(self.exit_lookback)),
            IndicatorSpec::auto(&self.atr_role, IndicatorKind::Atr(self.atr_period)),
        ]
    }

    fn advance_manual(
        &self,
        registry: &mut InstrumentRegistry,
        bars: &HashMap<Instrument, TradeBar>,
    ) {
        for (instrument, bar) in bars {
            registry.update_manual(instrument, &self.entry_role, bar);
            registry.update_manual(instrument, &self.exit_role, bar);
        }
    }

    fn evaluate(&self, ctx: &EvalContext) -> Result<Vec<Signal>, StrategyError> {
        let mut signals = Vec::new();
        for instrument in ctx.ready {
            let Some(bar) = ctx.bar(instrument) else {
                continue;
            };

            if ctx.own_position(instrument).is_some() {
                let channel_low = ctx.indicator(instrument, &self.exit_role)?;
                if bar.close <= channel_low {
                    signals.push(Signal::exit(instrument.clone()));
                }
            } else {
                let channel_high = ctx.indicator(instrument, &self.entry_role)?;
                if bar.close >= channel_high {
                    let atr = ctx.indicator(instrument, &self.atr_role)?;
                    let size = ctx.risk_size(atr)?;
                    if size > 0 {
                        signals.push(Signal::entry(instrument.clone(), Direction::Long, size));
                    }
                }
            }
        }
        Ok(signals)
    }
}

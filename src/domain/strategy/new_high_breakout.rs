//! New-high breakout rule with a market-regime filter.
//!
//! While a configured benchmark instrument trades below its long moving
//! average, every held position is exited and no entries fire. In an uptrend
//! regime, instruments closing at a fresh window high are bought with a
//! fixed fraction of portfolio value, and holdings closing below their trend
//! average are exited.

use crate::domain::indicator::{IndicatorKind, IndicatorSpec};
use crate::domain::instrument::Instrument;
use crate::domain::ledger::StrategyId;
use crate::domain::signal::{Direction, Signal};

use super::{EvalContext, StrategyError, StrategyRule};

pub struct NewHighBreakout {
    id: StrategyId,
    benchmark: Instrument,
    allocation_fraction: f64,
    trend_role: String,
    high_role: String,
    regime_role: String,
    trend_period: usize,
    regime_period: usize,
}

impl NewHighBreakout {
    pub const DEFAULT_TREND_PERIOD: usize = 50;
    pub const DEFAULT_REGIME_PERIOD: usize = 200;
    pub const DEFAULT_ALLOCATION_FRACTION: f64 = 0.1;

    pub fn new(benchmark: Instrument, allocation_fraction: f64) -> Self {
        Self::with_periods(
            benchmark,
            allocation_fraction,
            Self::DEFAULT_TREND_PERIOD,
            Self::DEFAULT_REGIME_PERIOD,
        )
    }

    pub fn with_periods(
        benchmark: Instrument,
        allocation_fraction: f64,
        trend_period: usize,
        regime_period: usize,
    ) -> Self {
        NewHighBreakout {
            id: StrategyId::new("new_high_breakout"),
            benchmark,
            allocation_fraction,
            trend_role: format!("sma_{trend_period}"),
            high_role: format!("high_{trend_period}"),
            regime_role: format!("sma_{regime_period}"),
            trend_period,
            regime_period,
        }
    }
}

impl StrategyRule for NewHighBreakout {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::auto(&self.trend_role, IndicatorKind::Sma(self.trend_period)),
            IndicatorSpec::auto(
                &self.high_role,
                IndicatorKind::HighestHigh(self.trend_period),
            ),
            IndicatorSpec::auto(&self.regime_role, IndicatorKind::Sma(self.regime_period)),
        ]
    }

    fn evaluate(&self, ctx: &EvalContext) -> Result<Vec<Signal>, StrategyError> {
        if !ctx.is_tracked(&self.benchmark) {
            return Err(StrategyError::MissingBenchmark(self.benchmark.clone()));
        }
        if !ctx.ready.contains(&self.benchmark) {
            // regime unknown while the benchmark warms up
            return Ok(Vec::new());
        }
        let Some(bench_bar) = ctx.bar(&self.benchmark) else {
            return Ok(Vec::new());
        };

        let regime_average = ctx.indicator(&self.benchmark, &self.regime_role)?;
        if bench_bar.close < regime_average {
            let exits = ctx
                .own_positions()
                .into_iter()
                .map(|(instrument, _)| Signal::exit(instrument))
                .collect();
            return Ok(exits);
        }

        let mut signals = Vec::new();
        for instrument in ctx.ready {
            if *instrument == self.benchmark {
                continue;
            }
            let Some(bar) = ctx.bar(instrument) else {
                continue;
            };

            if ctx.own_position(instrument).is_some() {
                let trend_average = ctx.indicator(instrument, &self.trend_role)?;
                if bar.close < trend_average {
                    signals.push(Signal::exit(instrument.clone()));
                }
            } else {
                let window_high = ctx.indicator(instrument, &self.high_role)?;
                if bar.close >= window_high && bar.close > 0.0 {
                    let budget = ctx.portfolio.total_value * self.allocation_fraction;
                    let size = (budget / bar.close).floor() as i64;
                    if size > 0 {
                        signals.push(Signal::entry(instrument.clone(), Direction::Long, size));
                    }
                }
            }
        }
        Ok(signals)
    }
}

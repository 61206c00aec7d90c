//! Average true range with Wilder smoothing.
//!
//! The first value (after `period` bars) seeds with the plain average of the
//! true ranges seen so far; later values smooth as
//! ATR[i] = (ATR[i-1] * (period - 1) + TR[i]) / period.
//! The first bar's true range falls back to high - low.

use super::IndicatorAdapter;
use crate::domain::bar::TradeBar;

#[derive(Debug)]
pub struct AverageTrueRange {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    count: usize,
    current: f64,
}

impl AverageTrueRange {
    pub fn new(period: usize) -> Self {
        AverageTrueRange {
            period,
            prev_close: None,
            seed_sum: 0.0,
            count: 0,
            current: 0.0,
        }
    }
}

impl IndicatorAdapter for AverageTrueRange {
    fn update(&mut self, bar: &TradeBar) {
        let tr = match self.prev_close {
            None => bar.high - bar.low,
            Some(prev_close) => bar.true_range(prev_close),
        };
        self.count += 1;

        if self.count < self.period {
            self.seed_sum += tr;
        } else if self.count == self.period {
            self.seed_sum += tr;
            self.current = self.seed_sum / self.period as f64;
        } else {
            self.current =
                (self.current * (self.period - 1) as f64 + tr) / self.period as f64;
        }

        self.prev_close = Some(bar.close);
    }

    fn ready(&self) -> bool {
        self.count >= self.period
    }

    fn value(&self) -> f64 {
        self.current
    }
}

//! Rate of change over closes.
//!
//! ROC(n) = ((close - close_n_bars_ago) / close_n_bars_ago) * 100
//! If the reference close is 0, the value is 0. Ready once n+1 closes have
//! been seen, i.e. a full n-bar span exists.

use std::collections::VecDeque;

use super::IndicatorAdapter;
use crate::domain::bar::TradeBar;

#[derive(Debug)]
pub struct RateOfChange {
    period: usize,
    window: VecDeque<f64>,
}

impl RateOfChange {
    pub fn new(period: usize) -> Self {
        RateOfChange {
            period,
            window: VecDeque::with_capacity(period + 2),
        }
    }
}

impl IndicatorAdapter for RateOfChange {
    fn update(&mut self, bar: &TradeBar) {
        self.window.push_back(bar.close);
        if self.window.len() > self.period + 1 {
            self.window.pop_front();
        }
    }

    fn ready(&self) -> bool {
        self.window.len() > self.period
    }

    fn value(&self) -> f64 {
        let (Some(oldest), Some(newest)) = (self.window.front(), self.window.back()) else {
            return 0.0;
        };
        if *oldest == 0.0 {
            0.0
        } else {
            ((newest - oldest) / oldest) * 100.0
        }
    }
}

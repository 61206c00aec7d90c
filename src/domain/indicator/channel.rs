//! Rolling extremes: highest high and lowest low over a window.
//!
//! These back breakout channels. Both are ready once their window is full.

use std::collections::VecDeque;

use super::IndicatorAdapter;
use crate::domain::bar::TradeBar;

#[derive(Debug)]
pub struct HighestHigh {
    period: usize,
    window: VecDeque<f64>,
}

impl HighestHigh {
    pub fn new(period: usize) -> Self {
        HighestHigh {
            period,
            window: VecDeque::with_capacity(period + 1),
        }
    }
}

impl IndicatorAdapter for HighestHigh {
    fn update(&mut self, bar: &TradeBar) {
        self.window.push_back(bar.high);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
    }

    fn ready(&self) -> bool {
        self.window.len() >= self.period
    }

    fn value(&self) -> f64 {
        self.window.iter().copied().fold(f64::MIN, f64::max)
    }
}

#[derive(Debug)]
pub struct LowestLow {
    period: usize,
    window: VecDeque<f64>,
}

impl LowestLow {
    pub fn new(period: usize) -> Self {
        LowestLow {
            period,
            window: VecDeque::with_capacity(period + 1),
        }
    }
}

impl IndicatorAdapter for LowestLow {
    fn update(&mut self, bar: &TradeBar) {
        self.window.push_back(bar.low);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
    }

    fn ready(&self) -> bool {
        self.window.len() >= self.period
    }

    fn value(&self) -> f64 {
        self.window.iter().copied().fold(f64::MAX, f64::min)
    }
}

//! Simple moving average over closes.
//!
//! SMA(n) = mean of the last n closes. Ready once n closes have been seen.

use std::collections::VecDeque;

use super::IndicatorAdapter;
use crate::domain::bar::TradeBar;

#[derive(Debug)]
pub struct SimpleMovingAverage {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    pub fn new(period: usize) -> Self {
        SimpleMovingAverage {
            period,
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }
}

impl IndicatorAdapter for SimpleMovingAverage {
    fn update(&mut self, bar: &TradeBar) {
        self.window.push_back(bar.close);
        self.sum += bar.close;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
    }

    fn ready(&self) -> bool {
        self.window.len() >= self.period
    }

    fn value(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.sum / self.window.len() as f64
        }
    }
}

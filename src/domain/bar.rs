//! Trade bar representation.

use chrono::NaiveDateTime;

use super::instrument::Instrument;

/// One bar of market data for one instrument. The engine is agnostic to bar
/// resolution; timestamps must arrive monotonically per instrument.
#[derive(Debug, Clone)]
pub struct TradeBar {
    pub instrument: Instrument,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl TradeBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

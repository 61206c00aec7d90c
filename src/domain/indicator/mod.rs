//! Streaming technical indicators.
//!
//! Each indicator is a stateful transform fed one bar at a time. It exposes
//! a current value and a readiness flag; values read before `ready()`
//! returns true are not trustworthy and the registry's readiness gate keeps
//! strategies from acting on them.

pub mod atr;
pub mod channel;
pub mod roc;
pub mod sma;

use std::fmt;

use super::bar::TradeBar;

/// Contract for a single numeric transform over a bar stream.
///
/// An adapter is constructed once when its instrument enters the tracked
/// universe and accumulates state bar-by-bar for the life of that tracking
/// period; it is never rebuilt mid-stream.
pub trait IndicatorAdapter {
    fn update(&mut self, bar: &TradeBar);
    fn ready(&self) -> bool;
    fn value(&self) -> f64;
}

/// Indicator identity plus parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma(usize),
    Roc(usize),
    Atr(usize),
    HighestHigh(usize),
    LowestLow(usize),
}

impl IndicatorKind {
    /// Bars required before the transform reports ready.
    pub fn lookback(&self) -> usize {
        match self {
            IndicatorKind::Sma(period) => *period,
            IndicatorKind::Roc(period) => period + 1,
            IndicatorKind::Atr(period) => *period,
            IndicatorKind::HighestHigh(period) => *period,
            IndicatorKind::LowestLow(period) => *period,
        }
    }

    /// Construct a fresh adapter for this kind.
    pub fn build(&self) -> Box<dyn IndicatorAdapter> {
        match self {
            IndicatorKind::Sma(period) => Box::new(sma::SimpleMovingAverage::new(*period)),
            IndicatorKind::Roc(period) => Box::new(roc::RateOfChange::new(*period)),
            IndicatorKind::Atr(period) => Box::new(atr::AverageTrueRange::new(*period)),
            IndicatorKind::HighestHigh(period) => Box::new(channel::HighestHigh::new(*period)),
            IndicatorKind::LowestLow(period) => Box::new(channel::LowestLow::new(*period)),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Roc(period) => write!(f, "ROC({})", period),
            IndicatorKind::Atr(period) => write!(f, "ATR({})", period),
            IndicatorKind::HighestHigh(period) => write!(f, "HH({})", period),
            IndicatorKind::LowestLow(period) => write!(f, "LL({})", period),
        }
    }
}

/// Declarative request for one indicator slot on a tracked instrument.
///
/// `manual` adapters are excluded from the automatic bar feed and from
/// historical warm-up; the declaring strategy advances them itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSpec {
    pub role: String,
    pub kind: IndicatorKind,
    pub manual: bool,
}

impl IndicatorSpec {
    pub fn auto(role: impl Into<String>, kind: IndicatorKind) -> Self {
        IndicatorSpec {
            role: role.into(),
            kind,
            manual: false,
        }
    }

    pub fn manual(role: impl Into<String>, kind: IndicatorKind) -> Self {
        IndicatorSpec {
            role: role.into(),
            kind,
            manual: true,
        }
    }
}

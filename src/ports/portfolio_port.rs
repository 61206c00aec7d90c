//! Portfolio valuation port.

/// Point-in-time valuation consulted once per bar cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioSnapshot {
    pub total_value: f64,
    pub available_cash: f64,
}

pub trait PortfolioPort {
    fn snapshot(&self) -> PortfolioSnapshot;
}

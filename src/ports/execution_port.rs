//! Execution venue port.

use crate::domain::error::AlphaledgerError;
use crate::domain::instrument::Instrument;
use crate::domain::ledger::StrategyId;
use crate::domain::signal::OrderIntent;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Filled,
    Rejected { reason: String },
}

/// Asynchronous fill/rejection report for a submitted intent, keyed back to
/// the (strategy, instrument) ledger entry it settles.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub strategy: StrategyId,
    pub instrument: Instrument,
    pub outcome: ExecutionOutcome,
}

/// Order submission boundary. Submission is synchronous and fire-and-forget;
/// outcomes arrive later as reports. Intents are never retried by the
/// engine.
pub trait ExecutionPort {
    fn submit(
        &mut self,
        strategy: &StrategyId,
        intent: &OrderIntent,
    ) -> Result<(), AlphaledgerError>;

    /// Reports accumulated since the last drain, in arrival order.
    fn drain_reports(&mut self) -> Vec<ExecutionReport>;
}

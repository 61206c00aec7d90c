//! Signal reconciliation.
//!
//! Diffs one strategy's desired signals against its ledger records and emits
//! the minimal set of order intents: enter, adjust (amend an in-flight
//! order), or exit. Signals are processed in emission order, which fixes
//! order-submission order when several signals compete for the same cash in
//! one bar; the execution collaborator enforces the budget by rejecting
//! over-budget orders.

use chrono::NaiveDateTime;

use super::ledger::{LedgerError, PositionLedger, StrategyId};
use super::signal::{OrderIntent, Signal};

pub fn reconcile(
    ledger: &mut PositionLedger,
    strategy: &StrategyId,
    signals: &[Signal],
    ts: NaiveDateTime,
) -> Result<Vec<OrderIntent>, LedgerError> {
    let mut intents = Vec::new();

    for signal in signals {
        let target = signal.target();
        let held = ledger.read(strategy, &signal.instrument).map(|r| r.target);

        match held {
            None if target != 0 => {
                ledger.propose(strategy, &signal.instrument, target, ts)?;
                intents.push(OrderIntent {
                    instrument: signal.instrument.clone(),
                    delta: target,
                });
            }
            // exit requested but nothing held
            None => {}
            Some(old) if target == 0 => {
                intents.push(OrderIntent {
                    instrument: signal.instrument.clone(),
                    delta: -old,
                });
                ledger.liquidate(strategy, &signal.instrument);
            }
            Some(old) if old != target => {
                intents.push(OrderIntent {
                    instrument: signal.instrument.clone(),
                    delta: target - old,
                });
                ledger.amend(strategy, &signal.instrument, target)?;
            }
            // identical to the live record: in-flight or held, nothing to do
            Some(_) => {}
        }
    }

    Ok(intents)
}

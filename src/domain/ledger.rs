//! Position ledger and confirmation state machine.
//!
//! The ledger is the single source of truth for what each strategy believes
//! it holds. Records are keyed by (strategy, instrument), so concurrent
//! strategies sharing an instrument never clobber each other's bookkeeping.
//!
//! Record lifecycle: none → `Proposed` (reconciler wrote a desired size) →
//! `Confirmed` (execution acknowledged the fill) → none (full liquidation).
//! Keeping `Proposed` distinct from `Confirmed` stops a strategy from
//! re-issuing the same order every bar while one is in flight, and stops
//! exposure from being counted before a fill is acknowledged.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;

use super::instrument::Instrument;

/// Identifies one strategy's book within the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrategyId(String);

impl StrategyId {
    pub fn new(name: impl Into<String>) -> Self {
        StrategyId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    /// Desired size written by the reconciler; no execution ack yet.
    Proposed,
    /// Execution acknowledged the fill.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    /// Signed target size; the sign encodes direction.
    pub target: i64,
    pub state: ConfirmationState,
    pub created: NaiveDateTime,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error(
        "duplicate proposal for {strategy}/{instrument}: {held} already live, {proposed} proposed"
    )]
    DuplicateProposal {
        strategy: StrategyId,
        instrument: Instrument,
        held: i64,
        proposed: i64,
    },

    #[error("no proposal in flight for {strategy}/{instrument}")]
    NoSuchProposal {
        strategy: StrategyId,
        instrument: Instrument,
    },
}

/// Per-(strategy, instrument) position records. The reconciler writes;
/// strategies read their own entries only.
#[derive(Default)]
pub struct PositionLedger {
    records: HashMap<(StrategyId, Instrument), PositionRecord>,
}

impl PositionLedger {
    pub fn new() -> Self {
        PositionLedger {
            records: HashMap::new(),
        }
    }

    /// none → `Proposed`. A proposal identical to the live record is a
    /// de-duplicating no-op; a differing one is an error, since silently
    /// overwriting an in-flight order would hide a double-counted or lost
    /// position.
    pub fn propose(
        &mut self,
        strategy: &StrategyId,
        instrument: &Instrument,
        target: i64,
        ts: NaiveDateTime,
    ) -> Result<(), LedgerError> {
        let key = (strategy.clone(), instrument.clone());
        match self.records.get(&key) {
            None => {
                self.records.insert(
                    key,
                    PositionRecord {
                        target,
                        state: ConfirmationState::Proposed,
                        created: ts,
                    },
                );
                Ok(())
            }
            Some(record) if record.target == target => Ok(()),
            Some(record) => Err(LedgerError::DuplicateProposal {
                strategy: strategy.clone(),
                instrument: instrument.clone(),
                held: record.target,
                proposed: target,
            }),
        }
    }

    /// Explicitly amend a live record to a new target, returning it to
    /// `Proposed` until the adjusting order confirms. The creation timestamp
    /// is preserved. Fails when there is nothing to amend.
    pub fn amend(
        &mut self,
        strategy: &StrategyId,
        instrument: &Instrument,
        target: i64,
    ) -> Result<(), LedgerError> {
        let key = (strategy.clone(), instrument.clone());
        match self.records.get_mut(&key) {
            Some(record) => {
                record.target = target;
                record.state = ConfirmationState::Proposed;
                Ok(())
            }
            None => Err(LedgerError::NoSuchProposal {
                strategy: strategy.clone(),
                instrument: instrument.clone(),
            }),
        }
    }

    /// `Proposed` → `Confirmed`. A confirmation without a matching proposal
    /// is a protocol violation upstream (an out-of-band fill) and surfaces.
    pub fn confirm(
        &mut self,
        strategy: &StrategyId,
        instrument: &Instrument,
    ) -> Result<(), LedgerError> {
        let key = (strategy.clone(), instrument.clone());
        match self.records.get_mut(&key) {
            Some(record) if record.state == ConfirmationState::Proposed => {
                record.state = ConfirmationState::Confirmed;
                Ok(())
            }
            _ => Err(LedgerError::NoSuchProposal {
                strategy: strategy.clone(),
                instrument: instrument.clone(),
            }),
        }
    }

    /// Roll a rejected proposal back to none. The rejected order never
    /// filled, so the record is a failed proposal, not a confirmed position.
    pub fn reject(
        &mut self,
        strategy: &StrategyId,
        instrument: &Instrument,
    ) -> Result<(), LedgerError> {
        let key = (strategy.clone(), instrument.clone());
        match self.records.get(&key) {
            Some(record) if record.state == ConfirmationState::Proposed => {
                self.records.remove(&key);
                Ok(())
            }
            _ => Err(LedgerError::NoSuchProposal {
                strategy: strategy.clone(),
                instrument: instrument.clone(),
            }),
        }
    }

    /// Remove the record in any state. No-op when none exists.
    pub fn liquidate(&mut self, strategy: &StrategyId, instrument: &Instrument) {
        self.records
            .remove(&(strategy.clone(), instrument.clone()));
    }

    pub fn read(&self, strategy: &StrategyId, instrument: &Instrument) -> Option<&PositionRecord> {
        self.records.get(&(strategy.clone(), instrument.clone()))
    }

    /// One strategy's records, sorted by instrument for deterministic
    /// iteration.
    pub fn positions_for(&self, strategy: &StrategyId) -> Vec<(Instrument, &PositionRecord)> {
        let mut positions: Vec<(Instrument, &PositionRecord)> = self
            .records
            .iter()
            .filter(|((owner, _), _)| owner == strategy)
            .map(|((_, instrument), record)| (instrument.clone(), record))
            .collect();
        positions.sort_by(|a, b| a.0.cmp(&b.0));
        positions
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Instrument state registry.
//!
//! Owns one indicator set per tracked instrument, keyed by universe
//! membership: states are created on instrument-added events, fed on every
//! bar, and torn down (releasing the data subscription) on removal. Bars for
//! untracked instruments and redundant removals are benign races during
//! universe churn, not errors.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::bar::TradeBar;
use super::error::AlphaledgerError;
use super::indicator::IndicatorSpec;
use super::indicator_set::IndicatorSet;
use super::instrument::Instrument;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("instrument {0} is already tracked")]
    DuplicateInstrument(Instrument),

    #[error("conflicting definitions for indicator role {role}: {existing} vs {requested}")]
    RoleConflict {
        role: String,
        existing: String,
        requested: String,
    },
}

/// Per-instrument tracking state. Exactly one exists per tracked instrument.
pub struct InstrumentState {
    indicators: IndicatorSet,
}

/// Registry of all tracked instruments.
///
/// A `BTreeMap` keeps iteration order stable across runs, which the
/// strategy-evaluation determinism contract depends on.
#[derive(Default)]
pub struct InstrumentRegistry {
    states: BTreeMap<Instrument, InstrumentState>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        InstrumentRegistry {
            states: BTreeMap::new(),
        }
    }

    /// Begin tracking an instrument.
    ///
    /// Builds one adapter per spec (merging exact duplicates across
    /// strategies, rejecting same-role conflicts) and warms the non-manual
    /// adapters from history when any of them requires a window. Fails with
    /// `DuplicateInstrument` when the instrument is already tracked.
    pub fn on_instrument_added(
        &mut self,
        instrument: &Instrument,
        specs: &[IndicatorSpec],
        data: &dyn MarketDataPort,
    ) -> Result<(), AlphaledgerError> {
        if self.states.contains_key(instrument) {
            return Err(RegistryError::DuplicateInstrument(instrument.clone()).into());
        }

        let merged = merge_specs(specs)?;
        let mut indicators = IndicatorSet::from_specs(&merged);

        let warmup = indicators.auto_warmup_bars();
        if warmup > 0 {
            let history = data.fetch_history(instrument, warmup)?;
            for bar in &history {
                indicators.update_auto(bar);
            }
            debug!(
                instrument = %instrument,
                bars = history.len(),
                requested = warmup,
                "warmed up from history"
            );
        }

        info!(instrument = %instrument, roles = merged.len(), "instrument tracked");
        self.states
            .insert(instrument.clone(), InstrumentState { indicators });
        Ok(())
    }

    /// Stop tracking an instrument and release its data subscription.
    /// Removal of an untracked instrument is a no-op: removal events can
    /// race with prior teardown.
    pub fn on_instrument_removed(
        &mut self,
        instrument: &Instrument,
        data: &dyn MarketDataPort,
    ) {
        if self.states.remove(instrument).is_some() {
            data.release(instrument);
            info!(instrument = %instrument, "instrument untracked");
        } else {
            debug!(instrument = %instrument, "removal of untracked instrument ignored");
        }
    }

    /// Route a bar to every non-manual adapter of its instrument. Bars for
    /// untracked instruments are skipped silently.
    pub fn on_bar(&mut self, bar: &TradeBar) {
        match self.states.get_mut(&bar.instrument) {
            Some(state) => state.indicators.update_auto(bar),
            None => debug!(instrument = %bar.instrument, "bar for untracked instrument skipped"),
        }
    }

    /// Advance a manual adapter; strategy-driven timing. No-op when the
    /// instrument is untracked or the role is not manual.
    pub fn update_manual(&mut self, instrument: &Instrument, role: &str, bar: &TradeBar) {
        if let Some(state) = self.states.get_mut(instrument) {
            state.indicators.update_manual(role, bar);
        }
    }

    /// True iff the instrument is tracked and every adapter reports ready.
    pub fn is_ready(&self, instrument: &Instrument) -> bool {
        self.states
            .get(instrument)
            .is_some_and(|state| state.indicators.ready())
    }

    pub fn is_tracked(&self, instrument: &Instrument) -> bool {
        self.states.contains_key(instrument)
    }

    /// Tracked instruments whose indicator sets are fully warmed, in stable
    /// (lexicographic) order.
    pub fn ready_instruments(&self) -> Vec<Instrument> {
        self.states
            .iter()
            .filter(|(_, state)| state.indicators.ready())
            .map(|(instrument, _)| instrument.clone())
            .collect()
    }

    /// Current value of a named indicator role on a tracked instrument.
    pub fn indicator_value(&self, instrument: &Instrument, role: &str) -> Option<f64> {
        self.states
            .get(instrument)
            .and_then(|state| state.indicators.value(role))
    }

    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }
}

/// Merge spec lists contributed by multiple strategies: exact duplicates
/// collapse, same-role redefinitions are an error.
fn merge_specs(specs: &[IndicatorSpec]) -> Result<Vec<IndicatorSpec>, RegistryError> {
    let mut merged: Vec<IndicatorSpec> = Vec::with_capacity(specs.len());
    for spec in specs {
        match merged.iter().find(|m| m.role == spec.role) {
            None => merged.push(spec.clone()),
            Some(existing) if existing == spec => {}
            Some(existing) => {
                return Err(RegistryError::RoleConflict {
                    role: spec.role.clone(),
                    existing: existing.kind.to_string(),
                    requested: spec.kind.to_string(),
                });
            }
        }
    }
    Ok(merged)
}

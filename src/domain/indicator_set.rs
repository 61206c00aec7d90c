//! Named indicator sets.
//!
//! An `IndicatorSet` maps role names to indicator adapters for a single
//! instrument, resolved at construction time from a declarative spec list.

use std::collections::HashMap;

use super::bar::TradeBar;
use super::indicator::{IndicatorAdapter, IndicatorSpec};

struct Slot {
    spec: IndicatorSpec,
    adapter: Box<dyn IndicatorAdapter>,
}

/// Role name → indicator adapter for one instrument.
pub struct IndicatorSet {
    slots: HashMap<String, Slot>,
}

impl IndicatorSet {
    pub fn from_specs(specs: &[IndicatorSpec]) -> Self {
        let slots = specs
            .iter()
            .map(|spec| {
                (
                    spec.role.clone(),
                    Slot {
                        spec: spec.clone(),
                        adapter: spec.kind.build(),
                    },
                )
            })
            .collect();
        IndicatorSet { slots }
    }

    /// True iff every adapter, manual ones included, reports ready.
    pub fn ready(&self) -> bool {
        self.slots.values().all(|slot| slot.adapter.ready())
    }

    /// Current value for a role, if the role exists.
    pub fn value(&self, role: &str) -> Option<f64> {
        self.slots.get(role).map(|slot| slot.adapter.value())
    }

    /// Feed a bar to every non-manual adapter.
    pub fn update_auto(&mut self, bar: &TradeBar) {
        for slot in self.slots.values_mut() {
            if !slot.spec.manual {
                slot.adapter.update(bar);
            }
        }
    }

    /// Advance a single manual adapter. Returns false when the role does not
    /// exist or is not manual.
    pub fn update_manual(&mut self, role: &str, bar: &TradeBar) -> bool {
        match self.slots.get_mut(role) {
            Some(slot) if slot.spec.manual => {
                slot.adapter.update(bar);
                true
            }
            _ => false,
        }
    }

    /// Largest lookback among non-manual adapters; drives warm-up depth.
    pub fn auto_warmup_bars(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| !slot.spec.manual)
            .map(|slot| slot.spec.kind.lookback())
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

//! Per-step histories of a nuclide model's contents.
//!
//! One entry is recorded per transport step. Entries for earlier steps are
//! never rewritten: recording at an earlier time than the latest entry is an
//! [`CyderError::Ordering`] error, and recording again at the latest time
//! refreshes only that step's entry.

use crate::errors::{CyderError, CyderResult};
use crate::types::{CompMap, FloatValue, Iso, IsoConcMap, Time};
use log::error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalised composition and total mass at one step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MassSnapshot {
    pub composition: CompMap,
    /// unit: kg
    pub mass: FloatValue,
}

impl MassSnapshot {
    pub fn new(composition: CompMap, mass: FloatValue) -> Self {
        Self { composition, mass }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History<T> {
    entries: BTreeMap<Time, T>,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, time: Time, value: T) -> CyderResult<()> {
        if let Some(last) = self.last_time() {
            if time < last {
                error!("History entry at t={} precedes the latest at t={}", time, last);
                return Err(CyderError::Ordering {
                    requested: time,
                    last,
                });
            }
        }
        self.entries.insert(time, value);
        Ok(())
    }

    pub fn at(&self, time: Time) -> Option<&T> {
        self.entries.get(&time)
    }

    /// Latest entry recorded at or before `time`
    pub fn as_of(&self, time: Time) -> Option<&T> {
        self.entries.range(..=time).next_back().map(|(_, v)| v)
    }

    pub fn latest(&self) -> Option<(Time, &T)> {
        self.entries.iter().next_back().map(|(t, v)| (*t, v))
    }

    pub fn last_time(&self) -> Option<Time> {
        self.entries.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Time, &T)> {
        self.entries.iter().map(|(t, v)| (*t, v))
    }
}

/// Concentration at the outer boundary for each step
pub type ConcentrationHistory = History<IsoConcMap>;

/// Contained composition and mass for each step
pub type VectorHistory = History<MassSnapshot>;

impl History<IsoConcMap> {
    /// Highest recorded concentration of an isotope and the step it occurred at
    pub fn peak(&self, iso: Iso) -> Option<(Time, FloatValue)> {
        self.iter()
            .filter_map(|(t, conc)| conc.get(&iso).map(|c| (t, *c)))
            .fold(None, |best, (t, c)| match best {
                Some((_, b)) if b >= c => best,
                _ => Some((t, c)),
            })
    }
}

impl History<MassSnapshot> {
    /// Contained mass recorded at `time`, zero if nothing was recorded
    pub fn mass_at(&self, time: Time) -> FloatValue {
        self.at(time).map(|s| s.mass).unwrap_or(0.0)
    }
}

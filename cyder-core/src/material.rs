//! Batches of radioactive material tracked isotope by isotope.

use crate::errors::{CyderError, CyderResult};
use crate::mat_tools::validate_finite_pos;
use crate::types::{CompMap, FloatValue, Iso};
use log::error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Masses below this are treated as zero
/// unit: kg
pub const MASS_EPS: FloatValue = 1e-10;

/// A batch of material, held as the mass of each isotope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// unit: kg
    masses: BTreeMap<Iso, FloatValue>,
}

impl Material {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Material of `mass` kg distributed according to `composition`
    ///
    /// The composition is normalised, so any positive weights may be given.
    pub fn from_composition(composition: &CompMap, mass: FloatValue) -> CyderResult<Self> {
        validate_finite_pos(mass)?;
        let mut total = 0.0;
        for frac in composition.values() {
            validate_finite_pos(*frac)?;
            total += frac;
        }
        if mass == 0.0 {
            return Ok(Self::empty());
        }
        if total == 0.0 {
            let msg = format!("Cannot distribute {} kg over an empty composition.", mass);
            error!("{}", msg);
            return Err(CyderError::Range(msg));
        }
        let masses = composition
            .iter()
            .filter(|(_, frac)| **frac > 0.0)
            .map(|(iso, frac)| (*iso, frac / total * mass))
            .collect();
        Ok(Self { masses })
    }

    /// Material from per-isotope masses in kg
    pub fn from_masses(masses: BTreeMap<Iso, FloatValue>) -> CyderResult<Self> {
        for mass in masses.values() {
            validate_finite_pos(*mass)?;
        }
        Ok(Self { masses })
    }

    /// Total mass
    /// unit: kg
    pub fn mass(&self) -> FloatValue {
        self.masses.values().sum()
    }

    /// unit: kg
    pub fn mass_of(&self, iso: Iso) -> FloatValue {
        self.masses.get(&iso).copied().unwrap_or(0.0)
    }

    pub fn masses(&self) -> &BTreeMap<Iso, FloatValue> {
        &self.masses
    }

    /// Mass fractions, empty when the material has no mass
    pub fn composition(&self) -> CompMap {
        let total = self.mass();
        if total <= 0.0 {
            return CompMap::new();
        }
        self.masses
            .iter()
            .map(|(iso, m)| (*iso, m / total))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mass() <= MASS_EPS
    }

    /// Merge another batch into this one
    pub fn absorb(&mut self, other: Material) {
        for (iso, mass) in other.masses {
            *self.masses.entry(iso).or_insert(0.0) += mass;
        }
    }

    /// Remove `mass` kg with the given composition
    ///
    /// Every isotope is checked before anything is removed, so a failed
    /// extraction leaves the batch untouched.
    pub fn extract(&mut self, composition: &CompMap, mass: FloatValue) -> CyderResult<Material> {
        let requested = Material::from_composition(composition, mass)?;
        for (iso, want) in &requested.masses {
            let available = self.mass_of(*iso);
            if *want > available + MASS_EPS {
                error!(
                    "Extraction of {} kg of {} exceeds the {} kg contained",
                    want, iso, available
                );
                return Err(CyderError::InsufficientMass {
                    iso: *iso,
                    requested: *want,
                    available,
                });
            }
        }
        for (iso, want) in &requested.masses {
            if let Some(held) = self.masses.get_mut(iso) {
                *held = (*held - want).max(0.0);
            }
        }
        self.masses.retain(|_, m| *m > 0.0);
        Ok(requested)
    }
}

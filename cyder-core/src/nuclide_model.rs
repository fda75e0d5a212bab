//! Nuclide transport contract shared by every component model.
//!
//! A nuclide model holds the material a component contains and exposes the
//! boundary conditions its neighbours read:
//!
//! - **Source term**: the composition and mass available for release outward
//! - **Dirichlet**: the concentration at the outer boundary (kg/m^3)
//! - **Neumann**: the concentration gradient towards a neighbour (kg/m^4),
//!   $$ \frac{\partial C}{\partial r} = \frac{C_{ext} - C_{int}}{r_{ext} - r_{int}} $$
//! - **Cauchy**: the advective-dispersive flux (kg/m^2/s),
//!   $$ q = -D \frac{\partial C}{\partial r} + v C $$
//!
//! Every boundary condition is the zero map while the model contains no mass.

use crate::errors::{CyderError, CyderResult};
use crate::geometry::Geometry;
use crate::history::{ConcentrationHistory, MassSnapshot, VectorHistory};
use crate::mat_tools;
use crate::material::{Material, MASS_EPS};
use crate::types::{CompMap, FloatValue, Iso, IsoConcMap, Radius, Time};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;

// ============================================================================
// Model type registry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NuclideModelType {
    DegRate,
    Lumped,
    MixedCell,
    OneDimPpm,
    Stub,
    TwoDimPpm,
}

const NUCLIDE_MODEL_NAMES: [(NuclideModelType, &str); 6] = [
    (NuclideModelType::DegRate, "DegRateNuclide"),
    (NuclideModelType::Lumped, "LumpedNuclide"),
    (NuclideModelType::MixedCell, "MixedCellNuclide"),
    (NuclideModelType::OneDimPpm, "OneDimPPMNuclide"),
    (NuclideModelType::Stub, "StubNuclide"),
    (NuclideModelType::TwoDimPpm, "TwoDimPPMNuclide"),
];

impl NuclideModelType {
    /// Name used in configuration files
    pub fn name(&self) -> &'static str {
        NUCLIDE_MODEL_NAMES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("UnknownNuclide")
    }

    pub fn all() -> impl Iterator<Item = NuclideModelType> {
        NUCLIDE_MODEL_NAMES.iter().map(|(kind, _)| *kind)
    }
}

impl FromStr for NuclideModelType {
    type Err = CyderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NUCLIDE_MODEL_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| {
                let options: Vec<&str> = NUCLIDE_MODEL_NAMES.iter().map(|(_, n)| *n).collect();
                CyderError::Configuration(format!(
                    "'{}' does not name a valid nuclide model. Options are: {}",
                    s,
                    options.join(", ")
                ))
            })
    }
}

impl fmt::Display for NuclideModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Model contract
// ============================================================================

/// What a model can see of one of its daughters when coupling to it
#[derive(Debug, Clone, PartialEq)]
pub struct DaughterBoundary {
    pub source_term: MassSnapshot,
    pub dirichlet: IsoConcMap,
    /// unit: m^3
    pub free_fluid_volume: FloatValue,
}

/// Transport model of a single component
pub trait NuclideModel: Debug {
    fn model_type(&self) -> NuclideModelType;

    fn geometry(&self) -> &Geometry;

    /// Keeps the model's geometry in step with its component
    fn set_geometry(&mut self, geometry: Geometry);

    fn pool(&self) -> &NuclidePool;

    fn pool_mut(&mut self) -> &mut NuclidePool;

    /// Add a batch to the contained material
    ///
    /// Nothing is recomputed until the next call to [`NuclideModel::transport`].
    fn absorb(&mut self, material: Material) {
        debug!(
            "{} is absorbing {} kg",
            self.model_type(),
            material.mass()
        );
        self.pool_mut().absorb(material);
    }

    /// Remove `mass` kg of `composition` from the contained material
    fn extract(&mut self, composition: &CompMap, mass: FloatValue) -> CyderResult<Material> {
        debug!("{} is extracting {} kg", self.model_type(), mass);
        self.pool_mut().extract(composition, mass)
    }

    /// Advance the model to `time`, recording its history entry for that step
    fn transport(&mut self, time: Time) -> CyderResult<()>;

    /// Composition and mass available for release outward
    fn source_term(&self) -> CyderResult<MassSnapshot>;

    /// Concentration at the outer boundary
    fn dirichlet(&self, time: Time) -> CyderResult<IsoConcMap>;

    /// Concentration gradient towards a neighbour at `r_ext` holding `c_ext`
    fn neumann(&self, c_ext: &IsoConcMap, r_ext: Radius, time: Time) -> CyderResult<IsoConcMap>;

    /// Advective-dispersive flux towards a neighbour at `r_ext` holding `c_ext`
    fn cauchy(&self, c_ext: &IsoConcMap, r_ext: Radius, time: Time) -> CyderResult<IsoConcMap>;

    /// Volume of fluid that mobile contaminant is mixed into
    /// unit: m^3
    fn free_fluid_volume(&self) -> CyderResult<FloatValue>;

    /// Material this model takes from each daughter in one step
    ///
    /// Returns one batch per daughter, in order. By default every daughter's
    /// source term is taken up in full.
    fn update_inner_bc(
        &self,
        _time: Time,
        daughters: &[DaughterBoundary],
    ) -> CyderResult<Vec<Material>> {
        daughters
            .iter()
            .map(|d| Material::from_composition(&d.source_term.composition, d.source_term.mass))
            .collect()
    }

    /// A model with the same parameters, empty contents and no history
    fn fresh_copy(&self, geometry: Geometry, time: Time) -> Box<dyn NuclideModel>;

    fn contained(&self) -> MassSnapshot {
        self.pool().contained()
    }

    /// unit: kg
    fn contained_mass(&self) -> FloatValue {
        self.pool().contained_mass()
    }

    fn concentration_history(&self) -> &ConcentrationHistory {
        &self.pool().concentration_history
    }

    fn vector_history(&self) -> &VectorHistory {
        &self.pool().vector_history
    }
}

// ============================================================================
// Contained material
// ============================================================================

/// Material held by a model, with its per-step histories
#[derive(Debug, Clone, Default)]
pub struct NuclidePool {
    wastes: VecDeque<Material>,
    pub concentration_history: ConcentrationHistory,
    pub vector_history: VectorHistory,
    last_updated: Time,
}

impl NuclidePool {
    /// An empty pool whose clock starts at `time`
    pub fn starting_at(time: Time) -> Self {
        Self {
            last_updated: time,
            ..Self::default()
        }
    }

    pub fn absorb(&mut self, material: Material) {
        self.wastes.push_back(material);
    }

    pub fn extract(&mut self, composition: &CompMap, mass: FloatValue) -> CyderResult<Material> {
        mat_tools::extract(composition, mass, &mut self.wastes)
    }

    pub fn wastes(&self) -> &VecDeque<Material> {
        &self.wastes
    }

    pub fn contained(&self) -> MassSnapshot {
        let (composition, mass) = mat_tools::sum_mats(&self.wastes);
        MassSnapshot::new(composition, mass)
    }

    pub fn contained_mass(&self) -> FloatValue {
        self.wastes.iter().map(|m| m.mass()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.contained_mass() <= MASS_EPS
    }

    pub fn last_updated(&self) -> Time {
        self.last_updated
    }

    /// Checks `time` is not earlier than the last update
    pub fn check_time(&self, time: Time) -> CyderResult<()> {
        if time < self.last_updated {
            error!(
                "Transport requested at t={} after an update at t={}",
                time, self.last_updated
            );
            return Err(CyderError::Ordering {
                requested: time,
                last: self.last_updated,
            });
        }
        Ok(())
    }

    /// Record this step's contents and boundary concentration
    pub fn record(&mut self, time: Time, concentrations: IsoConcMap) -> CyderResult<()> {
        self.check_time(time)?;
        self.vector_history.record(time, self.contained())?;
        self.concentration_history.record(time, concentrations)?;
        self.last_updated = time;
        Ok(())
    }

    /// Recorded boundary concentration as of `time`, zero if none
    pub fn concentration_as_of(&self, time: Time) -> IsoConcMap {
        self.concentration_history
            .as_of(time)
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// Shared boundary conditions
// ============================================================================

/// Gradient between an interior and an exterior concentration
///
/// Requires a finite `r_ext` beyond `r_int`.
pub fn concentration_gradient(
    c_ext: FloatValue,
    c_int: FloatValue,
    r_ext: Radius,
    r_int: Radius,
) -> CyderResult<FloatValue> {
    if !r_ext.is_finite() || r_ext <= r_int {
        let msg = format!(
            "The outer radius ({}) must be finite and greater than the inner radius ({}).",
            r_ext, r_int
        );
        error!("{}", msg);
        return Err(CyderError::Range(msg));
    }
    Ok((c_ext - c_int) / (r_ext - r_int))
}

/// Neumann boundary over the union of interior and exterior isotopes
///
/// An isotope missing from either side is treated as zero concentration.
pub fn neumann_bc(
    c_ext: &IsoConcMap,
    c_int: &IsoConcMap,
    r_ext: Radius,
    r_int: Radius,
) -> CyderResult<IsoConcMap> {
    let mut isos: Vec<Iso> = c_int.keys().chain(c_ext.keys()).copied().collect();
    isos.sort_unstable();
    isos.dedup();
    isos.into_iter()
        .map(|iso| {
            let ext = c_ext.get(&iso).copied().unwrap_or(0.0);
            let int = c_int.get(&iso).copied().unwrap_or(0.0);
            Ok((iso, concentration_gradient(ext, int, r_ext, r_int)?))
        })
        .collect()
}

/// Cauchy boundary from a Neumann gradient and the boundary concentration
///
/// $$ q = -D \frac{\partial C}{\partial r} + v C $$
pub fn cauchy_bc(
    neumann: &IsoConcMap,
    dirichlet: &IsoConcMap,
    velocity: FloatValue,
    dispersion: impl Fn(Iso) -> CyderResult<FloatValue>,
) -> CyderResult<IsoConcMap> {
    let mut isos: Vec<Iso> = neumann.keys().chain(dirichlet.keys()).copied().collect();
    isos.sort_unstable();
    isos.dedup();
    isos.into_iter()
        .map(|iso| {
            let grad = neumann.get(&iso).copied().unwrap_or(0.0);
            let conc = dirichlet.get(&iso).copied().unwrap_or(0.0);
            let d = dispersion(iso)?;
            mat_tools::validate_finite_pos(d)?;
            Ok((iso, -d * grad + velocity * conc))
        })
        .collect()
}

//! Congruent-release nuclide model
//!
//! Contaminant is released in direct proportion to the degradation of the
//! barrier matrix. If a component degrades at 15% per step, 15% of what it
//! holds becomes available at its boundary each step:
//!
//! $$ m_{avail}(t) = m(t) \cdot D(t) $$
//!
//! where $D(t)$ is the cumulative degraded fraction. The boundary concentration
//! is the contained mass spread over the whole component volume, scaled by the
//! same fraction.

use std::sync::Arc;

use super::dispersion_lookup;
use crate::degradation::Degradation;
use cyder_core::errors::CyderResult;
use cyder_core::geometry::Geometry;
use cyder_core::history::MassSnapshot;
use cyder_core::mat_tools::{comp_to_conc_map, scale_conc_map};
use cyder_core::nuclide_model::{
    cauchy_bc, neumann_bc, NuclideModel, NuclideModelType, NuclidePool,
};
use cyder_core::properties::MaterialProperties;
use cyder_core::types::{FloatValue, IsoConcMap, Radius, Time};
use log::debug;
use serde::{Deserialize, Serialize};

/// Parameters for the congruent-release model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegRateNuclideParameters {
    /// Fraction of the barrier degraded per time step, in [0, 1]
    /// unit: 1 / month
    pub degradation: FloatValue,
    /// Advective velocity through the component
    /// unit: m / s
    /// default: 0.0
    #[serde(default)]
    pub advective_velocity: FloatValue,
    /// Material used for property lookups
    #[serde(default)]
    pub material: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DegRateNuclide {
    parameters: DegRateNuclideParameters,
    geometry: Geometry,
    degradation: Degradation,
    pool: NuclidePool,
    properties: Arc<dyn MaterialProperties>,
}

impl DegRateNuclide {
    /// Create a model whose clock starts at time zero
    pub fn from_parameters(
        parameters: DegRateNuclideParameters,
        geometry: Geometry,
        properties: Arc<dyn MaterialProperties>,
    ) -> CyderResult<Self> {
        let degradation = Degradation::new(parameters.degradation, 0)?;
        Ok(Self {
            parameters,
            geometry,
            degradation,
            pool: NuclidePool::starting_at(0),
            properties,
        })
    }

    pub fn degradation_rate(&self) -> FloatValue {
        self.degradation.rate()
    }

    /// Fails with a range error outside [0, 1]
    pub fn set_degradation_rate(&mut self, rate: FloatValue) -> CyderResult<()> {
        self.degradation.set_rate(rate)?;
        self.parameters.degradation = rate;
        Ok(())
    }

    /// Cumulative degraded fraction
    pub fn total_degradation(&self) -> FloatValue {
        self.degradation.total()
    }

    /// Accumulate degradation up to `time` without recording history
    pub fn update_degradation(&mut self, time: Time) -> CyderResult<FloatValue> {
        self.degradation.update(time)
    }

    /// Contained mass spread over the whole volume
    ///
    /// Zero for an empty or unbounded component.
    pub fn calculate_whole_volume_concentration(&self) -> CyderResult<IsoConcMap> {
        let contained = self.pool.contained();
        if contained.mass == 0.0 || !self.geometry.is_bounded() {
            return Ok(IsoConcMap::new());
        }
        comp_to_conc_map(
            &contained.composition,
            contained.mass,
            self.geometry.volume()?,
        )
    }
}

impl NuclideModel for DegRateNuclide {
    fn model_type(&self) -> NuclideModelType {
        NuclideModelType::DegRate
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    fn pool(&self) -> &NuclidePool {
        &self.pool
    }

    fn pool_mut(&mut self) -> &mut NuclidePool {
        &mut self.pool
    }

    fn transport(&mut self, time: Time) -> CyderResult<()> {
        self.pool.check_time(time)?;
        let total = self.degradation.update(time)?;
        let concentrations = self.calculate_whole_volume_concentration()?;
        debug!("DegRateNuclide degraded to {} at t={}", total, time);
        self.pool.record(time, concentrations)
    }

    fn source_term(&self) -> CyderResult<MassSnapshot> {
        let contained = self.pool.contained();
        Ok(MassSnapshot::new(
            contained.composition,
            self.degradation.total() * contained.mass,
        ))
    }

    fn dirichlet(&self, time: Time) -> CyderResult<IsoConcMap> {
        if self.pool.is_empty() {
            return Ok(IsoConcMap::new());
        }
        scale_conc_map(
            &self.pool.concentration_as_of(time),
            self.degradation.total(),
        )
    }

    fn neumann(&self, c_ext: &IsoConcMap, r_ext: Radius, time: Time) -> CyderResult<IsoConcMap> {
        if self.pool.is_empty() {
            return Ok(IsoConcMap::new());
        }
        neumann_bc(
            c_ext,
            &self.dirichlet(time)?,
            r_ext,
            self.geometry.radial_midpoint(),
        )
    }

    fn cauchy(&self, c_ext: &IsoConcMap, r_ext: Radius, time: Time) -> CyderResult<IsoConcMap> {
        if self.pool.is_empty() {
            return Ok(IsoConcMap::new());
        }
        cauchy_bc(
            &self.neumann(c_ext, r_ext, time)?,
            &self.dirichlet(time)?,
            self.parameters.advective_velocity,
            dispersion_lookup(
                self.properties.as_ref(),
                self.parameters.material.as_deref(),
            ),
        )
    }

    fn free_fluid_volume(&self) -> CyderResult<FloatValue> {
        self.geometry.volume()
    }

    fn fresh_copy(&self, geometry: Geometry, time: Time) -> Box<dyn NuclideModel> {
        Box::new(Self {
            parameters: self.parameters.clone(),
            geometry,
            degradation: self.degradation.restarted_at(time),
            pool: NuclidePool::starting_at(time),
            properties: Arc::clone(&self.properties),
        })
    }
}

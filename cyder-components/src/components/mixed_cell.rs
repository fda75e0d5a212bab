//! Well-mixed cell nuclide model
//!
//! The degraded part of the component is treated as instantly homogenised.
//! Whatever mass is available in the free fluid is mixed into the free fluid
//! volume $V_{ff} = d \theta V_T$, giving one concentration for the whole cell:
//!
//! $$ C = \frac{m_{avail}}{V_{ff}} $$
//!
//! The available mass is the degraded fraction of the contained mass, or, when
//! `kd_limited`, the dissolved share of that fraction under linear sorption. When
//! `sol_limited` it is further capped by the solubility limit.

use std::sync::Arc;

use super::dispersion_lookup;
use crate::degradation::Degradation;
use cyder_core::errors::{CyderError, CyderResult};
use cyder_core::geometry::Geometry;
use cyder_core::history::MassSnapshot;
use cyder_core::mat_tools::{self, validate_finite_pos, validate_percent};
use cyder_core::nuclide_model::{
    cauchy_bc, neumann_bc, NuclideModel, NuclideModelType, NuclidePool,
};
use cyder_core::properties::MaterialProperties;
use cyder_core::sol_lim;
use cyder_core::types::{CompMap, FloatValue, IsoConcMap, Radius, Time};
use log::{debug, error};
use serde::{Deserialize, Serialize};

/// Parameters for the well-mixed cell model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixedCellNuclideParameters {
    /// Fluid fraction of the component volume, in [0, 1]
    pub porosity: FloatValue,
    /// Fraction of the matrix degraded per time step, in [0, 1]
    /// unit: 1 / month
    pub degradation: FloatValue,
    /// unit: m / s
    /// default: 0.0
    #[serde(default)]
    pub advective_velocity: FloatValue,
    /// Cap dissolved mass at the solubility limit
    #[serde(default)]
    pub sol_limited: bool,
    /// Partition mass between solid and fluid with the distribution coefficient
    #[serde(default)]
    pub kd_limited: bool,
    /// Material used for property lookups
    #[serde(default)]
    pub material: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MixedCellNuclide {
    parameters: MixedCellNuclideParameters,
    geometry: Geometry,
    degradation: Degradation,
    pool: NuclidePool,
    properties: Arc<dyn MaterialProperties>,
}

impl MixedCellNuclide {
    pub fn from_parameters(
        parameters: MixedCellNuclideParameters,
        geometry: Geometry,
        properties: Arc<dyn MaterialProperties>,
    ) -> CyderResult<Self> {
        validate_percent(parameters.porosity)?;
        validate_finite_pos(parameters.advective_velocity)?;
        if (parameters.sol_limited || parameters.kd_limited) && parameters.material.is_none() {
            let msg = "A sorption- or solubility-limited mixed cell needs a material".to_string();
            error!("{}", msg);
            return Err(CyderError::Configuration(msg));
        }
        let degradation = Degradation::new(parameters.degradation, 0)?;
        Ok(Self {
            parameters,
            geometry,
            degradation,
            pool: NuclidePool::starting_at(0),
            properties,
        })
    }

    pub fn porosity(&self) -> FloatValue {
        self.parameters.porosity
    }

    pub fn total_degradation(&self) -> FloatValue {
        self.degradation.total()
    }

    fn material(&self) -> CyderResult<&str> {
        self.parameters.material.as_deref().ok_or_else(|| {
            CyderError::Configuration("No material set for the mixed cell".to_string())
        })
    }

    /// Free fluid volume at the current degradation
    /// unit: m^3
    pub fn calculate_free_fluid_volume(&self) -> CyderResult<FloatValue> {
        mat_tools::free_fluid_volume(
            self.geometry.volume()?,
            self.parameters.porosity,
            self.degradation.total(),
        )
    }

    /// Mass of each isotope available in the free fluid
    ///
    /// Nothing is available from an empty or unbounded cell.
    pub fn calculate_available_masses(&self) -> CyderResult<CompMap> {
        let contained = self.pool.contained();
        if contained.mass == 0.0 || !self.geometry.is_bounded() {
            return Ok(CompMap::new());
        }
        let total = self.geometry.volume()?;
        let porosity = self.parameters.porosity;
        let d = self.degradation.total();
        let v_ff = mat_tools::free_fluid_volume(total, porosity, d)?;
        let v_f = mat_tools::fluid_volume(total, porosity)?;
        let v_s = mat_tools::solid_volume(total, porosity)?;

        let mut available = CompMap::new();
        for (iso, frac) in &contained.composition {
            let m_t = frac * contained.mass;
            let mut mass = if self.parameters.kd_limited {
                let k_d = self
                    .properties
                    .partition_coefficient(self.material()?, *iso)?;
                sol_lim::free_fluid_mass(m_t, k_d, v_s, v_f, d)?
            } else {
                d * m_t
            };
            if self.parameters.sol_limited {
                let c_sol = self.properties.solubility_limit(self.material()?, *iso)?;
                mass = sol_lim::available_free_fluid_mass(mass, v_ff, c_sol);
            }
            available.insert(*iso, mass);
        }
        Ok(available)
    }

    /// Available masses mixed into the free fluid
    ///
    /// Zero when the free fluid volume is zero.
    pub fn calculate_mixed_concentration(&self) -> CyderResult<IsoConcMap> {
        let available = self.calculate_available_masses()?;
        if available.is_empty() {
            return Ok(IsoConcMap::new());
        }
        let v_ff = self.calculate_free_fluid_volume()?;
        if v_ff == 0.0 {
            return Ok(available.keys().map(|iso| (*iso, 0.0)).collect());
        }
        Ok(available
            .iter()
            .map(|(iso, mass)| (*iso, mass / v_ff))
            .collect())
    }
}

impl NuclideModel for MixedCellNuclide {
    fn model_type(&self) -> NuclideModelType {
        NuclideModelType::MixedCell
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
        self.degradation.update(time)?;
        let concentrations = self.calculate_mixed_concentration()?;
        debug!(
            "MixedCellNuclide mixed {} isotopes at t={}",
            concentrations.len(),
            time
        );
        self.pool.record(time, concentrations)
    }

    fn source_term(&self) -> CyderResult<MassSnapshot> {
        let available = self.calculate_available_masses()?;
        let mass: FloatValue = available.values().sum();
        if mass <= 0.0 {
            return Ok(MassSnapshot::zero());
        }
        let composition = available
            .iter()
            .map(|(iso, m)| (*iso, m / mass))
            .collect();
        Ok(MassSnapshot::new(composition, mass))
    }

    fn dirichlet(&self, time: Time) -> CyderResult<IsoConcMap> {
        if self.pool.is_empty() {
            return Ok(IsoConcMap::new());
        }
        Ok(self.pool.concentration_as_of(time))
    }

    fn neumann(&self, c_ext: &IsoConcMap, r_ext: Radius, time: Time) -> CyderResult<IsoConcMap> {
        if self.pool.is_empty() {
            return Ok(IsoConcMap::new());
        }
        // No neighbour gradient yet
        if c_ext.is_empty() {
            return self.dirichlet(time);
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
        if c_ext.is_empty() {
            return self.dirichlet(time);
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
        self.calculate_free_fluid_volume()
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

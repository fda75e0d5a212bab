//! Lumped-parameter nuclide model
//!
//! The component is treated as a black box whose outflow concentration is the
//! fluid-phase concentration $C_0 = m / V_f$ scaled by a response function of
//! the dimensionless time $\tau = \Delta t / t_t$ since the last update:
//!
//! | Formulation | Response |
//! |-------------|----------|
//! | `DM` (dispersion) | $\exp\left(\frac{Pe}{2}\left(1 - \sqrt{1 + 4\tau / Pe}\right)\right)$ |
//! | `EM` (exponential) | $1 / (1 + \tau)$ |
//! | `PFM` (plug flow) | $\exp(-\tau)$ |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::dispersion_lookup;
use cyder_core::errors::{CyderError, CyderResult};
use cyder_core::geometry::Geometry;
use cyder_core::history::MassSnapshot;
use cyder_core::mat_tools::{self, comp_to_conc_map, scale_conc_map, validate_finite_pos};
use cyder_core::nuclide_model::{
    cauchy_bc, neumann_bc, NuclideModel, NuclideModelType, NuclidePool,
};
use cyder_core::properties::MaterialProperties;
use cyder_core::types::{FloatValue, IsoConcMap, Radius, Time};
use log::{debug, error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formulation {
    /// Dispersion model
    DM,
    /// Exponential model
    EM,
    /// Plug-flow model
    PFM,
}

const FORMULATION_NAMES: [(Formulation, &str); 3] = [
    (Formulation::DM, "DM"),
    (Formulation::EM, "EM"),
    (Formulation::PFM, "PFM"),
];

impl FromStr for Formulation {
    type Err = CyderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FORMULATION_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| {
                let msg = format!(
                    "'{}' does not name a valid formulation. Options are: DM, EM, PFM",
                    s
                );
                error!("{}", msg);
                CyderError::Configuration(msg)
            })
    }
}

impl fmt::Display for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = FORMULATION_NAMES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("?");
        write!(f, "{}", name)
    }
}

/// Parameters for the lumped-parameter model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LumpedNuclideParameters {
    /// One of `DM`, `EM` or `PFM`
    pub formulation: String,
    /// Mean transit time of fluid through the component
    /// unit: month
    pub transit_time: FloatValue,
    /// Péclet number, required by the dispersion model
    /// default: 0.0
    #[serde(default)]
    pub peclet: FloatValue,
    pub porosity: FloatValue,
    /// unit: m / s
    /// default: 0.0
    #[serde(default)]
    pub advective_velocity: FloatValue,
    #[serde(default)]
    pub material: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LumpedNuclide {
    parameters: LumpedNuclideParameters,
    formulation: Formulation,
    geometry: Geometry,
    /// Response applied at the latest transport step
    last_response: FloatValue,
    pool: NuclidePool,
    properties: Arc<dyn MaterialProperties>,
}

impl LumpedNuclide {
    pub fn from_parameters(
        parameters: LumpedNuclideParameters,
        geometry: Geometry,
        properties: Arc<dyn MaterialProperties>,
    ) -> CyderResult<Self> {
        let formulation: Formulation = parameters.formulation.parse()?;
        if !(parameters.transit_time.is_finite() && parameters.transit_time > 0.0) {
            return Err(range_error(format!(
                "The transit time must be finite and positive. The value provided was {}.",
                parameters.transit_time
            )));
        }
        if parameters.peclet.is_nan() || parameters.peclet < 0.0 {
            return Err(range_error(format!(
                "The Peclet number range is 0 to infinity, inclusive. The value provided was {}.",
                parameters.peclet
            )));
        }
        if formulation == Formulation::DM && parameters.peclet == 0.0 {
            return Err(range_error(
                "The dispersion model needs a positive Peclet number.".to_string(),
            ));
        }
        mat_tools::validate_percent(parameters.porosity)?;
        validate_finite_pos(parameters.advective_velocity)?;
        Ok(Self {
            parameters,
            formulation,
            geometry,
            last_response: 1.0,
            pool: NuclidePool::starting_at(0),
            properties,
        })
    }

    pub fn formulation(&self) -> Formulation {
        self.formulation
    }

    /// Fluid volume of the component
    /// unit: m^3
    pub fn calculate_fluid_volume(&self) -> CyderResult<FloatValue> {
        mat_tools::fluid_volume(self.geometry.volume()?, self.parameters.porosity)
    }

    /// Response of the formulation after `elapsed` steps
    pub fn calculate_response(&self, elapsed: Time) -> FloatValue {
        let tau = elapsed as FloatValue / self.parameters.transit_time;
        match self.formulation {
            Formulation::DM => {
                let pe = self.parameters.peclet;
                ((pe / 2.0) * (1.0 - (1.0 + 4.0 * tau / pe).sqrt())).exp()
            }
            Formulation::EM => 1.0 / (1.0 + tau),
            Formulation::PFM => (-tau).exp(),
        }
    }

    /// Fluid-phase concentration of the contents, before any response
    pub fn calculate_initial_concentration(&self) -> CyderResult<IsoConcMap> {
        let contained = self.pool.contained();
        if contained.mass == 0.0 {
            return Ok(IsoConcMap::new());
        }
        comp_to_conc_map(
            &contained.composition,
            contained.mass,
            self.calculate_fluid_volume()?,
        )
    }
}

impl NuclideModel for LumpedNuclide {
    fn model_type(&self) -> NuclideModelType {
        NuclideModelType::Lumped
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
        let response = self.calculate_response(time - self.pool.last_updated());
        let concentrations = scale_conc_map(&self.calculate_initial_concentration()?, response)?;
        debug!(
            "LumpedNuclide ({}) response {} at t={}",
            self.formulation, response, time
        );
        self.last_response = response;
        self.pool.record(time, concentrations)
    }

    fn source_term(&self) -> CyderResult<MassSnapshot> {
        let contained = self.pool.contained();
        Ok(MassSnapshot::new(
            contained.composition,
            contained.mass * self.last_response,
        ))
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
        self.calculate_fluid_volume()
    }

    fn fresh_copy(&self, geometry: Geometry, time: Time) -> Box<dyn NuclideModel> {
        Box::new(Self {
            parameters: self.parameters.clone(),
            formulation: self.formulation,
            geometry,
            last_response: 1.0,
            pool: NuclidePool::starting_at(time),
            properties: Arc::clone(&self.properties),
        })
    }
}

fn range_error(msg: String) -> CyderError {
    error!("{}", msg);
    CyderError::Range(msg)
}

//! Retarded pore-fluid nuclide model
//!
//! The contents are mixed into the pore fluid $V_f = n V_T$ and slowed by
//! linear sorption onto the matrix:
//!
//! $$ R = 1 + \frac{\rho K_d}{n} \qquad C = \frac{m}{R V_f} $$
//!
//! The full two-dimensional kernel is not evaluated; the boundary gradient and
//! flux come from the shared Neumann and Cauchy forms. This model takes nothing
//! from its daughters.

use cyder_core::errors::{CyderError, CyderResult};
use cyder_core::geometry::Geometry;
use cyder_core::history::MassSnapshot;
use cyder_core::material::Material;
use cyder_core::mat_tools::{self, comp_to_conc_map, validate_finite_pos};
use cyder_core::nuclide_model::{
    cauchy_bc, neumann_bc, DaughterBoundary, NuclideModel, NuclideModelType, NuclidePool,
};
use cyder_core::types::{FloatValue, IsoConcMap, Radius, Time};
use log::{debug, error};
use serde::{Deserialize, Serialize};

/// Parameters for the retarded pore-fluid model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoDimPPMNuclideParameters {
    /// unit: m / s
    #[serde(default)]
    pub advective_velocity: FloatValue,
    /// unit: m^2 / s
    pub dispersion: FloatValue,
    pub porosity: FloatValue,
    /// unit: kg / m^3
    pub bulk_density: FloatValue,
    /// Distribution coefficient, Kd
    /// unit: m^3 / kg
    pub partition: FloatValue,
}

#[derive(Debug, Clone)]
pub struct TwoDimPPMNuclide {
    parameters: TwoDimPPMNuclideParameters,
    retardation: FloatValue,
    geometry: Geometry,
    pool: NuclidePool,
}

impl TwoDimPPMNuclide {
    pub fn from_parameters(
        parameters: TwoDimPPMNuclideParameters,
        geometry: Geometry,
    ) -> CyderResult<Self> {
        mat_tools::validate_percent(parameters.porosity)?;
        validate_finite_pos(parameters.advective_velocity)?;
        validate_finite_pos(parameters.dispersion)?;
        validate_finite_pos(parameters.bulk_density)?;
        validate_finite_pos(parameters.partition)?;
        let retardation = retardation(
            parameters.porosity,
            parameters.bulk_density,
            parameters.partition,
        )?;
        Ok(Self {
            parameters,
            retardation,
            geometry,
            pool: NuclidePool::starting_at(0),
        })
    }

    pub fn retardation(&self) -> FloatValue {
        self.retardation
    }

    /// Retarded pore-fluid concentration of the contents
    pub fn calculate_concentration(&self) -> CyderResult<IsoConcMap> {
        let contained = self.pool.contained();
        if contained.mass == 0.0 {
            return Ok(IsoConcMap::new());
        }
        comp_to_conc_map(
            &contained.composition,
            contained.mass / self.retardation,
            self.free_fluid_volume()?,
        )
    }
}

/// $R = 1 + \rho K_d / n$
///
/// Without sorption $R = 1$ for any porosity.
pub fn retardation(
    porosity: FloatValue,
    bulk_density: FloatValue,
    partition: FloatValue,
) -> CyderResult<FloatValue> {
    if partition == 0.0 || bulk_density == 0.0 {
        return Ok(1.0);
    }
    if porosity == 0.0 {
        let msg = format!(
            "Retardation is undefined for a porosity of zero with Kd={}.",
            partition
        );
        error!("{}", msg);
        return Err(CyderError::Range(msg));
    }
    Ok(1.0 + bulk_density * partition / porosity)
}

impl NuclideModel for TwoDimPPMNuclide {
    fn model_type(&self) -> NuclideModelType {
        NuclideModelType::TwoDimPpm
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
        let concentrations = self.calculate_concentration()?;
        debug!(
            "TwoDimPPMNuclide retarded by {} at t={}",
            self.retardation, time
        );
        self.pool.record(time, concentrations)
    }

    fn source_term(&self) -> CyderResult<MassSnapshot> {
        let contained = self.pool.contained();
        Ok(MassSnapshot::new(
            contained.composition,
            contained.mass / self.retardation,
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
        let dispersion = self.parameters.dispersion;
        cauchy_bc(
            &self.neumann(c_ext, r_ext, time)?,
            &self.dirichlet(time)?,
            self.parameters.advective_velocity,
            |_| Ok(dispersion),
        )
    }

    fn free_fluid_volume(&self) -> CyderResult<FloatValue> {
        mat_tools::fluid_volume(self.geometry.volume()?, self.parameters.porosity)
    }

    fn update_inner_bc(
        &self,
        _time: Time,
        daughters: &[DaughterBoundary],
    ) -> CyderResult<Vec<Material>> {
        Ok(daughters.iter().map(|_| Material::empty()).collect())
    }

    fn fresh_copy(&self, geometry: Geometry, time: Time) -> Box<dyn NuclideModel> {
        Box::new(Self {
            parameters: self.parameters.clone(),
            retardation: self.retardation,
            geometry,
            pool: NuclidePool::starting_at(time),
        })
    }
}

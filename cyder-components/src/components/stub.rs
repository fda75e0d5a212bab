//! Placeholder nuclide model
//!
//! Holds whatever it is given and releases nothing. Useful for components
//! whose transport is not of interest, such as an environment sink.

use cyder_core::errors::CyderResult;
use cyder_core::geometry::Geometry;
use cyder_core::history::MassSnapshot;
use cyder_core::material::Material;
use cyder_core::nuclide_model::{DaughterBoundary, NuclideModel, NuclideModelType, NuclidePool};
use cyder_core::types::{FloatValue, IsoConcMap, Radius, Time};
use serde::{Deserialize, Serialize};

/// The stub model takes no parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StubNuclideParameters {}

#[derive(Debug, Clone)]
pub struct StubNuclide {
    geometry: Geometry,
    pool: NuclidePool,
}

impl StubNuclide {
    pub fn from_parameters(_parameters: StubNuclideParameters, geometry: Geometry) -> Self {
        Self {
            geometry,
            pool: NuclidePool::starting_at(0),
        }
    }
}

impl NuclideModel for StubNuclide {
    fn model_type(&self) -> NuclideModelType {
        NuclideModelType::Stub
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
        self.pool.record(time, IsoConcMap::new())
    }

    fn source_term(&self) -> CyderResult<MassSnapshot> {
        Ok(MassSnapshot::zero())
    }

    fn dirichlet(&self, _time: Time) -> CyderResult<IsoConcMap> {
        Ok(IsoConcMap::new())
    }

    fn neumann(&self, _c_ext: &IsoConcMap, _r_ext: Radius, _time: Time) -> CyderResult<IsoConcMap> {
        Ok(IsoConcMap::new())
    }

    fn cauchy(&self, _c_ext: &IsoConcMap, _r_ext: Radius, _time: Time) -> CyderResult<IsoConcMap> {
        Ok(IsoConcMap::new())
    }

    fn free_fluid_volume(&self) -> CyderResult<FloatValue> {
        Ok(0.0)
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
            geometry,
            pool: NuclidePool::starting_at(time),
        })
    }
}

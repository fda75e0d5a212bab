mod deg_rate;
mod lumped;
mod mixed_cell;
pub mod one_dim_ppm;
mod stub;
mod two_dim_ppm;

pub use deg_rate::{DegRateNuclide, DegRateNuclideParameters};
pub use lumped::{Formulation, LumpedNuclide, LumpedNuclideParameters};
pub use mixed_cell::{MixedCellNuclide, MixedCellNuclideParameters};
pub use one_dim_ppm::{OneDimPPMNuclide, OneDimPPMNuclideParameters};
pub use stub::{StubNuclide, StubNuclideParameters};
pub use two_dim_ppm::{TwoDimPPMNuclide, TwoDimPPMNuclideParameters};

use cyder_core::errors::{CyderError, CyderResult};
use cyder_core::properties::MaterialProperties;
use cyder_core::types::{FloatValue, Iso};

/// Dispersion coefficient lookup for the Cauchy boundary
fn dispersion_lookup<'a>(
    properties: &'a dyn MaterialProperties,
    material: Option<&'a str>,
) -> impl Fn(Iso) -> CyderResult<FloatValue> + 'a {
    move |iso| match material {
        Some(material) => properties.dispersion_coefficient(material, iso),
        None => Err(CyderError::Configuration(
            "A dispersion coefficient is needed but no material is set".to_string(),
        )),
    }
}

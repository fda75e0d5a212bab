//! Construction of nuclide models from a type tag and a parameter table.

use std::sync::Arc;

use crate::components::{
    DegRateNuclide, LumpedNuclide, MixedCellNuclide, OneDimPPMNuclide, StubNuclide,
    TwoDimPPMNuclide,
};
use cyder_core::errors::{CyderError, CyderResult};
use cyder_core::geometry::Geometry;
use cyder_core::nuclide_model::{NuclideModel, NuclideModelType};
use cyder_core::properties::MaterialProperties;
use log::{debug, error};
use serde::de::DeserializeOwned;

/// Build the nuclide model named by `kind`
///
/// `parameters` is deserialised into that model's parameter struct. Missing or
/// mistyped parameters are a [`CyderError::Configuration`]; values outside their
/// physical domain are a [`CyderError::Range`].
pub fn build_nuclide_model(
    kind: NuclideModelType,
    parameters: toml::Table,
    geometry: Geometry,
    properties: Arc<dyn MaterialProperties>,
) -> CyderResult<Box<dyn NuclideModel>> {
    debug!("Building a {} model", kind);
    let model: Box<dyn NuclideModel> = match kind {
        NuclideModelType::DegRate => Box::new(DegRateNuclide::from_parameters(
            deserialize(kind, parameters)?,
            geometry,
            properties,
        )?),
        NuclideModelType::Lumped => Box::new(LumpedNuclide::from_parameters(
            deserialize(kind, parameters)?,
            geometry,
            properties,
        )?),
        NuclideModelType::MixedCell => Box::new(MixedCellNuclide::from_parameters(
            deserialize(kind, parameters)?,
            geometry,
            properties,
        )?),
        NuclideModelType::OneDimPpm => Box::new(OneDimPPMNuclide::from_parameters(
            deserialize(kind, parameters)?,
            geometry,
            properties,
        )?),
        NuclideModelType::Stub => Box::new(StubNuclide::from_parameters(
            deserialize(kind, parameters)?,
            geometry,
        )),
        NuclideModelType::TwoDimPpm => Box::new(TwoDimPPMNuclide::from_parameters(
            deserialize(kind, parameters)?,
            geometry,
        )?),
    };
    Ok(model)
}

fn deserialize<T: DeserializeOwned>(kind: NuclideModelType, parameters: toml::Table) -> CyderResult<T> {
    toml::Value::Table(parameters).try_into().map_err(|e| {
        let msg = format!("Invalid parameters for {}: {}", kind, e);
        error!("{}", msg);
        CyderError::Configuration(msg)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyder_core::geometry::Point;
    use cyder_core::properties::MaterialTable;

    fn build(kind: &str, parameters: &str) -> CyderResult<Box<dyn NuclideModel>> {
        let geometry = Geometry::new(0.0, 1.0, Point::default(), 1.0)?;
        let parameters: toml::Table = toml::from_str(parameters)?;
        build_nuclide_model(
            kind.parse()?,
            parameters,
            geometry,
            Arc::new(MaterialTable::new()),
        )
    }

    #[test]
    fn builds_every_model() {
        let cases = [
            ("DegRateNuclide", "degradation = 0.1"),
            (
                "LumpedNuclide",
                "formulation = \"DM\"\ntransit_time = 12.0\npeclet = 2.0\nporosity = 0.1",
            ),
            ("MixedCellNuclide", "porosity = 0.3\ndegradation = 0.2"),
            (
                "OneDimPPMNuclide",
                "porosity = 0.1\nbulk_density = 1500.0\nadvective_velocity = 1e-9\nmaterial = \"clay\"",
            ),
            ("StubNuclide", ""),
            (
                "TwoDimPPMNuclide",
                "dispersion = 1e-9\nporosity = 0.1\nbulk_density = 1500.0\npartition = 0.0",
            ),
        ];
        for (name, parameters) in cases {
            let model = build(name, parameters).unwrap();
            assert_eq!(model.model_type().name(), name);
            assert_eq!(model.geometry().outer_radius(), 1.0);
        }
    }

    #[test]
    fn unknown_model_is_a_configuration_error() {
        assert!(matches!(
            build("FancyNuclide", ""),
            Err(CyderError::Configuration(_))
        ));
    }

    #[test]
    fn missing_parameter_is_a_configuration_error() {
        assert!(matches!(
            build("DegRateNuclide", "advective_velocity = 1.0"),
            Err(CyderError::Configuration(_))
        ));
        assert!(matches!(
            build("DegRateNuclide", "degradation = \"fast\""),
            Err(CyderError::Configuration(_))
        ));
    }

    #[test]
    fn out_of_range_parameter_is_a_range_error() {
        assert!(matches!(
            build("DegRateNuclide", "degradation = 1.5"),
            Err(CyderError::Range(_))
        ));
    }
}

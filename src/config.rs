//! TOML configuration of a repository and its component templates.
//!
//! ```toml
//! x = 100.0
//! y = 100.0
//! z = 100.0
//! dx = 10.0
//! dy = 10.0
//! dz = 10.0
//! capacity = 100.0
//! inventory_size = 70000.0
//! lifetime = 1200
//! in_commods = ["spent_fuel"]
//!
//! [[components]]
//! name = "glass"
//! component_type = "WF"
//! inner_radius = 0.0
//! outer_radius = 0.5
//! length = 1.0
//! allowed_commods = ["spent_fuel"]
//! [components.nuclide_model]
//! model = "DegRateNuclide"
//! parameters = { degradation = 0.01 }
//! ```

use std::sync::Arc;

use cyder_components::build_nuclide_model;
use cyder_core::component::{ComponentParameters, ComponentType, ThermalModelType};
use cyder_core::errors::CyderResult;
use cyder_core::geometry::{Geometry, Point};
use cyder_core::nuclide_model::{NuclideModel, NuclideModelType};
use cyder_core::properties::MaterialProperties;
use cyder_core::types::{FloatValue, Radius, Time};
use serde::{Deserialize, Serialize};

fn default_temperature_limit() -> FloatValue {
    373.0
}

fn default_toxicity_limit() -> FloatValue {
    10.0
}

fn default_thermal_model() -> String {
    ThermalModelType::default().name().to_string()
}

/// Nuclide model selection of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuclideModelConfig {
    /// Registered model name, such as `DegRateNuclide`
    pub model: String,
    #[serde(default)]
    pub parameters: toml::Table,
}

/// A component template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    /// One of `BUFFER`, `ENV`, `FF`, `NF`, `WF` or `WP`
    pub component_type: String,
    /// unit: m
    pub inner_radius: Radius,
    /// May be `inf` for the far field
    /// unit: m
    pub outer_radius: Radius,
    /// unit: m
    pub length: FloatValue,
    /// Maximum number of children. Absent means never full.
    #[serde(default)]
    pub capacity: Option<usize>,
    /// unit: K
    #[serde(default = "default_temperature_limit")]
    pub temperature_limit: FloatValue,
    #[serde(default = "default_toxicity_limit")]
    pub toxicity_limit: FloatValue,
    #[serde(default = "default_thermal_model")]
    pub thermal_model: String,
    pub nuclide_model: NuclideModelConfig,
    /// Commodities a waste form template conditions
    #[serde(default)]
    pub allowed_commods: Vec<String>,
    /// Waste form names a waste package template holds
    #[serde(default)]
    pub allowed_wastes: Vec<String>,
}

impl ComponentConfig {
    pub fn component_type(&self) -> CyderResult<ComponentType> {
        self.component_type.parse()
    }

    pub fn thermal_model(&self) -> CyderResult<ThermalModelType> {
        self.thermal_model.parse()
    }

    pub fn nuclide_model_type(&self) -> CyderResult<NuclideModelType> {
        self.nuclide_model.model.parse()
    }

    /// Template geometry, centred on the origin until placed
    pub fn geometry(&self) -> CyderResult<Geometry> {
        Geometry::new(
            self.inner_radius,
            self.outer_radius,
            Point::default(),
            self.length,
        )
    }

    pub fn parameters(&self) -> CyderResult<ComponentParameters> {
        Ok(ComponentParameters {
            name: self.name.clone(),
            component_type: self.component_type()?,
            thermal_model: self.thermal_model()?,
            capacity: self.capacity,
            temperature_limit: self.temperature_limit,
            toxicity_limit: self.toxicity_limit,
        })
    }

    /// Build the template's nuclide model
    ///
    /// A model that takes an advective velocity but does not set one uses
    /// `advective_velocity`.
    pub fn build_nuclide_model(
        &self,
        advective_velocity: FloatValue,
        properties: Arc<dyn MaterialProperties>,
    ) -> CyderResult<Box<dyn NuclideModel>> {
        let kind = self.nuclide_model_type()?;
        let mut parameters = self.nuclide_model.parameters.clone();
        if kind != NuclideModelType::Stub {
            parameters
                .entry("advective_velocity")
                .or_insert(toml::Value::Float(advective_velocity));
        }
        build_nuclide_model(kind, parameters, self.geometry()?, properties)
    }
}

/// A repository and the templates it copies its components from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Extent of the repository footprint
    /// unit: m
    pub x: FloatValue,
    pub y: FloatValue,
    pub z: FloatValue,
    /// Spacing of buffers along x
    /// unit: m
    pub dx: FloatValue,
    /// Spacing of packages along y
    pub dy: FloatValue,
    /// Depth of emplaced buffers and packages
    pub dz: FloatValue,
    /// Default advective velocity for component models
    /// unit: m / s
    #[serde(default)]
    pub advective_velocity: FloatValue,
    /// Most material accepted per step
    /// unit: kg
    pub capacity: FloatValue,
    /// Most material held in inventory and stocks together
    /// unit: kg
    pub inventory_size: FloatValue,
    /// Steps during which material is requested
    pub lifetime: Time,
    #[serde(default)]
    pub start_operation_year: i32,
    #[serde(default)]
    pub start_operation_month: u32,
    /// Commodities requested, in rotation
    pub in_commods: Vec<String>,
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

impl RepositoryConfig {
    pub fn from_toml_str(s: &str) -> CyderResult<Self> {
        Ok(toml::from_str(s)?)
    }
}

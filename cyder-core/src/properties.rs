//! Element-indexed material property lookup.
//!
//! Transport models need the dispersion coefficient, distribution coefficient
//! and solubility limit of each element in the material they are made of.
//! The lookup is passed to each model when it is built rather than reached
//! through a global, so tests can supply fixture data.

use crate::errors::{CyderError, CyderResult};
use crate::mat_tools::validate_finite_pos;
use crate::types::{iso_to_elem, Elem, FloatValue, Iso};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Transport properties of one element in one material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementProperties {
    /// Dispersion coefficient
    /// unit: m^2 / s
    pub dispersion: FloatValue,
    /// Distribution (partition) coefficient, Kd
    /// unit: m^3 / kg
    pub partition: FloatValue,
    /// Solubility limit
    /// unit: kg / m^3
    pub solubility: FloatValue,
}

impl ElementProperties {
    fn validate(&self) -> CyderResult<()> {
        validate_finite_pos(self.dispersion)?;
        validate_finite_pos(self.partition)?;
        validate_finite_pos(self.solubility)
    }
}

/// Lookup of element properties by material name
pub trait MaterialProperties: Debug + Send + Sync {
    fn element(&self, material: &str, element: Elem) -> CyderResult<ElementProperties>;

    fn dispersion_coefficient(&self, material: &str, iso: Iso) -> CyderResult<FloatValue> {
        Ok(self.element(material, iso_to_elem(iso))?.dispersion)
    }

    fn partition_coefficient(&self, material: &str, iso: Iso) -> CyderResult<FloatValue> {
        Ok(self.element(material, iso_to_elem(iso))?.partition)
    }

    fn solubility_limit(&self, material: &str, iso: Iso) -> CyderResult<FloatValue> {
        Ok(self.element(material, iso_to_elem(iso))?.solubility)
    }
}

/// In-memory property table
///
/// Reads from TOML keyed by material, then element number:
///
/// ```toml
/// [clay.92]
/// dispersion = 1e-9
/// partition = 0.5
/// solubility = 1e-3
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialTable {
    materials: BTreeMap<String, BTreeMap<Elem, ElementProperties>>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        material: &str,
        element: Elem,
        properties: ElementProperties,
    ) -> CyderResult<()> {
        properties.validate()?;
        self.materials
            .entry(material.to_string())
            .or_default()
            .insert(element, properties);
        Ok(())
    }

    /// Builder-style insert
    pub fn with_element(
        mut self,
        material: &str,
        element: Elem,
        properties: ElementProperties,
    ) -> CyderResult<Self> {
        self.insert(material, element, properties)?;
        Ok(self)
    }

    pub fn from_toml_str(s: &str) -> CyderResult<Self> {
        let raw: BTreeMap<String, BTreeMap<String, ElementProperties>> = toml::from_str(s)?;
        let mut table = Self::new();
        for (material, elements) in raw {
            for (element, properties) in elements {
                let element: Elem = element.parse().map_err(|_| {
                    CyderError::Configuration(format!(
                        "Material '{}' has an element key '{}' that is not an atomic number",
                        material, element
                    ))
                })?;
                table.insert(&material, element, properties)?;
            }
        }
        Ok(table)
    }

    pub fn materials(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(|k| k.as_str())
    }
}

impl MaterialProperties for MaterialTable {
    fn element(&self, material: &str, element: Elem) -> CyderResult<ElementProperties> {
        let elements = self.materials.get(material).ok_or_else(|| {
            CyderError::Configuration(format!("No property data for material '{}'", material))
        })?;
        elements.get(&element).copied().ok_or_else(|| {
            CyderError::Configuration(format!(
                "No property data for element {} in material '{}'",
                element, material
            ))
        })
    }
}

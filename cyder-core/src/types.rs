//! Scalar and map types shared across the transport models.

use std::collections::BTreeMap;

pub type FloatValue = f64;

/// Discrete simulation time step, counted in months
pub type Time = i64;

/// Isotope identifier, encoded as `Z * 1000 + A` (e.g. 92235 for U-235)
pub type Iso = i32;

/// Element identifier (atomic number)
pub type Elem = i32;

/// unit: m
pub type Radius = FloatValue;

/// Isotope to concentration.
/// unit: kg / m^3
///
/// The same shape carries gradients (kg / m^4) and fluxes (kg / m^2 / s) for
/// the Neumann and Cauchy boundary conditions. The empty map is the zero map.
pub type IsoConcMap = BTreeMap<Iso, FloatValue>;

/// Isotope to mass fraction
pub type CompMap = BTreeMap<Iso, FloatValue>;

/// Mean length of a month in seconds
pub const SECONDS_PER_MONTH: FloatValue = 365.25 * 86400.0 / 12.0;

/// Element of an isotope identifier
pub fn iso_to_elem(iso: Iso) -> Elem {
    iso / 1000
}

/// True when every value in the map is zero
pub fn is_zero_map(map: &IsoConcMap) -> bool {
    map.values().all(|v| *v == 0.0)
}

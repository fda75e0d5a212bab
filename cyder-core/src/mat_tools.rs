//! Mass-balance helpers
//!
//! Stateless functions for summing material batches, converting between mass
//! compositions and volumetric concentrations, and partitioning a component's
//! volume into solid and fluid, degraded and intact compartments.
//!
//! With porosity $\theta$ and degraded fraction $d$ of a total volume $V_T$:
//!
//! $$ V_f = \theta V_T \qquad V_{ff} = d V_f \qquad V_{mf} = V_f - V_{ff} $$
//! $$ V_s = V_T - V_f \qquad V_{ds} = d V_s \qquad V_{ms} = V_s - V_{ds} $$

use crate::errors::{CyderError, CyderResult};
use crate::material::{Material, MASS_EPS};
use crate::types::{CompMap, FloatValue, IsoConcMap};
use log::{debug, error};
use std::collections::VecDeque;

// ============================================================================
// Validation
// ============================================================================

/// Checks that a value is a fraction in [0, 1]
pub fn validate_percent(value: FloatValue) -> CyderResult<()> {
    if (0.0..=1.0).contains(&value) {
        return Ok(());
    }
    let msg = if value < 0.0 {
        format!("The value {} is not a valid percent. It is less than zero.", value)
    } else {
        format!("The value {} is not a valid percent. It is not at most one.", value)
    };
    error!("{}", msg);
    Err(CyderError::Range(msg))
}

/// Checks that a value is finite and non-negative
pub fn validate_finite_pos(value: FloatValue) -> CyderResult<()> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    let msg = if value.is_nan() || value.is_infinite() {
        format!("The value {} is not positive and finite.", value)
    } else {
        format!(
            "The value {} is not positive and finite. It is less than zero.",
            value
        )
    };
    error!("{}", msg);
    Err(CyderError::Range(msg))
}

pub fn validate_nonzero(value: FloatValue) -> CyderResult<()> {
    if value != 0.0 {
        return Ok(());
    }
    let msg = "The value is zero where a non-zero value is required.".to_string();
    error!("{}", msg);
    Err(CyderError::Range(msg))
}

// ============================================================================
// Material batches
// ============================================================================

/// Normalised composition and total mass of a set of batches
///
/// An empty set sums to an empty composition and zero mass.
pub fn sum_mats<'a>(mats: impl IntoIterator<Item = &'a Material>) -> (CompMap, FloatValue) {
    let mut combined = Material::empty();
    for mat in mats {
        combined.absorb(mat.clone());
    }
    (combined.composition(), combined.mass())
}

/// Remove `mass` kg of `composition` from a list of batches
///
/// The batches are merged into one before extraction. Whatever is left over
/// (above [`MASS_EPS`]) replaces the list; on failure the list is unchanged.
pub fn extract(
    composition: &CompMap,
    mass: FloatValue,
    mats: &mut VecDeque<Material>,
) -> CyderResult<Material> {
    let mut left_over = Material::empty();
    for mat in mats.iter() {
        left_over.absorb(mat.clone());
    }
    let extracted = left_over.extract(composition, mass)?;
    debug!(
        "Extracted {} kg, {} kg left over",
        extracted.mass(),
        left_over.mass()
    );
    mats.clear();
    if left_over.mass() > MASS_EPS {
        mats.push_back(left_over);
    }
    Ok(extracted)
}

/// Merge several batches into one
pub fn combine_mats(mats: impl IntoIterator<Item = Material>) -> Material {
    let mut combined = Material::empty();
    for mat in mats {
        combined.absorb(mat);
    }
    combined
}

// ============================================================================
// Concentrations
// ============================================================================

/// Concentration of each isotope when `mass` kg of `composition` fills `volume`
///
/// A volume of zero can only hold zero mass, which gives zero concentrations.
pub fn comp_to_conc_map(
    composition: &CompMap,
    mass: FloatValue,
    volume: FloatValue,
) -> CyderResult<IsoConcMap> {
    validate_finite_pos(volume)?;
    validate_finite_pos(mass)?;
    if volume == 0.0 {
        if mass > MASS_EPS {
            let msg = format!("Cannot hold {} kg in a volume of zero.", mass);
            error!("{}", msg);
            return Err(CyderError::Range(msg));
        }
        return Ok(composition.keys().map(|iso| (*iso, 0.0)).collect());
    }
    Ok(composition
        .iter()
        .map(|(iso, frac)| (*iso, frac * mass / volume))
        .collect())
}

/// Normalised composition and total mass of the concentrations in `volume`
pub fn conc_to_comp_map(
    concentrations: &IsoConcMap,
    volume: FloatValue,
) -> CyderResult<(CompMap, FloatValue)> {
    validate_finite_pos(volume)?;
    let masses: CompMap = concentrations
        .iter()
        .map(|(iso, c)| (*iso, c * volume))
        .collect();
    let total: FloatValue = masses.values().sum();
    let composition = if total > 0.0 {
        masses.iter().map(|(iso, m)| (*iso, m / total)).collect()
    } else {
        CompMap::new()
    };
    Ok((composition, total))
}

/// Multiply every concentration by a finite, non-negative scalar
pub fn scale_conc_map(concentrations: &IsoConcMap, scalar: FloatValue) -> CyderResult<IsoConcMap> {
    validate_finite_pos(scalar)?;
    Ok(concentrations
        .iter()
        .map(|(iso, c)| (*iso, c * scalar))
        .collect())
}

/// Sum two maps isotope by isotope, keeping the union of keys
pub fn add_conc_maps(a: &IsoConcMap, b: &IsoConcMap) -> IsoConcMap {
    let mut sum = a.clone();
    for (iso, c) in b {
        *sum.entry(*iso).or_insert(0.0) += c;
    }
    sum
}

// ============================================================================
// Volume partitions
// ============================================================================

/// Fluid (pore) volume, $V_f = \theta V_T$
pub fn fluid_volume(total: FloatValue, porosity: FloatValue) -> CyderResult<FloatValue> {
    validate_percent(porosity)?;
    validate_finite_pos(total)?;
    Ok(porosity * total)
}

/// Fluid volume in the degraded fraction, $V_{ff} = d V_f$
pub fn free_fluid_volume(
    total: FloatValue,
    porosity: FloatValue,
    degradation: FloatValue,
) -> CyderResult<FloatValue> {
    validate_percent(degradation)?;
    Ok(degradation * fluid_volume(total, porosity)?)
}

/// Fluid volume in the intact matrix, $V_{mf} = V_f - V_{ff}$
pub fn matrix_fluid_volume(
    total: FloatValue,
    porosity: FloatValue,
    degradation: FloatValue,
) -> CyderResult<FloatValue> {
    Ok(fluid_volume(total, porosity)? - free_fluid_volume(total, porosity, degradation)?)
}

/// Solid volume, $V_s = V_T - V_f$
pub fn solid_volume(total: FloatValue, porosity: FloatValue) -> CyderResult<FloatValue> {
    Ok(total - fluid_volume(total, porosity)?)
}

/// Solid volume in the degraded fraction, $V_{ds} = d V_s$
pub fn degraded_solid_volume(
    total: FloatValue,
    porosity: FloatValue,
    degradation: FloatValue,
) -> CyderResult<FloatValue> {
    validate_percent(degradation)?;
    Ok(degradation * solid_volume(total, porosity)?)
}

/// Solid volume in the intact matrix, $V_{ms} = V_s - V_{ds}$
pub fn matrix_solid_volume(
    total: FloatValue,
    porosity: FloatValue,
    degradation: FloatValue,
) -> CyderResult<FloatValue> {
    Ok(solid_volume(total, porosity)? - degraded_solid_volume(total, porosity, degradation)?)
}

// ============================================================================
// Numerics
// ============================================================================

/// `n` evenly spaced points from `a` to `b` inclusive
pub fn linspace(a: FloatValue, b: FloatValue, n: usize) -> Vec<FloatValue> {
    match n {
        0 => vec![],
        1 => vec![a],
        _ => {
            let step = (b - a) / (n - 1) as FloatValue;
            (0..n)
                .map(|i| if i == n - 1 { b } else { a + step * i as FloatValue })
                .collect()
        }
    }
}

/// Compensated (Kahan) summation
pub fn kahan_sum(values: &[FloatValue]) -> FloatValue {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for value in values {
        let y = value - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    sum
}

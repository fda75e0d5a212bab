//! Solubility and sorption partitioning
//!
//! Splits the total mass $m_T$ of an element between the solid matrix and the
//! pore fluid using a linear distribution coefficient $K_d$, then between the
//! degraded ("free") and intact ("matrix") fractions with degradation $d$.
//! With $\theta = V_f / V_s$ (or 1 when there is no solid):
//!
//! $$ m_f = \frac{m_T \theta}{K_d - K_d \theta + \theta} \qquad m_s = K_d m_f \frac{V_s}{V_f} $$
//!
//! The dissolved mass available in the free fluid is capped by the solubility
//! limit $C_{sol}$:
//!
//! $$ m_{aff} = \min(C_{sol} V_{ff}, m_{ff}) $$

use crate::errors::{CyderError, CyderResult};
use crate::types::FloatValue;
use log::error;

/// Mass in the pore fluid, $m_f$
/// unit: kg
pub fn fluid_mass(
    m_t: FloatValue,
    k_d: FloatValue,
    v_s: FloatValue,
    v_f: FloatValue,
) -> CyderResult<FloatValue> {
    let theta = if v_s == 0.0 { 1.0 } else { v_f / v_s };
    let denominator = k_d - k_d * theta + theta;
    if denominator == 0.0 || !denominator.is_finite() {
        let msg = format!(
            "Cannot partition mass with Kd={}, V_s={}, V_f={}: the fluid fraction is undefined.",
            k_d, v_s, v_f
        );
        error!("{}", msg);
        return Err(CyderError::Range(msg));
    }
    Ok(m_t * theta / denominator)
}

/// Mass sorbed onto the solid, $m_s$
///
/// All mass is sorbed when none dissolves.
pub fn sorbed_mass(
    m_t: FloatValue,
    k_d: FloatValue,
    v_s: FloatValue,
    v_f: FloatValue,
) -> CyderResult<FloatValue> {
    let m_f = fluid_mass(m_t, k_d, v_s, v_f)?;
    if m_f == 0.0 {
        return Ok(m_t);
    }
    Ok(k_d * m_f * v_s / v_f)
}

/// Sorbed mass in the degraded solid, $m_{ds} = d m_s$
pub fn degraded_sorbed_mass(
    m_t: FloatValue,
    k_d: FloatValue,
    v_s: FloatValue,
    v_f: FloatValue,
    d: FloatValue,
) -> CyderResult<FloatValue> {
    Ok(d * sorbed_mass(m_t, k_d, v_s, v_f)?)
}

/// Sorbed mass in the intact matrix, $m_{ms} = (1 - d) m_s$
pub fn matrix_sorbed_mass(
    m_t: FloatValue,
    k_d: FloatValue,
    v_s: FloatValue,
    v_f: FloatValue,
    d: FloatValue,
) -> CyderResult<FloatValue> {
    Ok((1.0 - d) * sorbed_mass(m_t, k_d, v_s, v_f)?)
}

/// Dissolved mass in the free (degraded) fluid, $m_{ff} = d m_f$
pub fn free_fluid_mass(
    m_t: FloatValue,
    k_d: FloatValue,
    v_s: FloatValue,
    v_f: FloatValue,
    d: FloatValue,
) -> CyderResult<FloatValue> {
    Ok(d * fluid_mass(m_t, k_d, v_s, v_f)?)
}

/// Dissolved mass in the intact matrix fluid, $m_{mf} = (1 - d) m_f$
pub fn matrix_fluid_mass(
    m_t: FloatValue,
    k_d: FloatValue,
    v_s: FloatValue,
    v_f: FloatValue,
    d: FloatValue,
) -> CyderResult<FloatValue> {
    Ok((1.0 - d) * fluid_mass(m_t, k_d, v_s, v_f)?)
}

/// Free-fluid mass that stays in solution under the solubility limit, $m_{aff}$
///
/// # Arguments
///
/// * `m_ff` - Dissolved mass in the free fluid (kg)
/// * `v_ff` - Free fluid volume (m^3)
/// * `c_sol` - Solubility limit (kg/m^3)
pub fn available_free_fluid_mass(
    m_ff: FloatValue,
    v_ff: FloatValue,
    c_sol: FloatValue,
) -> FloatValue {
    (c_sol * v_ff).min(m_ff)
}

/// Mass precipitated out of the free fluid, $m_{ps} = m_{ff} - m_{aff}$
pub fn precipitated_mass(
    m_t: FloatValue,
    k_d: FloatValue,
    v_s: FloatValue,
    v_f: FloatValue,
    d: FloatValue,
    c_sol: FloatValue,
) -> CyderResult<FloatValue> {
    let m_ff = free_fluid_mass(m_t, k_d, v_s, v_f, d)?;
    Ok(m_ff - available_free_fluid_mass(m_ff, v_f, c_sol))
}

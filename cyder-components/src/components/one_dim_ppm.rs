//! One-dimensional porous-medium nuclide model
//!
//! Contaminant entering the inner boundary of a porous component is carried
//! outward by advection and dispersion, retarded by linear sorption. The
//! concentration at distance $z$ from the inner boundary, time $t$ after a step
//! change from $C_i$ to $C_0$ at the inlet, is
//!
//! $$ C(z, t) = C_i + (C_0 - C_i) A(z, t) $$
//!
//! where $A = A_1 + A_2 + A_3 + A_4 + A_5$ is the finite-length solution with a
//! flux inlet (van Genuchten and Alves, 1982). The terms mix large exponentials
//! of opposite sign, so they are summed with [`kahan_sum`].
//!
//! Coupling to a daughter samples the increase in concentration across the
//! component and integrates it with the trapezoidal rule. The resulting mass,
//! measured against the daughter's free fluid volume, is taken up from the
//! daughter.

use std::f64::consts::PI;
use std::sync::Arc;

use super::dispersion_lookup;
use super::two_dim_ppm::retardation;
use cyder_core::errors::{CyderError, CyderResult};
use cyder_core::geometry::Geometry;
use cyder_core::history::MassSnapshot;
use cyder_core::material::Material;
use cyder_core::mat_tools::{
    self, add_conc_maps, comp_to_conc_map, conc_to_comp_map, kahan_sum, linspace,
    scale_conc_map, validate_finite_pos,
};
use cyder_core::nuclide_model::{
    cauchy_bc, neumann_bc, DaughterBoundary, NuclideModel, NuclideModelType, NuclidePool,
};
use cyder_core::properties::MaterialProperties;
use cyder_core::types::{FloatValue, Iso, IsoConcMap, Radius, Time, SECONDS_PER_MONTH};
use libm::erfc;
use log::{debug, error};
use serde::{Deserialize, Serialize};

/// Number of radii sampled across the component when coupling to a daughter
pub const N_POINTS: usize = 100;

/// Parameters for the one-dimensional porous-medium model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneDimPPMNuclideParameters {
    pub porosity: FloatValue,
    /// unit: kg / m^3
    pub bulk_density: FloatValue,
    /// unit: m / s
    pub advective_velocity: FloatValue,
    /// Material whose dispersion and distribution coefficients are used
    pub material: String,
}

#[derive(Debug, Clone)]
pub struct OneDimPPMNuclide {
    parameters: OneDimPPMNuclideParameters,
    geometry: Geometry,
    pool: NuclidePool,
    properties: Arc<dyn MaterialProperties>,
}

impl OneDimPPMNuclide {
    pub fn from_parameters(
        parameters: OneDimPPMNuclideParameters,
        geometry: Geometry,
        properties: Arc<dyn MaterialProperties>,
    ) -> CyderResult<Self> {
        mat_tools::validate_percent(parameters.porosity).map_err(|_| {
            range_error(format!(
                "The porosity range is 0 to 1, inclusive. The value provided was {}.",
                parameters.porosity
            ))
        })?;
        validate_finite_pos(parameters.bulk_density).map_err(|_| {
            range_error(format!(
                "The bulk density must be positive and finite. The value provided was {}.",
                parameters.bulk_density
            ))
        })?;
        if !parameters.advective_velocity.is_finite() {
            return Err(range_error(format!(
                "The advective velocity must be finite. The value provided was {}.",
                parameters.advective_velocity
            )));
        }
        Ok(Self {
            parameters,
            geometry,
            pool: NuclidePool::starting_at(0),
            properties,
        })
    }

    pub fn advective_velocity(&self) -> FloatValue {
        self.parameters.advective_velocity
    }

    /// Retardation of an isotope in this component's material
    pub fn retardation(&self, iso: Iso) -> CyderResult<FloatValue> {
        let k_d = self
            .properties
            .partition_coefficient(&self.parameters.material, iso)?;
        retardation(self.parameters.porosity, self.parameters.bulk_density, k_d)
    }

    /// Fluid-phase concentration of the current contents, $C_i$
    pub fn calculate_interior_concentration(&self) -> CyderResult<IsoConcMap> {
        let contained = self.pool.contained();
        if contained.mass == 0.0 {
            return Ok(IsoConcMap::new());
        }
        comp_to_conc_map(
            &contained.composition,
            contained.mass,
            self.free_fluid_volume()?,
        )
    }

    /// Concentration of `iso` at distance `z` into the component, `t` seconds
    /// after the inlet steps from `c_i` to `c_0`
    pub fn calculate_conc(
        &self,
        c_0: FloatValue,
        c_i: FloatValue,
        z: FloatValue,
        iso: Iso,
        t: FloatValue,
    ) -> CyderResult<FloatValue> {
        validate_finite_pos(c_0)?;
        validate_finite_pos(c_i)?;
        let d = self
            .properties
            .dispersion_coefficient(&self.parameters.material, iso)?;
        let r = self.retardation(iso)?;
        let l = self.geometry.outer_radius() - self.geometry.inner_radius();
        let a = azt(r, z, self.parameters.advective_velocity, t, d, l)?;
        Ok(c_i + (c_0 - c_i) * a)
    }

    /// Increase in concentration over `c_i` for every isotope of `c_0`, floored at zero
    pub fn calculate_conc_diff(
        &self,
        c_0: &IsoConcMap,
        c_i: &IsoConcMap,
        z: FloatValue,
        t: FloatValue,
    ) -> CyderResult<IsoConcMap> {
        c_0.iter()
            .map(|(iso, c0)| {
                let ci = c_i.get(iso).copied().unwrap_or(0.0);
                let conc = self.calculate_conc(*c0, ci, z, *iso, t)?;
                if !conc.is_finite() {
                    return Err(range_error(format!(
                        "The concentration of isotope {} is not finite.",
                        iso
                    )));
                }
                let diff = (conc - ci).max(0.0);
                validate_finite_pos(diff)?;
                Ok((*iso, diff))
            })
            .collect()
    }

    /// Mass drawn from one daughter over `steps` time steps
    fn calculate_uptake(
        &self,
        daughter: &DaughterBoundary,
        c_i: &IsoConcMap,
        steps: Time,
    ) -> CyderResult<Material> {
        if daughter.dirichlet.is_empty() {
            return Ok(Material::empty());
        }
        let a = self.geometry.inner_radius();
        let b = self.geometry.outer_radius();
        let t = steps as FloatValue * SECONDS_PER_MONTH;
        let samples = linspace(a, b, N_POINTS)
            .into_iter()
            .map(|r| self.calculate_conc_diff(&daughter.dirichlet, c_i, r - a, t))
            .collect::<CyderResult<Vec<_>>>()?;
        let integrated = trap_rule(a, b, N_POINTS - 1, &samples)?;
        let (composition, mass) = conc_to_comp_map(&integrated, daughter.free_fluid_volume)?;
        Material::from_composition(&composition, mass)
    }
}

impl NuclideModel for OneDimPPMNuclide {
    fn model_type(&self) -> NuclideModelType {
        NuclideModelType::OneDimPpm
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
        let concentrations = self.calculate_interior_concentration()?;
        debug!(
            "OneDimPPMNuclide holds {} kg at t={}",
            self.pool.contained_mass(),
            time
        );
        self.pool.record(time, concentrations)
    }

    fn source_term(&self) -> CyderResult<MassSnapshot> {
        Ok(self.pool.contained())
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
            dispersion_lookup(self.properties.as_ref(), Some(&self.parameters.material)),
        )
    }

    fn free_fluid_volume(&self) -> CyderResult<FloatValue> {
        mat_tools::fluid_volume(self.geometry.volume()?, self.parameters.porosity)
    }

    fn update_inner_bc(
        &self,
        time: Time,
        daughters: &[DaughterBoundary],
    ) -> CyderResult<Vec<Material>> {
        let steps = time - self.pool.last_updated();
        if steps <= 0 {
            return Ok(daughters.iter().map(|_| Material::empty()).collect());
        }
        let a = self.geometry.inner_radius();
        let b = self.geometry.outer_radius();
        if !self.geometry.is_bounded() || a >= b {
            return Err(range_error(format!(
                "Coupling needs a bounded component with inner radius ({}) below outer radius ({}).",
                a, b
            )));
        }
        let c_i = self.calculate_interior_concentration()?;
        daughters
            .iter()
            .map(|daughter| {
                let uptake = self.calculate_uptake(daughter, &c_i, steps)?;
                debug!(
                    "OneDimPPMNuclide takes up {} kg at t={}",
                    uptake.mass(),
                    time
                );
                Ok(uptake)
            })
            .collect()
    }

    fn fresh_copy(&self, geometry: Geometry, time: Time) -> Box<dyn NuclideModel> {
        Box::new(Self {
            parameters: self.parameters.clone(),
            geometry,
            pool: NuclidePool::starting_at(time),
            properties: Arc::clone(&self.properties),
        })
    }
}

// ============================================================================
// Analytic solution
// ============================================================================

fn validate_terms(r: FloatValue, d: FloatValue, t: FloatValue) -> CyderResult<()> {
    for (name, value) in [("retardation", r), ("dispersion coefficient", d), ("time", t)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(range_error(format!(
                "The {} must be finite and positive. The value provided was {}.",
                name, value
            )));
        }
    }
    Ok(())
}

/// $A_1 = \frac{1}{2} \operatorname{erfc}\left(\frac{Rz - vt}{2\sqrt{DRt}}\right)$
pub fn a1(
    r: FloatValue,
    z: FloatValue,
    v: FloatValue,
    t: FloatValue,
    d: FloatValue,
    _l: FloatValue,
) -> CyderResult<FloatValue> {
    validate_terms(r, d, t)?;
    let erfc_arg = (r * z - v * t) / (2.0 * (d * r * t).sqrt());
    Ok(0.5 * erfc(erfc_arg))
}

/// $A_2 = \sqrt{\frac{v^2 t}{\pi R D}} \exp\left(-\frac{(Rz - vt)^2}{4DRt}\right)$
pub fn a2(
    r: FloatValue,
    z: FloatValue,
    v: FloatValue,
    t: FloatValue,
    d: FloatValue,
    _l: FloatValue,
) -> CyderResult<FloatValue> {
    validate_terms(r, d, t)?;
    let scalar = (v * v * t / (PI * r * d)).sqrt();
    let exp_arg = -(r * z - v * t).powi(2) / (4.0 * d * r * t);
    Ok(scalar * exp_arg.exp())
}

/// $A_3 = -\frac{1}{2}\left(1 + \frac{vz}{D} + \frac{v^2 t}{DR}\right) e^{vz/D}
/// \operatorname{erfc}\left(\frac{Rz + vt}{2\sqrt{DRt}}\right)$
pub fn a3(
    r: FloatValue,
    z: FloatValue,
    v: FloatValue,
    t: FloatValue,
    d: FloatValue,
    _l: FloatValue,
) -> CyderResult<FloatValue> {
    validate_terms(r, d, t)?;
    let scalar = -0.5 * (1.0 + v * z / d + v * v * t / (d * r));
    let exp_arg = v * z / d;
    let erfc_arg = (r * z + v * t) / (2.0 * (d * r * t).sqrt());
    Ok(scalar * exp_arg.exp() * erfc(erfc_arg))
}

/// $A_4 = \sqrt{\frac{4 v^2 t}{\pi R D}} \left(1 + \frac{v}{4D}\left(2L - z + \frac{vt}{R}\right)\right)
/// \exp\left(\frac{vL}{D} - \frac{R}{4Dt}\left(2L - z + \frac{vt}{R}\right)^2\right)$
pub fn a4(
    r: FloatValue,
    z: FloatValue,
    v: FloatValue,
    t: FloatValue,
    d: FloatValue,
    l: FloatValue,
) -> CyderResult<FloatValue> {
    validate_terms(r, d, t)?;
    let root_factor = (4.0 * v * v * t / (PI * r * d)).sqrt();
    let reflected = 2.0 * l - z + v * t / r;
    let sum_factor = 1.0 + (v / (4.0 * d)) * reflected;
    let exp_arg = v * l / d - (r / (4.0 * d * t)) * reflected.powi(2);
    Ok(root_factor * sum_factor * exp_arg.exp())
}

/// $A_5 = -\frac{v}{D}\left(2L - z + \frac{3vt}{2R} + \frac{v}{4D}\left(2L - z + \frac{vt}{R}\right)^2\right)
/// e^{vL/D} \operatorname{erfc}\left(\frac{R(2L - z) + vt}{2\sqrt{DRt}}\right)$
pub fn a5(
    r: FloatValue,
    z: FloatValue,
    v: FloatValue,
    t: FloatValue,
    d: FloatValue,
    l: FloatValue,
) -> CyderResult<FloatValue> {
    validate_terms(r, d, t)?;
    let reflected = 2.0 * l - z + v * t / r;
    let sum_factor = 2.0 * l - z + 3.0 * v * t / (2.0 * r) + (v / (4.0 * d)) * reflected.powi(2);
    let scalar = -(v / d) * sum_factor;
    let exp_arg = v * l / d;
    let erfc_arg = (r * (2.0 * l - z) + v * t) / (2.0 * (d * r * t).sqrt());
    Ok(scalar * exp_arg.exp() * erfc(erfc_arg))
}

/// $A(z, t) = A_1 + A_2 + A_3 + A_4 + A_5$, compensated
pub fn azt(
    r: FloatValue,
    z: FloatValue,
    v: FloatValue,
    t: FloatValue,
    d: FloatValue,
    l: FloatValue,
) -> CyderResult<FloatValue> {
    let terms = [
        a1(r, z, v, t, d, l)?,
        a2(r, z, v, t, d, l)?,
        a3(r, z, v, t, d, l)?,
        a4(r, z, v, t, d, l)?,
        a5(r, z, v, t, d, l)?,
    ];
    let sum = kahan_sum(&terms);
    if !sum.is_finite() {
        return Err(range_error(format!(
            "The analytic response is not finite for R={}, z={}, v={}, t={}, D={}, L={}.",
            r, z, v, t, d, l
        )));
    }
    Ok(sum)
}

/// Trapezoidal rule over `n` intervals of `[a, b]`
///
/// `samples` holds the integrand at the `n + 1` evenly spaced points from `a`
/// to `b`, in order.
pub fn trap_rule(
    a: FloatValue,
    b: FloatValue,
    n: usize,
    samples: &[IsoConcMap],
) -> CyderResult<IsoConcMap> {
    if samples.len() != n + 1 || samples.len() < 2 {
        return Err(range_error(format!(
            "The trapezoidal rule over {} intervals needs {} samples, got {}.",
            n,
            n + 1,
            samples.len()
        )));
    }
    let h = (b - a) / n as FloatValue;
    let ends = add_conc_maps(&samples[0], &samples[n]);
    let mut integral = scale_conc_map(&ends, h / 2.0)?;
    for interior in &samples[1..n] {
        integral = add_conc_maps(&integral, &scale_conc_map(interior, h)?);
    }
    Ok(integral)
}

fn range_error(msg: String) -> CyderError {
    error!("{}", msg);
    CyderError::Range(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cyder_core::geometry::Point;
    use cyder_core::properties::{ElementProperties, MaterialTable};
    use cyder_core::types::{is_zero_map, CompMap};

    const U235: i32 = 92235;

    fn properties() -> Arc<dyn MaterialProperties> {
        Arc::new(
            MaterialTable::new()
                .with_element(
                    "granite",
                    92,
                    ElementProperties {
                        dispersion: 1e-9,
                        partition: 0.0,
                        solubility: 1.0,
                    },
                )
                .unwrap(),
        )
    }

    fn parameters(velocity: FloatValue) -> OneDimPPMNuclideParameters {
        OneDimPPMNuclideParameters {
            porosity: 0.3,
            bulk_density: 2600.0,
            advective_velocity: velocity,
            material: "granite".to_string(),
        }
    }

    fn model(velocity: FloatValue) -> OneDimPPMNuclide {
        let geometry = Geometry::new(1.0, 2.0, Point::default(), 1.0).unwrap();
        OneDimPPMNuclide::from_parameters(parameters(velocity), geometry, properties()).unwrap()
    }

    fn daughter(concentration: FloatValue) -> DaughterBoundary {
        DaughterBoundary {
            source_term: MassSnapshot::new(CompMap::from([(U235, 1.0)]), 10.0),
            dirichlet: IsoConcMap::from([(U235, concentration)]),
            free_fluid_volume: 0.5,
        }
    }

    #[test]
    fn first_term_at_zero_argument() {
        assert_relative_eq!(a1(1.0, 1.0, 1.0, 1.0, 1.0, 1.0).unwrap(), 0.5);
    }

    #[test]
    fn terms_validate_their_domain() {
        assert!(matches!(
            a1(0.0, 1.0, 1.0, 1.0, 1.0, 1.0),
            Err(CyderError::Range(_))
        ));
        assert!(matches!(
            a3(1.0, 1.0, 1.0, 1.0, -1.0, 1.0),
            Err(CyderError::Range(_))
        ));
        assert!(matches!(
            azt(1.0, 1.0, 1.0, 0.0, 1.0, 1.0),
            Err(CyderError::Range(_))
        ));
        assert!(azt(1.0, 0.5, 1e-9, 1e6, 1e-9, 1.0).unwrap().is_finite());
    }

    #[test]
    fn overflowing_response_is_a_range_error() {
        // vL/D = 1000 overflows exp in A5 while its erfc underflows
        assert!(matches!(
            azt(1.0, 0.5, 1e-6, SECONDS_PER_MONTH, 1e-9, 1.0),
            Err(CyderError::Range(_))
        ));
        let c_0 = IsoConcMap::from([(U235, 1.0)]);
        assert!(matches!(
            model(1e-6).calculate_conc_diff(&c_0, &IsoConcMap::new(), 0.5, SECONDS_PER_MONTH),
            Err(CyderError::Range(_))
        ));
    }

    #[test]
    fn no_advection_no_response() {
        // A1 and A3 cancel, the remaining terms scale with v
        assert_eq!(azt(1.0, 0.3, 0.0, 10.0, 1.0, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn trapezoid_of_a_constant_is_exact() {
        let (a, b, k) = (0.0, 4.0, 2.5);
        for n in [1, 3, 7] {
            let samples = vec![IsoConcMap::from([(U235, k)]); n + 1];
            let integral = trap_rule(a, b, n, &samples).unwrap();
            assert_relative_eq!(integral[&U235], k * (b - a), epsilon = 1e-12);
        }
    }

    #[test]
    fn trapezoid_of_a_square() {
        let n = 5;
        let samples: Vec<IsoConcMap> = linspace(1.0, 3.0, n + 1)
            .into_iter()
            .map(|r| IsoConcMap::from([(U235, r * r)]))
            .collect();
        let integral = trap_rule(1.0, 3.0, n, &samples).unwrap();
        assert_relative_eq!(integral[&U235], 8.72, epsilon = 1e-12);
    }

    #[test]
    fn trapezoid_needs_matching_samples() {
        let samples = vec![IsoConcMap::new(); 3];
        assert!(matches!(
            trap_rule(0.0, 1.0, 5, &samples),
            Err(CyderError::Range(_))
        ));
        assert!(trap_rule(0.0, 1.0, 0, &samples[..1]).is_err());
    }

    #[test]
    fn retardation_without_sorption_is_one() {
        assert_eq!(model(1e-9).retardation(U235).unwrap(), 1.0);
    }

    #[test]
    fn concentration_rises_towards_the_inlet_value() {
        let model = model(1e-9);
        let t = SECONDS_PER_MONTH;
        let near = model.calculate_conc(1.0, 0.0, 0.0, U235, t).unwrap();
        let far = model.calculate_conc(1.0, 0.0, 1.0, U235, t).unwrap();
        assert!(near > far);
        assert!(near.is_finite() && far >= 0.0);

        let diff = model
            .calculate_conc_diff(
                &IsoConcMap::from([(U235, 1.0)]),
                &IsoConcMap::from([(U235, 5.0)]),
                0.0,
                t,
            )
            .unwrap();
        assert_eq!(diff[&U235], 0.0);
    }

    #[test]
    fn couples_to_a_daughter() {
        let model = model(1e-9);
        let uptake = model.update_inner_bc(1, &[daughter(1.0)]).unwrap();
        assert_eq!(uptake.len(), 1);
        assert!(uptake[0].mass() > 0.0);
        assert!(uptake[0].mass().is_finite());
        assert_eq!(uptake[0].composition().keys().collect::<Vec<_>>(), vec![&U235]);
    }

    #[test]
    fn no_coupling_without_elapsed_time_or_source() {
        let mut model = model(1e-9);
        let uptake = model.update_inner_bc(0, &[daughter(1.0)]).unwrap();
        assert!(uptake[0].is_empty());

        model.transport(2).unwrap();
        let uptake = model.update_inner_bc(2, &[daughter(1.0)]).unwrap();
        assert!(uptake[0].is_empty());

        let silent = DaughterBoundary {
            dirichlet: IsoConcMap::new(),
            ..daughter(0.0)
        };
        let uptake = model
            .update_inner_bc(3, &[daughter(1.0), silent])
            .unwrap();
        assert!(!uptake[0].is_empty());
        assert!(uptake[1].is_empty());
    }

    #[test]
    fn coupling_needs_a_shell() {
        let geometry = Geometry::new(1.0, 1.0, Point::default(), 1.0).unwrap();
        let model =
            OneDimPPMNuclide::from_parameters(parameters(1e-9), geometry, properties()).unwrap();
        assert!(matches!(
            model.update_inner_bc(1, &[daughter(1.0)]),
            Err(CyderError::Range(_))
        ));
    }

    #[test]
    fn empty_model_has_zero_boundary_conditions() {
        let mut model = model(1e-9);
        model.transport(1).unwrap();
        let c_ext = IsoConcMap::from([(U235, 1.0)]);
        assert!(is_zero_map(&model.dirichlet(1).unwrap()));
        assert!(is_zero_map(&model.neumann(&c_ext, 3.0, 1).unwrap()));
        assert!(is_zero_map(&model.cauchy(&c_ext, 3.0, 1).unwrap()));
        assert_eq!(model.source_term().unwrap().mass, 0.0);
    }

    #[test]
    fn invalid_parameters_are_range_errors() {
        let geometry = Geometry::new(1.0, 2.0, Point::default(), 1.0).unwrap();
        let mut params = parameters(1e-9);
        params.porosity = -0.1;
        assert!(matches!(
            OneDimPPMNuclide::from_parameters(params, geometry.clone(), properties()),
            Err(CyderError::Range(_))
        ));
        let mut params = parameters(1e-9);
        params.bulk_density = FloatValue::INFINITY;
        assert!(matches!(
            OneDimPPMNuclide::from_parameters(params, geometry, properties()),
            Err(CyderError::Range(_))
        ));
    }
}

//! Nuclide transport models for the components of a generic repository
//!
//! Each model implements [`cyder_core::nuclide_model::NuclideModel`] and is
//! built from a type tag and a table of parameters by [`build_nuclide_model`].
//!
//! # Models
//!
//! - `DegRateNuclide`: congruent release with barrier degradation
//! - `MixedCellNuclide`: degraded volume mixed into a single concentration,
//!   optionally sorption- and solubility-limited
//! - `OneDimPPMNuclide`: analytic 1-D advection-dispersion through a porous medium
//! - `LumpedNuclide`: lumped-parameter (DM, EM, PFM) response
//! - `TwoDimPPMNuclide`: retarded well-mixed pore fluid
//! - `StubNuclide`: holds material and releases nothing

pub mod components;
mod degradation;
pub mod factory;

pub use degradation::Degradation;
pub use factory::build_nuclide_model;

//! Core types, traits and mass-balance math for nuclide transport through
//! the engineered barriers of a generic geologic repository.
//!
//! Concrete nuclide models live in `cyder-components`; this crate holds the
//! contracts they implement and the component arena that couples them.
pub mod component;
pub mod errors;
pub mod geometry;
pub mod history;
pub mod mat_tools;
pub mod material;
pub mod nuclide_model;
pub mod properties;
pub mod sol_lim;
pub mod types;

//! A generic geologic repository.
//!
//! The repository accepts batches of waste, conditions them into waste forms,
//! loads those into waste packages and emplaces full packages in buffers
//! inside the far field. Every step it then transports nuclides outward
//! through that containment hierarchy.
//!
//! Component behaviour lives in the workspace crates:
//!
//! * `cyder-core` holds the component arena, the nuclide model contract and
//!   the mass-balance helpers
//! * `cyder-components` holds the concrete nuclide models
//!
//! ```no_run
//! use std::sync::Arc;
//! use cyder::config::RepositoryConfig;
//! use cyder::repository::Repository;
//! use cyder_core::properties::MaterialTable;
//!
//! let config = RepositoryConfig::from_toml_str(&std::fs::read_to_string("repository.toml")?)?;
//! let mut repository = Repository::from_config(config, Arc::new(MaterialTable::new()))?;
//! for time in 0..12 {
//!     repository.handle_tick(time)?;
//!     repository.handle_tock(time)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod config;
pub mod repository;

pub use cyder_core::errors::{CyderError, CyderResult};
pub use repository::{Repository, Request, WasteStream};

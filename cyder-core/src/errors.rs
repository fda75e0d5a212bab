use crate::types::{FloatValue, Iso, Time};
use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CyderError {
    /// A parameter or computed value lies outside its physical domain
    #[error("{0}")]
    Range(String),
    #[error("Time {requested} is earlier than the last recorded time {last}")]
    Ordering { requested: Time, last: Time },
    #[error("Cannot extract {requested} kg of isotope {iso}. Only {available} kg is contained")]
    InsufficientMass {
        iso: Iso,
        requested: FloatValue,
        available: FloatValue,
    },
    /// Missing template mappings, unknown type names and malformed input
    #[error("{0}")]
    Configuration(String),
}

impl From<toml::de::Error> for CyderError {
    fn from(value: toml::de::Error) -> Self {
        CyderError::Configuration(format!("Invalid configuration: {}", value))
    }
}

/// Convenience type for `Result<T, CyderError>`.
pub type CyderResult<T> = Result<T, CyderError>;

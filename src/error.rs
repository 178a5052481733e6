//! Error types for the simulation core and settings layer
//!
//! Every failure here is local and recoverable: the engine keeps ticking.

use thiserror::Error;

/// Errors raised by simulation operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("cannot normalize a zero-length vector")]
    ZeroLengthVector,

    #[error("timestep must be positive and finite, got {0}")]
    NonPositiveTimestep(f32),

    #[error("query over an empty collection: {0}")]
    EmptyCollection(&'static str),

    #[error("no inert cell available to re-enrich after {attempts} attempts")]
    NoInertCell { attempts: u32 },

    #[error("lattice site ({x}, {y}) is already occupied")]
    SiteOccupied { x: i32, y: i32 },
}

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

pub type SimResult<T> = Result<T, SimError>;

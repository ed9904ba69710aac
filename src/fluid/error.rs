//! Error types for the fluid simulation.

use thiserror::Error;

/// Result type alias for fluid simulation operations.
pub type Result<T> = std::result::Result<T, FluidError>;

/// Rejected inputs. The simulation never fails mid-step; these are raised when
/// an entity or parameter set is refused at the API boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    /// Particle or body mass must be finite and strictly positive.
    #[error("mass must be finite and positive, got {0}")]
    NonPositiveMass(f32),

    /// Rest density must be finite and non-negative.
    #[error("rest density must be finite and non-negative, got {0}")]
    NegativeRestDensity(f32),

    /// A position or velocity contained NaN or infinity.
    #[error("{0} is not finite")]
    NonFinite(&'static str),

    /// Body dimensions (radius or box size) must be strictly positive.
    #[error("invalid body shape: {0}")]
    InvalidShape(String),

    /// Bounding planes are inverted or degenerate.
    #[error("inverted bounds on the {axis} axis: min {min} >= max {max}")]
    InvertedBounds {
        axis: &'static str,
        min: f32,
        max: f32,
    },

    /// Time step must be finite and strictly positive.
    #[error("time step must be finite and positive, got {0}")]
    InvalidTimeStep(f32),

    /// A simulation parameter is out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParam {
        name: &'static str,
        reason: String,
    },

    /// Parameter file could not be parsed or written.
    #[error("config error: {0}")]
    Config(String),
}

impl FluidError {
    pub(crate) fn param(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name,
            reason: reason.into(),
        }
    }
}

//! Error type for wheel interaction setup and configuration.
//!
//! Runtime ticks never fail; only construction and config loading do.

use crate::world::BodyId;

/// Errors that can occur while building a wheel controller or loading its config.
#[derive(Debug)]
pub enum InteractionError {
    /// The wheel's rigid body is not present in the physics world
    MissingWheelBody(BodyId),
    /// The wheel body has no spherical collider to derive a radius from
    MissingRadius(BodyId),
    /// File system error while reading a config file
    Io(std::io::Error),
    /// JSON parse error
    Json(String),
    /// A config value that cannot be clamped into something usable
    InvalidConfig(String),
}

impl std::fmt::Display for InteractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionError::MissingWheelBody(body) => {
                write!(f, "Wheel body {:?} not found", body)
            }
            InteractionError::MissingRadius(body) => {
                write!(f, "Wheel body {:?} has no spherical collider", body)
            }
            InteractionError::Io(e) => write!(f, "IO error: {}", e),
            InteractionError::Json(e) => write!(f, "JSON error: {}", e),
            InteractionError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for InteractionError {}

impl From<std::io::Error> for InteractionError {
    fn from(e: std::io::Error) -> Self {
        InteractionError::Io(e)
    }
}

impl From<serde_json::Error> for InteractionError {
    fn from(e: serde_json::Error) -> Self {
        InteractionError::Json(e.to_string())
    }
}

/// Result type for interaction setup.
pub type InteractionResult<T> = Result<T, InteractionError>;

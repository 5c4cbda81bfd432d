//! Error types for the noisemap API layer.
//!
//! The propagation core itself is total and never fails; errors exist only
//! at the API boundary, where scenes and configurations arrive from
//! outside.

use thiserror::Error;

/// Error type for noisemap operations.
#[derive(Debug, Error)]
pub enum NoisemapError {
    /// The scene contains no sources, so there is nothing to compute.
    #[error("scene has no sources")]
    EmptySources,

    /// An obstacle cannot be turned into tracer surfaces.
    #[error("obstacle {index} is degenerate: {reason}")]
    DegenerateObstacle {
        /// Index of the obstacle in the scene list.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A scene or configuration document failed to deserialize.
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result alias used throughout the noisemap crate.
pub type Result<T> = std::result::Result<T, NoisemapError>;

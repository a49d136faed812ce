use crate::Position;
use thiserror::Error;

/// Errors raised while validating a [SimulationConfig](crate::SimulationConfig).
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The grid cannot hold a corridor.
    #[error("grid of {width}x{height} is too small (minimum is 3x1)")]
    GridTooSmall { width: i32, height: i32 },
    /// The grid has more cells than can be allocated.
    #[error("grid of {width}x{height} is too large (at most {} cells)", crate::grid::MAX_CELLS)]
    GridTooLarge { width: i32, height: i32 },
    /// A signal set was placed on an edge column or outside the grid.
    #[error("light column {column} is outside the interior of the grid")]
    LightOutOfBounds { column: i32 },
    /// Two signal sets were placed on the same column.
    #[error("light column {column} is listed more than once")]
    DuplicateLightColumn { column: i32 },
    /// The per-tick spawn probability is not a probability.
    #[error("invalid spawn probability: {0}")]
    InvalidSpawnProbability(f64),
    /// A light phase duration was zero.
    #[error("invalid light timing (min green {min_green_time}, max green {max_green_time})")]
    InvalidLightTiming {
        min_green_time: u32,
        max_green_time: u32,
    },
    /// Lights with a zero detection radius can never sense demand.
    #[error("detection radius must be at least 1")]
    ZeroDetectionRadius,
}

/// Errors raised by [GridWorld](crate::GridWorld) queries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("position ({}, {}) is out of bounds", .0.x, .0.y)]
    OutOfBounds(Position),
    #[error("grid of {width}x{height} has too many cells")]
    TooLarge { width: i32, height: i32 },
}

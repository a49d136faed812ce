use crate::error::ConfigError;
use crate::grid::MAX_CELLS;
use crate::personality::Personality;
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The smallest grid that can hold a corridor.
pub const MIN_WIDTH: i32 = 3;
pub const MIN_HEIGHT: i32 = 1;

/// Everything needed to construct a [Simulation](crate::Simulation).
///
/// Two simulations built from equal configs evolve identically.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// The number of columns; vehicles travel along this axis.
    pub width: i32,
    /// The number of rows, each of which is a spawn lane in both directions.
    pub height: i32,
    /// The number of vehicles placed in each direction at construction.
    pub vehicles_per_direction: usize,
    /// The chance, per direction and per tick, of spawning another vehicle.
    pub spawn_probability: f64,
    /// How personalities are assigned to vehicles.
    pub personality: PersonalityMode,
    /// The columns holding a signal set, one light per row.
    /// `None` places a single set in the middle column.
    pub light_columns: Option<Vec<i32>>,
    /// The light timing constants.
    pub timing: LightTiming,
    /// How the lights are controlled.
    pub signal_mode: SignalMode,
    /// The seed of the simulation's random stream.
    pub seed: u64,
}

/// Timing constants shared by all lights, in ticks and cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LightTiming {
    /// The minimum number of ticks a light stays red while there is demand.
    pub min_green_time: u32,
    /// The maximum number of ticks a light stays green.
    pub max_green_time: u32,
    /// The Chebyshev distance within which a light senses vehicles.
    pub detection_radius: u32,
}

/// How personalities are assigned to vehicles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PersonalityMode {
    /// Every vehicle has the same personality.
    Fixed(Personality),
    /// Each vehicle draws a personality uniformly at random.
    #[default]
    Random,
}

/// How the lights are controlled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SignalMode {
    /// Lights respond to sensed demand.
    #[default]
    Adaptive,
    /// Lights are held green; useful as a baseline.
    AlwaysGreen,
}

impl Default for LightTiming {
    fn default() -> Self {
        Self {
            min_green_time: 3,
            max_green_time: 6,
            detection_radius: 3,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 15,
            height: 5,
            vehicles_per_direction: 3,
            spawn_probability: 0.0,
            personality: PersonalityMode::Random,
            light_columns: None,
            timing: LightTiming::default(),
            signal_mode: SignalMode::Adaptive,
            seed: 0,
        }
    }
}

impl SimulationConfig {
    /// The columns that hold a signal set.
    pub fn light_columns(&self) -> Vec<i32> {
        self.light_columns
            .clone()
            .unwrap_or_else(|| vec![self.width / 2])
    }

    /// The number of vehicles placed per direction at construction,
    /// clamped to the number of spawn lanes.
    pub fn initial_vehicles(&self) -> usize {
        usize::min(self.vehicles_per_direction, self.height.max(0) as usize)
    }

    /// Checks that a simulation can be built from this config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < MIN_WIDTH || self.height < MIN_HEIGHT {
            return Err(ConfigError::GridTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        let cells = (self.width as usize).checked_mul(self.height as usize);
        if cells.map_or(true, |cells| cells > MAX_CELLS) {
            return Err(ConfigError::GridTooLarge {
                width: self.width,
                height: self.height,
            });
        }
        let columns = self.light_columns();
        if let Some(&column) = columns
            .iter()
            .find(|col| !(1..self.width - 1).contains(*col))
        {
            return Err(ConfigError::LightOutOfBounds { column });
        }
        if let Some(column) = columns.iter().duplicates().next() {
            return Err(ConfigError::DuplicateLightColumn { column: *column });
        }
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(ConfigError::InvalidSpawnProbability(self.spawn_probability));
        }
        let timing = self.timing;
        if timing.min_green_time == 0 || timing.max_green_time == 0 {
            return Err(ConfigError::InvalidLightTiming {
                min_green_time: timing.min_green_time,
                max_green_time: timing.max_green_time,
            });
        }
        if timing.detection_radius == 0 {
            return Err(ConfigError::ZeroDetectionRadius);
        }
        Ok(())
    }
}

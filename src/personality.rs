//! Driver personalities and emotional states.

use crate::negotiation::Strategy;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The patience of a driver before personality adjustment, in ticks.
pub const BASE_PATIENCE: u32 = 10;

/// The bounds within which patience may drift.
pub const PATIENCE_RANGE: (u32, u32) = (2, 20);

/// The unit steps of the 4-neighbourhood, as `(dx, dy)`.
pub(crate) const NORTH: (i32, i32) = (0, 1);
pub(crate) const EAST: (i32, i32) = (1, 0);
pub(crate) const SOUTH: (i32, i32) = (0, -1);
pub(crate) const WEST: (i32, i32) = (-1, 0);

/// A 2x2 table of `(self, other)` payoffs, indexed by `[my strategy][other strategy]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayoffMatrix([[(i32, i32); 2]; 2]);

impl PayoffMatrix {
    /// Looks up the payoffs for a pair of strategies.
    pub fn get(&self, mine: Strategy, other: Strategy) -> (i32, i32) {
        self.0[mine.index()][other.index()]
    }
}

/// An immutable behavioural profile assigned to a vehicle at spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Personality {
    Cooperative,
    Aggressive,
    Cautious,
    Opportunistic,
    Reckless,
}

impl Personality {
    /// All personalities, in declaration order.
    pub const ALL: [Personality; 5] = [
        Personality::Cooperative,
        Personality::Aggressive,
        Personality::Cautious,
        Personality::Opportunistic,
        Personality::Reckless,
    ];

    /// The lower-case name of the personality.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cooperative => "cooperative",
            Self::Aggressive => "aggressive",
            Self::Cautious => "cautious",
            Self::Opportunistic => "opportunistic",
            Self::Reckless => "reckless",
        }
    }

    /// The display colour of a vehicle in its normal state.
    pub fn color(self) -> &'static str {
        match self {
            Self::Cooperative => "#0000FF",
            Self::Aggressive => "#FF0000",
            Self::Cautious => "#008000",
            Self::Opportunistic => "#800080",
            Self::Reckless => "#FFA500",
        }
    }

    /// The payoff matrix used when this personality negotiates.
    pub fn payoffs(self) -> PayoffMatrix {
        PayoffMatrix(match self {
            Self::Cooperative => [[(8, 8), (3, 7)], [(6, 2), (-4, -4)]],
            Self::Aggressive => [[(2, 2), (-3, 8)], [(10, -2), (-6, -6)]],
            Self::Cautious => [[(6, 6), (4, 5)], [(1, 3), (-10, -10)]],
            Self::Opportunistic => [[(4, 4), (-1, 6)], [(8, 0), (-5, -5)]],
            Self::Reckless => [[(1, 1), (-4, 9)], [(12, -3), (-2, -2)]],
        })
    }

    /// The base `(yield, push_through)` probabilities before emotional adjustment.
    pub fn strategy_weights(self) -> (f64, f64) {
        match self {
            Self::Cooperative => (0.7, 0.3),
            Self::Aggressive => (0.2, 0.8),
            Self::Cautious => (0.8, 0.2),
            Self::Opportunistic => (0.5, 0.5),
            Self::Reckless => (0.1, 0.9),
        }
    }

    /// The signed adjustment applied to [BASE_PATIENCE].
    pub fn patience_adjust(self) -> i32 {
        match self {
            Self::Cooperative => 3,
            Self::Aggressive => -4,
            Self::Cautious => 5,
            Self::Opportunistic => 0,
            Self::Reckless => -6,
        }
    }

    /// The patience a freshly spawned vehicle starts with.
    pub fn baseline_patience(self) -> u32 {
        let patience = BASE_PATIENCE as i32 + self.patience_adjust();
        (patience.max(0) as u32).clamp(PATIENCE_RANGE.0, PATIENCE_RANGE.1)
    }

    /// The order in which path finding expands neighbouring cells.
    /// Aggressive drivers favour the x axis, cautious drivers the y axis.
    pub fn neighbour_order(self) -> [(i32, i32); 4] {
        match self {
            Self::Aggressive => [EAST, WEST, NORTH, SOUTH],
            Self::Cautious => [NORTH, SOUTH, EAST, WEST],
            Self::Cooperative | Self::Opportunistic | Self::Reckless => [NORTH, EAST, SOUTH, WEST],
        }
    }

    /// The probability of running a yellow light at the given stress,
    /// or `None` if this personality always stops on yellow.
    pub fn yellow_run_probability(self, stress: f64) -> Option<f64> {
        match self {
            Self::Reckless => Some(f64::min(stress / 100.0 + 0.3, 0.8)),
            Self::Aggressive => Some(f64::min(stress / 100.0 + 0.2, 0.6)),
            _ => None,
        }
    }

    /// The multiplier applied to stress accumulated from waiting.
    pub fn stress_gain(self) -> f64 {
        match self {
            Self::Aggressive => 2.0,
            _ => 1.0,
        }
    }
}

/// The emotional state of a driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EmotionalState {
    #[default]
    Normal,
    Happy,
    Angry,
    Impatient,
}

impl EmotionalState {
    /// Chooses the state implied by the given levels, highest priority first.
    pub fn classify(happiness: f64, stress: f64, waiting_time: u32, patience: u32) -> Self {
        if happiness > 80.0 && stress < 30.0 {
            Self::Happy
        } else if happiness < 30.0 || stress > 70.0 {
            Self::Angry
        } else if waiting_time > patience {
            Self::Impatient
        } else {
            Self::Normal
        }
    }

    /// The learning rate a driver adopts on entering this state.
    pub fn learning_rate(self) -> f64 {
        match self {
            Self::Angry => 0.2,
            Self::Happy => 0.05,
            Self::Normal | Self::Impatient => 0.1,
        }
    }

    /// The risk threshold a driver adopts on entering this state.
    pub fn risk_threshold(self) -> f64 {
        match self {
            Self::Angry => 0.7,
            Self::Happy => 0.3,
            Self::Normal | Self::Impatient => 0.5,
        }
    }

    /// The display colour of a vehicle in this state.
    pub fn color(self, personality: Personality) -> &'static str {
        match self {
            Self::Normal => personality.color(),
            Self::Happy => "#FFD700",
            Self::Angry => "#8B0000",
            Self::Impatient => "#FF8C00",
        }
    }

    /// The change in patience on entering this state.
    pub fn patience_shift(self) -> i32 {
        match self {
            Self::Angry => -1,
            Self::Happy => 1,
            Self::Normal | Self::Impatient => 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn state_priority() {
        // Happy wins over impatience
        assert_eq!(EmotionalState::classify(90.0, 10.0, 50, 5), EmotionalState::Happy);
        // Angry wins over impatience
        assert_eq!(EmotionalState::classify(20.0, 10.0, 50, 5), EmotionalState::Angry);
        assert_eq!(EmotionalState::classify(50.0, 75.0, 0, 5), EmotionalState::Angry);
        assert_eq!(EmotionalState::classify(50.0, 10.0, 6, 5), EmotionalState::Impatient);
        assert_eq!(EmotionalState::classify(50.0, 10.0, 5, 5), EmotionalState::Normal);
    }

    #[test]
    fn patience_within_bounds() {
        for personality in Personality::ALL {
            let patience = personality.baseline_patience();
            assert!((PATIENCE_RANGE.0..=PATIENCE_RANGE.1).contains(&patience));
        }
        assert_eq!(Personality::Reckless.baseline_patience(), 4);
        assert_eq!(Personality::Cautious.baseline_patience(), 15);
    }

    #[test]
    fn yellow_running_is_capped() {
        assert_eq!(Personality::Reckless.yellow_run_probability(100.0), Some(0.8));
        assert_eq!(Personality::Aggressive.yellow_run_probability(100.0), Some(0.6));
        assert_eq!(Personality::Cautious.yellow_run_probability(100.0), None);
    }

    #[test]
    fn strategy_weights_are_distributions() {
        for personality in Personality::ALL {
            let (y, p) = personality.strategy_weights();
            assert!((y + p - 1.0).abs() < 1e-9);
        }
    }
}

//! The game played by two vehicles contending for the same cell.
//!
//! Each participant samples a strategy from its personality's base
//! probabilities, shifted by its emotional state and stress. The acting
//! vehicle then scores the pair of strategies against its own payoff
//! matrix and is granted passage iff its scaled payoff is positive.

use crate::personality::{EmotionalState, Personality};
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The shift towards pushing through applied to impatient drivers.
const IMPATIENCE_SHIFT: f64 = 0.2;

/// The largest shift towards pushing through caused by stress.
const MAX_STRESS_SHIFT: f64 = 0.3;

/// The weight given to past negotiation success when scaling payoffs.
const SUCCESS_WEIGHT: f64 = 0.2;

/// A move in the negotiation game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Strategy {
    Yield,
    PushThrough,
}

impl Strategy {
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Yield => 0,
            Self::PushThrough => 1,
        }
    }
}

/// The parts of a vehicle's state that bear on a negotiation.
#[derive(Clone, Copy, Debug)]
pub struct Participant {
    pub personality: Personality,
    pub state: EmotionalState,
    /// Stress in [0, 100].
    pub stress: f64,
}

/// The result of one negotiation, seen from the acting vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NegotiationOutcome {
    pub my_strategy: Strategy,
    pub other_strategy: Strategy,
    /// The acting vehicle's scaled payoff.
    pub payoff: f64,
}

impl NegotiationOutcome {
    /// Whether the acting vehicle won passage.
    pub fn granted(&self) -> bool {
        self.payoff > 0.0
    }
}

/// Computes the renormalised probability that a participant pushes through,
/// or `None` if its state forces it to push.
pub fn push_probability(participant: &Participant) -> Option<f64> {
    if participant.state == EmotionalState::Angry {
        return None;
    }

    let (mut give, mut push) = participant.personality.strategy_weights();
    if participant.state == EmotionalState::Impatient {
        give -= IMPATIENCE_SHIFT;
        push += IMPATIENCE_SHIFT;
    }
    let stress_shift = participant.stress.clamp(0.0, 100.0) / 100.0 * MAX_STRESS_SHIFT;
    give -= stress_shift;
    push += stress_shift;

    let (give, push) = (give.max(0.0), push.max(0.0));
    Some(push / (give + push))
}

/// Samples a participant's strategy with a single draw from `rng`.
/// Angry drivers push through without drawing.
pub fn choose_strategy<R: Rng + ?Sized>(participant: &Participant, rng: &mut R) -> Strategy {
    match push_probability(participant) {
        None => Strategy::PushThrough,
        Some(p) if rng.gen_bool(p.clamp(0.0, 1.0)) => Strategy::PushThrough,
        Some(_) => Strategy::Yield,
    }
}

/// Scores a pair of strategies for the acting participant.
///
/// `success_rate` is the fraction of the participant's past negotiations
/// that were granted.
pub fn payoff(
    personality: Personality,
    state: EmotionalState,
    success_rate: f64,
    mine: Strategy,
    other: Strategy,
) -> f64 {
    let (base, _) = personality.payoffs().get(mine, other);
    let emotion = match (state, mine) {
        (EmotionalState::Angry, Strategy::PushThrough) => 1.5,
        (EmotionalState::Angry, Strategy::Yield) => 0.5,
        (EmotionalState::Happy, Strategy::PushThrough) => 0.8,
        (EmotionalState::Happy, Strategy::Yield) => 1.2,
        _ => 1.0,
    };
    base as f64 * emotion * (1.0 + SUCCESS_WEIGHT * success_rate)
}

/// Plays one round of the game. Strategies are drawn for the acting
/// participant first, then for the other.
pub fn negotiate<R: Rng + ?Sized>(
    me: &Participant,
    other: &Participant,
    success_rate: f64,
    rng: &mut R,
) -> NegotiationOutcome {
    let my_strategy = choose_strategy(me, rng);
    let other_strategy = choose_strategy(other, rng);
    NegotiationOutcome {
        my_strategy,
        other_strategy,
        payoff: payoff(me.personality, me.state, success_rate, my_strategy, other_strategy),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;

    fn participant(personality: Personality, state: EmotionalState, stress: f64) -> Participant {
        Participant {
            personality,
            state,
            stress,
        }
    }

    #[test]
    fn cooperative_mutual_yield() {
        let matrix = Personality::Cooperative.payoffs();
        assert_eq!(matrix.get(Strategy::Yield, Strategy::Yield), (8, 8));

        let value = payoff(
            Personality::Cooperative,
            EmotionalState::Normal,
            0.0,
            Strategy::Yield,
            Strategy::Yield,
        );
        assert_approx_eq!(value, 8.0);
        assert!(value > 0.0);
    }

    #[test]
    fn emotional_scaling() {
        let angry_push = payoff(
            Personality::Aggressive,
            EmotionalState::Angry,
            0.0,
            Strategy::PushThrough,
            Strategy::Yield,
        );
        assert_approx_eq!(angry_push, 15.0);

        let happy_yield = payoff(
            Personality::Cautious,
            EmotionalState::Happy,
            0.0,
            Strategy::Yield,
            Strategy::PushThrough,
        );
        assert_approx_eq!(happy_yield, 4.8);

        let experienced = payoff(
            Personality::Cooperative,
            EmotionalState::Normal,
            0.5,
            Strategy::PushThrough,
            Strategy::Yield,
        );
        assert_approx_eq!(experienced, 6.6);
    }

    #[test]
    fn mutual_push_is_denied() {
        for personality in Personality::ALL {
            let value = payoff(
                personality,
                EmotionalState::Normal,
                1.0,
                Strategy::PushThrough,
                Strategy::PushThrough,
            );
            assert!(value < 0.0, "{personality:?}");
        }
    }

    #[test]
    fn push_probability_shifts() {
        let calm = participant(Personality::Cooperative, EmotionalState::Normal, 0.0);
        assert_approx_eq!(push_probability(&calm).unwrap(), 0.3);

        let impatient = participant(Personality::Cooperative, EmotionalState::Impatient, 0.0);
        assert_approx_eq!(push_probability(&impatient).unwrap(), 0.5);

        let stressed = participant(Personality::Cooperative, EmotionalState::Impatient, 100.0);
        assert_approx_eq!(push_probability(&stressed).unwrap(), 0.8);

        // Yield mass cannot go negative
        let reckless = participant(Personality::Reckless, EmotionalState::Impatient, 100.0);
        assert_approx_eq!(push_probability(&reckless).unwrap(), 1.0);

        let angry = participant(Personality::Cautious, EmotionalState::Angry, 0.0);
        assert_eq!(push_probability(&angry), None);
    }

    #[test]
    fn angry_drivers_always_push() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let angry = participant(Personality::Cautious, EmotionalState::Angry, 0.0);
        for _ in 0..100 {
            assert_eq!(choose_strategy(&angry, &mut rng), Strategy::PushThrough);
        }
    }

    #[test]
    fn sampling_is_reproducible() {
        let me = participant(Personality::Opportunistic, EmotionalState::Normal, 40.0);
        let other = participant(Personality::Cooperative, EmotionalState::Impatient, 10.0);
        let run = |seed| {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            (0..50)
                .map(|_| negotiate(&me, &other, 0.25, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }
}

pub use self::memory::{Memory, TripRecord};
use crate::negotiation::{self, NegotiationOutcome, Participant};
use crate::personality::{EmotionalState, Personality, PATIENCE_RANGE};
use crate::{GridWorld, Position, TrafficLightId, VehicleId};
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

mod memory;
pub mod pathfinding;

/// How far ahead along its heading a vehicle looks for lights, in cells.
const LIGHT_LOOKAHEAD: i32 = 3;

/// Initial happiness of a new vehicle.
const INITIAL_HAPPINESS: f64 = 50.0;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    pub(crate) id: VehicleId,
    /// The immutable behavioural profile.
    personality: Personality,
    /// The cell the vehicle spawned on.
    origin: Position,
    /// The cell the vehicle occupies. Mirrors the grid.
    pos: Position,
    /// The cell the vehicle wants to reach.
    destination: Position,
    /// The primary direction of travel.
    heading: Heading,
    /// The planned route, starting with the current cell.
    path: VecDeque<Position>,
    /// Whether the route must be replanned at the next opportunity.
    replan: bool,
    /// The emotional state.
    state: EmotionalState,
    /// Happiness in [0, 100].
    happiness: f64,
    /// Stress in [0, 100].
    stress: f64,
    /// The number of ticks the vehicle tolerates waiting before it becomes impatient.
    patience: u32,
    /// The number of ticks since the vehicle last moved.
    waiting_time: u32,
    /// Derived from the emotional state.
    learning_rate: f64,
    /// Derived from the emotional state.
    risk_threshold: f64,
    /// The display colour.
    color: &'static str,
    /// Negotiation history and trip log.
    memory: Memory,
    /// The cells occupied so far, starting with the origin.
    route: Vec<Position>,
    /// The last light noticed ahead, and the straight-line ETA reported to it.
    target_light: Option<(TrafficLightId, u32)>,
    /// The number of cells moved so far.
    hops: u32,
}

/// The direction a vehicle travels in along its primary axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    /// Gets the heading from `src` to `dst` along the axis with the larger displacement.
    pub fn between(src: Position, dst: Position) -> Self {
        let (dx, dy) = (dst.x - src.x, dst.y - src.y);
        if dx.abs() >= dy.abs() {
            if dx >= 0 {
                Self::East
            } else {
                Self::West
            }
        } else if dy > 0 {
            Self::North
        } else {
            Self::South
        }
    }

    /// The unit step in this direction.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }
}

/// A reason a vehicle failed to move this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Setback {
    /// No route to the destination exists.
    NoPath,
    /// A red or yellow light.
    Light,
    /// A lost negotiation.
    Denied,
    /// The next cell was still occupied when the move was committed.
    Contention,
}

impl Vehicle {
    /// Creates a new vehicle. It must then be placed on the grid.
    pub(crate) fn new(
        id: VehicleId,
        personality: Personality,
        origin: Position,
        destination: Position,
    ) -> Self {
        let state = EmotionalState::Normal;
        Self {
            id,
            personality,
            origin,
            pos: origin,
            destination,
            heading: Heading::between(origin, destination),
            path: VecDeque::new(),
            replan: false,
            state,
            happiness: INITIAL_HAPPINESS,
            stress: 0.0,
            patience: personality.baseline_patience(),
            waiting_time: 0,
            learning_rate: state.learning_rate(),
            risk_threshold: state.risk_threshold(),
            color: state.color(personality),
            memory: Memory::default(),
            route: vec![origin],
            target_light: None,
            hops: 0,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The behavioural profile assigned at spawn.
    pub fn personality(&self) -> Personality {
        self.personality
    }

    /// The cell the vehicle spawned on.
    pub fn origin(&self) -> Position {
        self.origin
    }

    /// The cell the vehicle occupies.
    pub fn pos(&self) -> Position {
        self.pos
    }

    /// The cell the vehicle wants to reach.
    pub fn destination(&self) -> Position {
        self.destination
    }

    /// The primary direction of travel.
    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// The planned route, starting with the current cell.
    /// Empty while no route exists.
    pub fn path(&self) -> impl Iterator<Item = Position> + '_ {
        self.path.iter().copied()
    }

    /// The current emotional state.
    pub fn state(&self) -> EmotionalState {
        self.state
    }

    /// Happiness in [0, 100].
    pub fn happiness(&self) -> f64 {
        self.happiness
    }

    /// Stress in [0, 100].
    pub fn stress(&self) -> f64 {
        self.stress
    }

    /// The number of ticks the vehicle tolerates waiting before it becomes impatient.
    pub fn patience(&self) -> u32 {
        self.patience
    }

    /// The number of ticks since the vehicle last moved.
    pub fn waiting_time(&self) -> u32 {
        self.waiting_time
    }

    /// The learning rate of the current emotional state.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// The risk threshold of the current emotional state.
    pub fn risk_threshold(&self) -> f64 {
        self.risk_threshold
    }

    /// The display colour, which reflects the emotional state.
    pub fn color(&self) -> &'static str {
        self.color
    }

    /// Negotiation history and trip log.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// The number of cells moved so far.
    pub fn hops(&self) -> u32 {
        self.hops
    }

    /// The cells occupied so far, starting with the origin.
    pub fn route(&self) -> &[Position] {
        &self.route
    }

    /// The number of hops along the planned route until `pos` is reached,
    /// or `None` if `pos` is not on the route.
    pub fn eta_to(&self, pos: Position) -> Option<u32> {
        self.path.iter().position(|p| *p == pos).map(|idx| idx as u32)
    }

    /// The next cell on the planned route.
    pub fn next_step(&self) -> Option<Position> {
        self.path.get(1).copied()
    }

    /// The parts of the vehicle's state an opponent in a negotiation sees.
    pub fn participant(&self) -> Participant {
        Participant {
            personality: self.personality,
            state: self.state,
            stress: self.stress,
        }
    }

    /// Accumulates stress from waiting, lets some of it decay,
    /// then moves to the emotional state implied by the new levels.
    pub(crate) fn update_emotions(&mut self) {
        let gain = self.waiting_time as f64 * self.personality.stress_gain();
        self.stress = f64::min(self.stress + gain, 100.0);
        let decay = match self.state {
            EmotionalState::Happy => 2.0,
            _ => 1.0,
        };
        self.stress = f64::max(self.stress - decay, 0.0);

        let next = EmotionalState::classify(
            self.happiness,
            self.stress,
            self.waiting_time,
            self.patience,
        );
        self.enter_state(next);
    }

    /// Changes the emotional state, refreshing the parameters derived from it.
    fn enter_state(&mut self, state: EmotionalState) {
        if state == self.state {
            return;
        }
        log::trace!("vehicle {:?}: {:?} -> {:?}", self.id, self.state, state);
        self.state = state;
        self.learning_rate = state.learning_rate();
        self.risk_threshold = state.risk_threshold();
        self.color = state.color(self.personality);
        let patience = self.patience as i32 + state.patience_shift();
        self.patience = (patience.max(0) as u32).clamp(PATIENCE_RANGE.0, PATIENCE_RANGE.1);
    }

    /// Looks along the heading for a light not yet reported to.
    /// Returns the light and the straight-line ETA to report.
    pub(crate) fn notice_light(&mut self, grid: &GridWorld) -> Option<(TrafficLightId, u32)> {
        let (dx, dy) = self.heading.delta();
        let (light_id, eta) = (1..=LIGHT_LOOKAHEAD)
            .map(|i| (self.pos.offset(dx * i, dy * i), i as u32))
            .take_while(|(pos, _)| grid.in_bounds(*pos))
            .find_map(|(pos, eta)| grid.light_at(pos).map(|id| (id, eta)))?;

        match self.target_light {
            Some((known, _)) if known == light_id => None,
            _ => {
                self.target_light = Some((light_id, eta));
                Some((light_id, eta))
            }
        }
    }

    /// Whether the planned route can still be followed.
    ///
    /// A next step held by another vehicle invalidates the route, unless
    /// that step is the destination, which is negotiated for instead.
    fn path_is_valid(&self, grid: &GridWorld) -> bool {
        if self.replan || self.path.front() != Some(&self.pos) {
            return false;
        }
        match self.path.get(1) {
            Some(next) => {
                grid.in_bounds(*next)
                    && next.is_adjacent(self.pos)
                    && (*next == self.destination
                        || grid.vehicle_at(*next).map_or(true, |other| other == self.id))
            }
            None => false,
        }
    }

    /// Replans the route if it is missing, stale, blocked or flagged for
    /// replanning. Returns `false` if there is no way to the destination.
    pub(crate) fn ensure_path(&mut self, grid: &GridWorld) -> bool {
        if !self.path_is_valid(grid) {
            self.replan = false;
            self.path = pathfinding::find_path(
                grid,
                self.id,
                self.personality,
                self.pos,
                self.destination,
            )
            .map(VecDeque::from)
            .unwrap_or_default();
        }
        self.path.len() >= 2
    }

    /// Decides whether to run a yellow light.
    pub(crate) fn runs_yellow<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.personality
            .yellow_run_probability(self.stress)
            .map_or(false, |p| rng.gen_bool(p.clamp(0.0, 1.0)))
    }

    /// Negotiates for the next cell with its occupant, and remembers the outcome.
    pub(crate) fn negotiate<R: Rng + ?Sized>(
        &mut self,
        other: &Participant,
        rng: &mut R,
    ) -> NegotiationOutcome {
        let outcome =
            negotiation::negotiate(&self.participant(), other, self.memory.success_rate(), rng);
        self.memory.record_negotiation(&outcome);
        self.happiness = (self.happiness + outcome.payoff).clamp(0.0, 100.0);
        outcome
    }

    /// Applies the penalty for failing to move.
    pub(crate) fn suffer(&mut self, setback: Setback) {
        self.waiting_time += 1;
        let (happiness, stress) = match setback {
            Setback::NoPath => (5.0, 3.0),
            Setback::Light | Setback::Denied => (5.0, self.personality.stress_gain()),
            Setback::Contention => (3.0, 2.0),
        };
        self.happiness = f64::max(self.happiness - happiness, 0.0);
        self.stress = f64::min(self.stress + stress, 100.0);

        if setback == Setback::Contention && self.waiting_time > 2 * self.patience {
            self.replan = true;
        }
    }

    /// Records a committed move onto the next cell of the route.
    pub(crate) fn advance(&mut self, next: Position) {
        let (dx, dy) = (next.x - self.pos.x, next.y - self.pos.y);
        let bonus = if (dx, dy) == self.heading.delta() {
            2.0
        } else {
            0.0
        };

        self.pos = next;
        self.path.pop_front();
        self.route.push(next);
        self.hops += 1;
        self.waiting_time = 0;
        self.happiness = f64::min(self.happiness + 5.0 + bonus, 100.0);
        self.stress = f64::max(self.stress - 1.0, 0.0);
    }

    /// Records being moved onto `pos` to make way for a vehicle that won a
    /// negotiation. The route is replanned at the next opportunity.
    pub(crate) fn displace(&mut self, pos: Position) {
        self.pos = pos;
        self.path.clear();
        self.route.push(pos);
        self.hops += 1;
    }

    /// Whether the vehicle has reached its destination.
    pub fn has_arrived(&self) -> bool {
        self.pos == self.destination
    }

    /// Grants the arrival bonus and logs the trip.
    pub(crate) fn arrive(&mut self, tick: usize) -> TripRecord {
        self.happiness = f64::min(self.happiness + 20.0, 100.0);
        self.stress = f64::max(self.stress - 10.0, 0.0);
        self.enter_state(EmotionalState::Happy);

        let trip = TripRecord {
            vehicle: self.id,
            personality: self.personality,
            origin: self.origin,
            destination: self.destination,
            route: self.route.clone(),
            hops: self.hops,
            arrival_tick: tick,
            final_stress: self.stress,
        };
        self.memory.record_trip(trip.clone());
        trip
    }
}

use crate::config::LightTiming;
use crate::{GridWorld, Position, TrafficLightId, VehicleId, VehicleSet};
use itertools::iproduct;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use slotmap::SparseSecondaryMap;

/// An adaptive traffic light guarding a single cell.
///
/// The light senses vehicles within its detection radius every tick and
/// cycles yellow → green → red → yellow. Yellow doubles as the "no demand"
/// state, which the light falls back to whenever nothing is detected.
#[derive(Clone, Debug)]
pub struct TrafficLight {
    /// The light's ID.
    id: TrafficLightId,
    /// The cell the light guards.
    pos: Position,
    /// The current state.
    state: LightState,
    /// The number of ticks spent in the current state.
    timer: u32,
    /// The timing constants.
    timing: LightTiming,
    /// A state the light is held in regardless of demand.
    pinned: Option<LightState>,
    /// The ETA of each vehicle known to be approaching this tick,
    /// where `None` means the light is not on the vehicle's path.
    approaching_cars: SparseSecondaryMap<VehicleId, Option<u32>>,
    /// ETAs reported by vehicles since the light last sensed.
    registrations: SparseSecondaryMap<VehicleId, u32>,
}

/// The state of a traffic light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LightState {
    Red,
    Yellow,
    Green,
}

impl LightState {
    /// The display colour of the light.
    pub fn color(self) -> &'static str {
        match self {
            Self::Red => "#FF0000",
            Self::Yellow => "#FFFF00",
            Self::Green => "#00FF00",
        }
    }
}

/// What a light sensed during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Demand {
    /// Whether any vehicle is within the detection radius.
    pub detected: bool,
    /// The smallest finite ETA among known vehicles.
    pub min_eta: Option<u32>,
    /// Whether a detected vehicle is still rolling towards the light.
    pub approaching: bool,
}

impl TrafficLight {
    /// Creates a new light in the yellow state.
    pub(crate) fn new(id: TrafficLightId, pos: Position, timing: LightTiming) -> Self {
        Self {
            id,
            pos,
            state: LightState::Yellow,
            timer: 0,
            timing,
            pinned: None,
            approaching_cars: SparseSecondaryMap::new(),
            registrations: SparseSecondaryMap::new(),
        }
    }

    /// Holds the light in the given state from now on.
    pub(crate) fn pin(&mut self, state: LightState) {
        self.pinned = Some(state);
        self.state = state;
        self.timer = 0;
    }

    /// Gets the light's ID.
    pub fn id(&self) -> TrafficLightId {
        self.id
    }

    /// The cell the light guards.
    pub fn pos(&self) -> Position {
        self.pos
    }

    /// The current state.
    pub fn state(&self) -> LightState {
        self.state
    }

    /// The number of ticks spent in the current state.
    pub fn timer(&self) -> u32 {
        self.timer
    }

    /// The timing constants.
    pub fn timing(&self) -> LightTiming {
        self.timing
    }

    /// Iterates over the vehicles known to be approaching this tick and their ETAs.
    pub fn approaching_cars(&self) -> impl Iterator<Item = (VehicleId, Option<u32>)> + '_ {
        self.approaching_cars.iter().map(|(id, eta)| (id, *eta))
    }

    /// The number of vehicles known to be approaching this tick.
    pub fn approaching_count(&self) -> usize {
        self.approaching_cars.len()
    }

    /// Records a vehicle that has seen this light ahead of it, possibly
    /// from outside the detection radius. The report is merged into the
    /// approaching cars the next time the light senses its surroundings.
    pub fn register_approaching_car(&mut self, vehicle: VehicleId, eta: u32) {
        match self.registrations.get_mut(vehicle) {
            Some(known) => *known = u32::min(*known, eta),
            None => {
                self.registrations.insert(vehicle, eta);
            }
        }
    }

    /// Senses nearby vehicles and advances the light by one tick.
    pub(crate) fn step(&mut self, grid: &GridWorld, vehicles: &VehicleSet) {
        let demand = self.sense(grid, vehicles);
        self.update(demand);
    }

    /// Rebuilds the table of approaching cars from the vehicles within the
    /// detection radius and the reports received since the last tick.
    fn sense(&mut self, grid: &GridWorld, vehicles: &VehicleSet) -> Demand {
        self.approaching_cars.clear();
        let mut approaching = false;

        let r = self.timing.detection_radius as i32;
        let (x, y) = (self.pos.x, self.pos.y);
        for (x, y) in iproduct!(x - r..=x + r, y - r..=y + r) {
            let Some(vehicle_id) = grid.vehicle_at(Position::new(x, y)) else {
                continue;
            };
            let Some(vehicle) = vehicles.get(vehicle_id) else {
                continue;
            };
            let eta = vehicle.eta_to(self.pos);
            approaching |= eta.is_some() && vehicle.waiting_time() == 0;
            self.approaching_cars.insert(vehicle_id, eta);
        }

        // Reporting vehicles were moving when they noticed the light
        for (vehicle_id, eta) in self.registrations.drain() {
            approaching = true;
            match self.approaching_cars.get_mut(vehicle_id) {
                Some(Some(known)) => *known = u32::min(*known, eta),
                Some(known) => *known = Some(eta),
                None => {
                    self.approaching_cars.insert(vehicle_id, Some(eta));
                }
            }
        }

        Demand {
            detected: !self.approaching_cars.is_empty(),
            min_eta: self.approaching_cars.values().flatten().min().copied(),
            approaching,
        }
    }

    /// Advances the state machine by one tick given what was sensed.
    pub(crate) fn update(&mut self, demand: Demand) {
        use LightState::*;
        let timing = &self.timing;
        let next = match (self.pinned, self.state) {
            (Some(state), _) => state,
            (None, _) if !demand.detected => Yellow,
            (None, Yellow)
                if demand
                    .min_eta
                    .map_or(false, |eta| eta <= timing.detection_radius) =>
            {
                Green
            }
            (None, Green) if self.timer + 1 >= timing.max_green_time => Red,
            (None, Red) if self.timer + 1 >= timing.min_green_time && !demand.approaching => {
                Yellow
            }
            (None, state) => state,
        };

        if next != self.state {
            log::debug!("light at {:?}: {:?} -> {:?}", self.pos, self.state, next);
            #[cfg(feature = "debug")]
            crate::debug::debug_light(self.pos, self.state, next);
            self.state = next;
            self.timer = 0;
        } else {
            self.timer += 1;
        }
    }
}

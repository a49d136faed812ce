//! Read-only views of the simulation for metrics collectors and renderers.
//!
//! A snapshot describes a single tick. Accumulating snapshots over a run
//! is left to the consumer.

use crate::light::{LightState, TrafficLight};
use crate::personality::{EmotionalState, Personality};
use crate::vehicle::{Heading, TripRecord, Vehicle};
use crate::{Position, TrafficLightId, VehicleId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Aggregate metrics and per-agent state after one tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TickSnapshot {
    /// The tick the snapshot was taken after.
    pub tick: usize,
    /// The mean happiness of the active vehicles, or zero if there are none.
    pub average_happiness: f64,
    /// The mean stress of the active vehicles, or zero if there are none.
    pub average_stress: f64,
    /// The fraction of active vehicles that moved this tick, or zero if there are none.
    pub traffic_flow: f64,
    pub lights: Vec<LightSnapshot>,
    /// The active vehicles in creation order.
    pub vehicles: Vec<VehicleSnapshot>,
    /// The trips completed this tick.
    pub arrivals: Vec<TripRecord>,
}

/// The state of one vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub position: Position,
    pub destination: Position,
    pub state: EmotionalState,
    pub personality: Personality,
    pub happiness: f64,
    pub stress: f64,
    pub waiting_time: u32,
    pub heading: Heading,
    pub color: &'static str,
}

/// The state of one light.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LightSnapshot {
    pub id: TrafficLightId,
    pub position: Position,
    pub state: LightState,
    /// The number of ticks spent in the current state.
    pub timer: u32,
    /// The number of vehicles the light knows to be approaching.
    pub approaching: usize,
}

/// The shape drawn for an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Marker {
    /// A triangle pointing in the direction of travel.
    Arrow(Heading),
    Square,
}

/// Everything a renderer needs to draw an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Portrayal {
    pub position: Position,
    pub color: &'static str,
    pub marker: Marker,
    /// A relative size hint.
    pub size: u32,
}

impl TickSnapshot {
    pub(crate) fn capture<'a>(
        tick: usize,
        vehicles: impl Iterator<Item = &'a Vehicle>,
        lights: impl Iterator<Item = &'a TrafficLight>,
        arrivals: &[TripRecord],
    ) -> Self {
        let vehicles = vehicles.map(VehicleSnapshot::from).collect::<Vec<_>>();
        let lights = lights.map(LightSnapshot::from).collect();

        let count = vehicles.len() as f64;
        let mean = |f: fn(&VehicleSnapshot) -> f64| match vehicles.len() {
            0 => 0.0,
            _ => vehicles.iter().map(f).sum::<f64>() / count,
        };

        Self {
            tick,
            average_happiness: mean(|v| v.happiness),
            average_stress: mean(|v| v.stress),
            traffic_flow: mean(|v| if v.waiting_time == 0 { 1.0 } else { 0.0 }),
            lights,
            vehicles,
            arrivals: arrivals.to_vec(),
        }
    }
}

impl From<&Vehicle> for VehicleSnapshot {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id(),
            position: vehicle.pos(),
            destination: vehicle.destination(),
            state: vehicle.state(),
            personality: vehicle.personality(),
            happiness: vehicle.happiness(),
            stress: vehicle.stress(),
            waiting_time: vehicle.waiting_time(),
            heading: vehicle.heading(),
            color: vehicle.color(),
        }
    }
}

impl From<&TrafficLight> for LightSnapshot {
    fn from(light: &TrafficLight) -> Self {
        Self {
            id: light.id(),
            position: light.pos(),
            state: light.state(),
            timer: light.timer(),
            approaching: light.approaching_count(),
        }
    }
}

impl VehicleSnapshot {
    /// How the vehicle should be drawn. Waiting vehicles are drawn larger.
    pub fn portrayal(&self) -> Portrayal {
        Portrayal {
            position: self.position,
            color: self.color,
            marker: Marker::Arrow(self.heading),
            size: if self.waiting_time > 0 { 90 } else { 80 },
        }
    }
}

impl LightSnapshot {
    /// How the light should be drawn. Lights with traffic approaching are drawn larger.
    pub fn portrayal(&self) -> Portrayal {
        Portrayal {
            position: self.position,
            color: self.state.color(),
            marker: Marker::Square,
            size: if self.approaching > 0 { 120 } else { 100 },
        }
    }
}

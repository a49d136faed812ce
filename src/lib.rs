pub use config::{LightTiming, PersonalityMode, SignalMode, SimulationConfig};
pub use error::{ConfigError, GridError};
pub use grid::{GridWorld, Occupant, Position};
pub use light::{LightState, TrafficLight};
pub use negotiation::{NegotiationOutcome, Participant, Strategy};
pub use personality::{EmotionalState, PayoffMatrix, Personality};
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use telemetry::{LightSnapshot, Marker, Portrayal, TickSnapshot, VehicleSnapshot};
pub use vehicle::pathfinding::find_path;
pub use vehicle::{Heading, Memory, TripRecord, Vehicle};

mod config;
#[cfg(feature = "debug")]
mod debug;
mod error;
mod grid;
mod light;
pub mod negotiation;
mod personality;
mod simulation;
pub mod telemetry;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a [TrafficLight].
    pub struct TrafficLightId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;

use crate::negotiation::{NegotiationOutcome, Strategy};
use crate::personality::Personality;
use crate::{Position, VehicleId};
use arrayvec::ArrayVec;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The number of risky-move outcomes a driver remembers.
pub const RISK_MEMORY: usize = 10;

/// What a driver remembers of its past negotiations and trip.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// The number of negotiations that granted passage.
    successful: u32,
    /// The number of negotiations that denied passage.
    failed: u32,
    /// The outcomes of the most recent push-through attempts, oldest first.
    risky_moves: ArrayVec<bool, RISK_MEMORY>,
    /// The completed trip, once the destination is reached.
    trip: Option<TripRecord>,
}

/// A summary of a completed trip.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TripRecord {
    pub vehicle: VehicleId,
    pub personality: Personality,
    pub origin: Position,
    pub destination: Position,
    /// The cells occupied during the trip, from origin to destination.
    pub route: Vec<Position>,
    /// The number of cells moved, including detours.
    pub hops: u32,
    /// The tick on which the destination was reached.
    pub arrival_tick: usize,
    pub final_stress: f64,
}

impl Memory {
    /// The number of granted negotiations.
    pub fn successful(&self) -> u32 {
        self.successful
    }

    /// The number of denied negotiations.
    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// The fraction of negotiations that were granted, or zero if there were none.
    pub fn success_rate(&self) -> f64 {
        self.successful as f64 / u32::max(self.successful + self.failed, 1) as f64
    }

    /// The remembered push-through outcomes, oldest first.
    pub fn risky_moves(&self) -> &[bool] {
        &self.risky_moves
    }

    /// The completed trip, if any.
    pub fn trip(&self) -> Option<&TripRecord> {
        self.trip.as_ref()
    }

    /// Records the outcome of a negotiation.
    pub(crate) fn record_negotiation(&mut self, outcome: &NegotiationOutcome) {
        let granted = outcome.granted();
        if granted {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        if outcome.my_strategy == Strategy::PushThrough {
            self.record_risky_move(granted);
        }
    }

    fn record_risky_move(&mut self, granted: bool) {
        if self.risky_moves.is_full() {
            self.risky_moves.remove(0);
        }
        self.risky_moves.push(granted);
    }

    pub(crate) fn record_trip(&mut self, trip: TripRecord) {
        self.trip = Some(trip);
    }
}

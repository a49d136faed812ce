use crate::config::{PersonalityMode, SignalMode, SimulationConfig};
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::error::ConfigError;
use crate::grid::Occupant;
use crate::light::{LightState, TrafficLight};
use crate::personality::Personality;
use crate::telemetry::TickSnapshot;
use crate::vehicle::{Setback, TripRecord, Vehicle};
use crate::{GridWorld, Position, TrafficLightId, VehicleId, VehicleSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution};
use slotmap::SlotMap;

/// A traffic simulation of a signal-controlled corridor.
///
/// Agents are activated sequentially: each tick spawns new vehicles, then
/// updates every light in creation order, then every vehicle in creation
/// order. A vehicle sees the moves made by vehicles updated before it in
/// the same tick.
pub struct Simulation {
    /// The configuration the simulation was built from.
    config: SimulationConfig,
    /// The occupancy index.
    grid: GridWorld,
    /// The traffic lights.
    lights: SlotMap<TrafficLightId, TrafficLight>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The active vehicles in creation order.
    order: Vec<VehicleId>,
    /// The simulation's only source of randomness.
    rng: StdRng,
    /// Decides whether a vehicle spawns in each direction, if spawning is enabled.
    spawner: Option<Bernoulli>,
    /// The number of ticks simulated.
    tick: usize,
    /// The trips completed during the latest tick.
    arrivals: Vec<TripRecord>,
    /// Debugging information from the previously simulated tick.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Simulation {
    /// Creates a new simulation, placing its lights and initial vehicles.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let requested = config.vehicles_per_direction;
        if requested > config.initial_vehicles() {
            log::warn!(
                "{} vehicles per direction requested but only {} spawn lanes exist",
                requested,
                config.height
            );
        }

        let spawner = match config.spawn_probability {
            p if p > 0.0 => Some(
                Bernoulli::new(p).map_err(|_| ConfigError::InvalidSpawnProbability(p))?,
            ),
            _ => None,
        };

        let grid = GridWorld::new(config.width, config.height).map_err(|_| {
            ConfigError::GridTooLarge {
                width: config.width,
                height: config.height,
            }
        })?;

        let mut sim = Self {
            grid,
            lights: SlotMap::with_key(),
            vehicles: SlotMap::with_key(),
            order: vec![],
            rng: StdRng::seed_from_u64(config.seed),
            spawner,
            tick: 0,
            arrivals: vec![],
            #[cfg(feature = "debug")]
            debug: serde_json::Value::Null,
            config,
        };
        sim.add_lights()?;
        sim.add_initial_vehicles();
        Ok(sim)
    }

    /// Places a signal set, one light per row, on every configured column.
    fn add_lights(&mut self) -> Result<(), ConfigError> {
        for column in self.config.light_columns() {
            for row in 0..self.config.height {
                let pos = Position::new(column, row);
                let timing = self.config.timing;
                let id = self
                    .lights
                    .insert_with_key(|id| TrafficLight::new(id, pos, timing));
                let placed = self
                    .grid
                    .place(Occupant::Light(id), pos)
                    .map_err(|_| ConfigError::LightOutOfBounds { column })?;
                if !placed {
                    return Err(ConfigError::DuplicateLightColumn { column });
                }
                if self.config.signal_mode == SignalMode::AlwaysGreen {
                    self.lights[id].pin(LightState::Green);
                }
            }
        }
        Ok(())
    }

    /// Places the initial vehicles on randomly chosen rows, eastbound first.
    fn add_initial_vehicles(&mut self) {
        let count = self.config.initial_vehicles();
        let height = self.config.height as usize;
        let east = self.config.width - 1;
        for (src_x, dst_x) in [(0, east), (east, 0)] {
            let mut rows = rand::seq::index::sample(&mut self.rng, height, count).into_vec();
            rows.sort_unstable();
            for row in rows {
                let personality = self.draw_personality();
                let row = row as i32;
                self.add_vehicle(
                    personality,
                    Position::new(src_x, row),
                    Position::new(dst_x, row),
                );
            }
        }
    }

    /// Draws a personality according to the configured mode.
    fn draw_personality(&mut self) -> Personality {
        match self.config.personality {
            PersonalityMode::Fixed(personality) => personality,
            PersonalityMode::Random => {
                Personality::ALL[self.rng.gen_range(0..Personality::ALL.len())]
            }
        }
    }

    /// Adds a vehicle to the simulation.
    ///
    /// Returns `None` if either cell is off the grid, the cells coincide,
    /// or `origin` already holds a vehicle.
    pub fn add_vehicle(
        &mut self,
        personality: Personality,
        origin: Position,
        destination: Position,
    ) -> Option<VehicleId> {
        if !self.grid.in_bounds(destination) || origin == destination || !self.grid.is_free(origin)
        {
            return None;
        }
        let id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, personality, origin, destination));
        if !matches!(self.grid.place(Occupant::Vehicle(id), origin), Ok(true)) {
            self.vehicles.remove(id);
            return None;
        }
        self.order.push(id);
        Some(id)
    }

    /// Removes a vehicle from the simulation.
    pub fn remove_vehicle(&mut self, id: VehicleId) {
        if let Some(vehicle) = self.vehicles.remove(id) {
            self.grid.remove(Occupant::Vehicle(id), vehicle.pos());
            self.order.retain(|other| *other != id);
        }
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) {
        self.tick += 1;
        self.arrivals.clear();
        self.spawn_vehicles();
        self.update_lights();
        self.update_vehicles();

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }
    }

    /// Advances the simulation by `ticks` ticks.
    pub fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Gets the number of ticks simulated so far.
    pub fn tick(&self) -> usize {
        self.tick
    }

    /// Gets the configuration the simulation was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Gets the occupancy index.
    pub fn grid(&self) -> &GridWorld {
        &self.grid
    }

    /// Returns an iterator over the active vehicles in creation order.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.order.iter().map(|id| &self.vehicles[*id])
    }

    /// Returns an iterator over all the traffic lights in creation order.
    pub fn iter_lights(&self) -> impl Iterator<Item = (TrafficLightId, &TrafficLight)> {
        self.lights.iter()
    }

    /// Gets a reference to the vehicle with the given ID,
    /// if it is still active.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Gets a reference to the light with the given ID.
    pub fn get_light(&self, light_id: TrafficLightId) -> &TrafficLight {
        &self.lights[light_id]
    }

    /// The trips completed during the latest tick.
    pub fn arrivals(&self) -> &[TripRecord] {
        &self.arrivals
    }

    /// Captures the aggregate metrics and per-agent state after the latest tick.
    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot::capture(
            self.tick,
            self.iter_vehicles(),
            self.lights.values(),
            &self.arrivals,
        )
    }

    /// Gets the debugging information for the previously simulated tick as a JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        self.debug.clone()
    }

    /// Spawns at most one vehicle per direction on a random free entry cell.
    fn spawn_vehicles(&mut self) {
        let Some(spawner) = self.spawner else {
            return;
        };
        let east = self.config.width - 1;
        for (src_x, dst_x) in [(0, east), (east, 0)] {
            if !spawner.sample(&mut self.rng) {
                continue;
            }
            let row = self.rng.gen_range(0..self.config.height);
            let origin = Position::new(src_x, row);
            if self.grid.is_free(origin) {
                let personality = self.draw_personality();
                self.add_vehicle(personality, origin, Position::new(dst_x, row));
            }
        }
    }

    /// Updates the traffic lights.
    fn update_lights(&mut self) {
        for light in self.lights.values_mut() {
            light.step(&self.grid, &self.vehicles);
        }
    }

    /// Updates every vehicle in creation order, then drops those that arrived.
    fn update_vehicles(&mut self) {
        let order = std::mem::take(&mut self.order);
        for vehicle_id in &order {
            if let Some(trip) = self.update_vehicle(*vehicle_id) {
                self.arrivals.push(trip);
            }
        }
        self.order = order;
        self.order.retain(|id| self.vehicles.contains_key(*id));
    }

    /// Runs one vehicle's movement protocol.
    /// Returns the completed trip if the vehicle reached its destination.
    fn update_vehicle(&mut self, vehicle_id: VehicleId) -> Option<TripRecord> {
        let vehicle = self.vehicles.get_mut(vehicle_id)?;
        vehicle.update_emotions();

        if let Some((light_id, eta)) = vehicle.notice_light(&self.grid) {
            self.lights[light_id].register_approaching_car(vehicle_id, eta);
        }

        let vehicle = &mut self.vehicles[vehicle_id];
        if !vehicle.ensure_path(&self.grid) {
            log::trace!("vehicle {:?} has no path", vehicle_id);
            vehicle.suffer(Setback::NoPath);
            return None;
        }
        let from = vehicle.pos();
        let next = vehicle.next_step()?;

        // The light guarding the next cell
        if let Some(light_id) = self.grid.light_at(next) {
            let passes = match self.lights[light_id].state() {
                LightState::Green => true,
                LightState::Yellow => vehicle.runs_yellow(&mut self.rng),
                LightState::Red => false,
            };
            if !passes {
                log::trace!("vehicle {:?} stopped at light {:?}", vehicle_id, light_id);
                vehicle.suffer(Setback::Light);
                return None;
            }
        }

        // Contend with whoever is in the next cell
        let mut swapped = false;
        if let Some(other_id) = self.grid.vehicle_at(next) {
            if let Some(other) = self.vehicles.get(other_id).map(Vehicle::participant) {
                let vehicle = &mut self.vehicles[vehicle_id];
                let outcome = vehicle.negotiate(&other, &mut self.rng);
                log::debug!(
                    "vehicle {:?} vs {:?}: {:?}/{:?} payoff {:.2}",
                    vehicle_id,
                    other_id,
                    outcome.my_strategy,
                    outcome.other_strategy,
                    outcome.payoff
                );
                #[cfg(feature = "debug")]
                crate::debug::debug_negotiation(from, next, &outcome);
                if !outcome.granted() {
                    vehicle.suffer(Setback::Denied);
                    return None;
                }
                swapped = self.make_way(vehicle_id, from, other_id, next) == Some(from);
            }
        }

        let vehicle = &mut self.vehicles[vehicle_id];
        if !swapped && !self.grid.move_vehicle(vehicle_id, from, next) {
            vehicle.suffer(Setback::Contention);
            return None;
        }
        vehicle.advance(next);

        if vehicle.has_arrived() {
            let trip = vehicle.arrive(self.tick);
            log::debug!(
                "vehicle {:?} arrived at {:?} after {} hops",
                vehicle_id,
                trip.destination,
                trip.hops
            );
            self.grid.remove(Occupant::Vehicle(vehicle_id), next);
            self.vehicles.remove(vehicle_id);
            return Some(trip);
        }
        None
    }

    /// Clears `cell` for a vehicle at `from` that won a negotiation against
    /// the occupant. The occupant trades places with the winner if it was
    /// heading for `from`, otherwise it steps aside onto a free neighbouring
    /// cell without a light, and trades places if there is none.
    ///
    /// Returns the occupant's new cell, or `None` if it could not be moved.
    fn make_way(
        &mut self,
        winner: VehicleId,
        from: Position,
        occupant: VehicleId,
        cell: Position,
    ) -> Option<Position> {
        let vehicle = self.vehicles.get(occupant)?;
        let aside = match vehicle.next_step() {
            Some(next) if next == from => None,
            _ => vehicle
                .personality()
                .neighbour_order()
                .into_iter()
                .map(|(dx, dy)| cell.offset(dx, dy))
                .find(|pos| {
                    *pos != from && self.grid.is_free(*pos) && self.grid.light_at(*pos).is_none()
                }),
        };

        let target = match aside {
            Some(pos) if self.grid.move_vehicle(occupant, cell, pos) => pos,
            Some(_) => return None,
            None if self.grid.swap_vehicles(winner, from, occupant, cell) => from,
            None => return None,
        };
        log::debug!("vehicle {:?} made way onto {:?}", occupant, target);

        let vehicle = &mut self.vehicles[occupant];
        vehicle.displace(target);
        if vehicle.has_arrived() {
            let trip = vehicle.arrive(self.tick);
            self.grid.remove(Occupant::Vehicle(occupant), target);
            self.vehicles.remove(occupant);
            self.arrivals.push(trip);
        }
        Some(target)
    }
}

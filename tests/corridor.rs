//! Tests that run the whole corridor.

use assert_approx_eq::assert_approx_eq;
use signal_corridor::{
    ConfigError, LightState, LightTiming, Personality, PersonalityMode, Position, SignalMode,
    Simulation, SimulationConfig, TrafficLightId,
};
use std::collections::{HashMap, HashSet};

fn empty_corridor(signal_mode: SignalMode) -> Simulation {
    Simulation::new(SimulationConfig {
        vehicles_per_direction: 0,
        signal_mode,
        ..Default::default()
    })
    .unwrap()
}

/// Test that a lone vehicle drives straight through a green corridor.
#[test]
fn lone_vehicle_arrives() {
    let mut sim = empty_corridor(SignalMode::AlwaysGreen);
    let veh = sim
        .add_vehicle(
            Personality::Cooperative,
            Position::new(0, 2),
            Position::new(14, 2),
        )
        .unwrap();

    sim.step();
    let snapshot = sim.snapshot();
    assert_eq!(snapshot.tick, 1);
    assert_eq!(snapshot.traffic_flow, 1.0);
    assert_approx_eq!(snapshot.average_happiness, 57.0);
    assert_eq!(sim.get_vehicle(veh).unwrap().pos(), Position::new(1, 2));

    sim.run(12);
    assert_eq!(sim.get_vehicle(veh).unwrap().pos(), Position::new(13, 2));
    assert!(sim.arrivals().is_empty());

    sim.step();
    assert!(sim.get_vehicle(veh).is_none());
    assert_eq!(sim.grid().vehicles().count(), 0);
    let trip = sim.arrivals()[0].clone();
    assert_eq!(trip.vehicle, veh);
    assert_eq!(trip.arrival_tick, 14);
    assert_eq!(trip.hops, 14);
    let expected = (0..15).map(|x| Position::new(x, 2)).collect::<Vec<_>>();
    assert_eq!(trip.route, expected);

    // The trip is only reported for the tick it completed in
    sim.step();
    assert!(sim.arrivals().is_empty());
    assert_eq!(sim.snapshot().traffic_flow, 0.0);
    assert_eq!(sim.snapshot().average_happiness, 0.0);
}

/// Test that vehicles cannot be added on top of each other or off the grid.
#[test]
fn add_vehicle_rejects_bad_cells() {
    let mut sim = empty_corridor(SignalMode::Adaptive);
    let origin = Position::new(0, 1);
    let dest = Position::new(14, 1);
    assert!(sim
        .add_vehicle(Personality::Aggressive, origin, dest)
        .is_some());
    assert!(sim
        .add_vehicle(Personality::Cautious, origin, dest)
        .is_none());
    assert!(sim
        .add_vehicle(Personality::Cautious, Position::new(-1, 1), dest)
        .is_none());
    assert!(sim
        .add_vehicle(Personality::Cautious, Position::new(0, 3), Position::new(15, 3))
        .is_none());
    assert!(sim
        .add_vehicle(Personality::Cautious, dest, dest)
        .is_none());
    assert_eq!(sim.iter_vehicles().count(), 1);
}

/// Test that the agents stay within their bounds over long, busy runs.
#[test]
fn invariants_hold_every_tick() {
    for seed in 0..5 {
        let mut sim = Simulation::new(SimulationConfig {
            spawn_probability: 0.4,
            seed,
            ..Default::default()
        })
        .unwrap();
        for _ in 0..300 {
            sim.step();
            let snapshot = sim.snapshot();
            assert!((0.0..=1.0).contains(&snapshot.traffic_flow));
            assert!((0.0..=100.0).contains(&snapshot.average_happiness));
            assert!((0.0..=100.0).contains(&snapshot.average_stress));

            for vehicle in &snapshot.vehicles {
                assert!((0.0..=100.0).contains(&vehicle.happiness));
                assert!((0.0..=100.0).contains(&vehicle.stress));
                assert!(sim.grid().in_bounds(vehicle.position));
            }

            let cells = sim.grid().vehicles().map(|(pos, _)| pos).collect::<Vec<_>>();
            let unique = cells.iter().collect::<HashSet<_>>();
            assert_eq!(unique.len(), cells.len());
            assert_eq!(unique.len(), snapshot.vehicles.len());
            for (pos, id) in sim.grid().vehicles() {
                assert_eq!(sim.get_vehicle(id).map(|v| v.pos()), Some(pos));
            }
        }
    }
}

/// Test that equal configurations produce identical runs.
#[test]
fn runs_are_reproducible() {
    let config = SimulationConfig {
        spawn_probability: 0.3,
        seed: 1234,
        ..Default::default()
    };
    let mut a = Simulation::new(config.clone()).unwrap();
    let mut b = Simulation::new(config).unwrap();
    for _ in 0..200 {
        a.step();
        b.step();
        assert_eq!(a.snapshot(), b.snapshot());
    }
}

/// Test that a light never skips from red to green while driving real traffic.
#[test]
fn lights_cycle_safely() {
    let mut sim = Simulation::new(SimulationConfig {
        spawn_probability: 0.5,
        seed: 7,
        ..Default::default()
    })
    .unwrap();
    let mut prev: HashMap<TrafficLightId, LightState> = sim
        .iter_lights()
        .map(|(id, light)| (id, light.state()))
        .collect();
    assert_eq!(prev.len(), 5);
    assert!(prev.values().all(|state| *state == LightState::Yellow));

    let max_green = sim.config().timing.max_green_time;
    for _ in 0..500 {
        sim.step();
        for (id, light) in sim.iter_lights() {
            let before = prev[&id];
            assert!(!(before == LightState::Red && light.state() == LightState::Green));
            if light.state() == LightState::Green {
                assert!(light.timer() < max_green);
            }
            prev.insert(id, light.state());
        }
    }
}

/// Test that two vehicles meeting head on in a single lane stall next to
/// each other, with no route around and nothing to negotiate for.
#[test]
fn head_on_deadlock_is_tolerated() {
    let mut sim = Simulation::new(SimulationConfig {
        width: 15,
        height: 1,
        vehicles_per_direction: 1,
        personality: PersonalityMode::Fixed(Personality::Aggressive),
        signal_mode: SignalMode::AlwaysGreen,
        ..Default::default()
    })
    .unwrap();
    let ids = sim.iter_vehicles().map(|v| v.id()).collect::<Vec<_>>();
    assert_eq!(ids.len(), 2);

    sim.run(100);
    let east = sim.get_vehicle(ids[0]).unwrap();
    let west = sim.get_vehicle(ids[1]).unwrap();
    assert_eq!(east.pos(), Position::new(7, 0));
    assert_eq!(west.pos(), Position::new(8, 0));
    for vehicle in [east, west] {
        assert!(vehicle.waiting_time() > 90);
        assert_eq!(vehicle.path().count(), 0);
        assert_eq!(vehicle.memory().successful() + vehicle.memory().failed(), 0);
        assert_eq!(vehicle.stress(), 100.0);
        assert_eq!(vehicle.happiness(), 0.0);
    }
    assert_eq!(sim.snapshot().traffic_flow, 0.0);
}

/// Test that a vehicle steers around a stationary vehicle in its lane
/// instead of negotiating with it.
#[test]
fn vehicle_routes_around_blocker() {
    let mut sim = empty_corridor(SignalMode::AlwaysGreen);
    let mover = sim
        .add_vehicle(
            Personality::Cooperative,
            Position::new(0, 2),
            Position::new(14, 2),
        )
        .unwrap();
    let blocker = sim
        .add_vehicle(
            Personality::Cooperative,
            Position::new(1, 2),
            Position::new(1, 0),
        )
        .unwrap();
    let wall = sim
        .add_vehicle(
            Personality::Cooperative,
            Position::new(1, 1),
            Position::new(14, 1),
        )
        .unwrap();

    sim.step();
    let vehicle = sim.get_vehicle(mover).unwrap();
    assert_eq!(vehicle.pos(), Position::new(0, 3));
    assert_eq!(vehicle.hops(), 1);
    assert_eq!(vehicle.memory().successful() + vehicle.memory().failed(), 0);
    assert!(vehicle.path().all(|pos| pos != Position::new(1, 2)));
    assert_eq!(vehicle.path().count(), 17 - 1);
    assert!(sim.get_vehicle(blocker).is_some());
    assert!(sim.get_vehicle(wall).is_some());
}

/// Test that winning a negotiation for an occupied destination moves the
/// vehicle there, and losing it leaves the vehicle in place.
#[test]
fn granted_negotiation_moves_vehicle() {
    let mut granted = 0;
    for seed in 0..20 {
        let mut sim = Simulation::new(SimulationConfig {
            width: 15,
            height: 1,
            vehicles_per_direction: 0,
            signal_mode: SignalMode::AlwaysGreen,
            seed,
            ..Default::default()
        })
        .unwrap();
        let mover = sim
            .add_vehicle(
                Personality::Cautious,
                Position::new(12, 0),
                Position::new(13, 0),
            )
            .unwrap();
        let occupant = sim
            .add_vehicle(
                Personality::Cautious,
                Position::new(13, 0),
                Position::new(0, 0),
            )
            .unwrap();

        sim.step();
        match sim.get_vehicle(mover) {
            None => {
                granted += 1;
                let trip = &sim.arrivals()[0];
                assert_eq!(trip.vehicle, mover);
                assert_eq!(trip.route, vec![Position::new(12, 0), Position::new(13, 0)]);
                // The occupant stepped aside, then set off again in its own turn
                let other = sim.get_vehicle(occupant).unwrap();
                assert_eq!(other.hops(), 2);
                assert_eq!(other.pos(), Position::new(13, 0));
            }
            Some(vehicle) => {
                assert_eq!(vehicle.pos(), Position::new(12, 0));
                assert_eq!(vehicle.memory().failed(), 1);
                assert_eq!(vehicle.waiting_time(), 1);
                assert!(sim.arrivals().is_empty());
            }
        }
    }
    assert!(granted > 10, "only {granted} of 20 negotiations were granted");
}

/// Test that every negotiation a vehicle wins during busy runs ends with it
/// moving on.
#[test]
fn granted_vehicles_always_advance() {
    let mut grants = 0;
    for seed in 0..5 {
        let mut sim = Simulation::new(SimulationConfig {
            spawn_probability: 0.5,
            seed,
            ..Default::default()
        })
        .unwrap();
        for _ in 0..300 {
            let before = sim
                .iter_vehicles()
                .map(|v| (v.id(), (v.hops(), v.memory().successful())))
                .collect::<HashMap<_, _>>();
            sim.step();
            for (id, (hops, successful)) in before {
                let Some(vehicle) = sim.get_vehicle(id) else {
                    continue;
                };
                if vehicle.memory().successful() > successful {
                    grants += 1;
                    assert!(vehicle.hops() > hops);
                }
            }
        }
    }
    assert!(grants > 0);
}

/// Test that a vehicle's report reaches a light that cannot see it yet.
#[test]
fn registration_reaches_distant_light() {
    let mut sim = Simulation::new(SimulationConfig {
        width: 15,
        height: 1,
        vehicles_per_direction: 0,
        timing: LightTiming {
            detection_radius: 1,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();
    let veh = sim
        .add_vehicle(
            Personality::Cooperative,
            Position::new(0, 0),
            Position::new(14, 0),
        )
        .unwrap();
    let (light_id, _) = sim.iter_lights().next().unwrap();

    // The light at x = 7 comes into view from x = 4, during tick 5
    sim.run(5);
    assert_eq!(sim.get_vehicle(veh).unwrap().pos(), Position::new(5, 0));
    assert_eq!(sim.get_light(light_id).approaching_count(), 0);

    sim.step();
    let light = sim.get_light(light_id);
    assert_eq!(
        light.approaching_cars().collect::<Vec<_>>(),
        vec![(veh, Some(3))]
    );
    assert_eq!(light.state(), LightState::Yellow);

    // Once inside the radius the light turns green for it
    sim.step();
    assert_eq!(sim.get_light(light_id).state(), LightState::Green);
    assert_eq!(sim.get_vehicle(veh).unwrap().pos(), Position::new(7, 0));
}

/// Test that each personality mode assigns the expected profiles.
#[test]
fn personality_modes() {
    let fixed = Simulation::new(SimulationConfig {
        personality: PersonalityMode::Fixed(Personality::Reckless),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(fixed.iter_vehicles().count(), 6);
    assert!(fixed
        .iter_vehicles()
        .all(|v| v.personality() == Personality::Reckless));

    let eastbound = fixed.iter_vehicles().take(3).collect::<Vec<_>>();
    assert!(eastbound.iter().all(|v| v.pos().x == 0));
    assert!(eastbound.windows(2).all(|w| w[0].pos().y < w[1].pos().y));
    assert!(fixed.iter_vehicles().skip(3).all(|v| v.pos().x == 14));
    assert!(fixed
        .iter_vehicles()
        .all(|v| v.destination().y == v.pos().y));
}

/// Test that invalid configurations are rejected and oversized ones clamped.
#[test]
fn configuration_errors() {
    let err = Simulation::new(SimulationConfig {
        spawn_probability: 1.5,
        ..Default::default()
    })
    .err();
    assert_eq!(err, Some(ConfigError::InvalidSpawnProbability(1.5)));

    let err = Simulation::new(SimulationConfig {
        light_columns: Some(vec![0]),
        ..Default::default()
    })
    .err();
    assert_eq!(err, Some(ConfigError::LightOutOfBounds { column: 0 }));

    let err = Simulation::new(SimulationConfig {
        light_columns: Some(vec![7, 7]),
        ..Default::default()
    })
    .err();
    assert_eq!(err, Some(ConfigError::DuplicateLightColumn { column: 7 }));

    let err = Simulation::new(SimulationConfig {
        width: 100_000,
        height: 100_000,
        ..Default::default()
    })
    .err();
    assert_eq!(
        err,
        Some(ConfigError::GridTooLarge {
            width: 100_000,
            height: 100_000
        })
    );

    let sim = Simulation::new(SimulationConfig {
        height: 2,
        vehicles_per_direction: 10,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(sim.iter_vehicles().count(), 4);
}

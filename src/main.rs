use std::time::{Duration, Instant};

use signal_corridor::{Personality, PersonalityMode, Simulation, SimulationConfig};

const NUM_RUNS: u64 = 10;
const NUM_TICKS: usize = 200;

/// Per-run averages of the tick metrics.
struct RunMetrics {
    happiness: f64,
    stress: f64,
    flow: f64,
}

fn main() {
    let modes = std::iter::once(PersonalityMode::Random)
        .chain(Personality::ALL.into_iter().map(PersonalityMode::Fixed));

    for mode in modes {
        let mut runs = vec![];
        let mut elapsed = Duration::ZERO;
        for seed in 0..NUM_RUNS {
            let config = SimulationConfig {
                personality: mode,
                spawn_probability: 0.3,
                seed,
                ..Default::default()
            };
            let mut sim = match Simulation::new(config) {
                Ok(sim) => sim,
                Err(err) => {
                    eprintln!("Invalid configuration: {}", err);
                    std::process::exit(1);
                }
            };
            let start = Instant::now();
            runs.push(run(&mut sim));
            elapsed += start.elapsed();
        }

        let frame = elapsed / (NUM_RUNS as usize * NUM_TICKS) as u32;
        let (h, h_sd) = mean_std(runs.iter().map(|r| r.happiness));
        let (s, s_sd) = mean_std(runs.iter().map(|r| r.stress));
        let (f, f_sd) = mean_std(runs.iter().map(|r| r.flow));
        println!(
            "{:<14} happiness {:5.1} ± {:4.1}  stress {:5.1} ± {:4.1}  flow {:.2} ± {:.2}  (avg. tick: {:?})",
            match mode {
                PersonalityMode::Random => "random",
                PersonalityMode::Fixed(p) => p.name(),
            },
            h,
            h_sd,
            s,
            s_sd,
            f,
            f_sd,
            frame,
        );
    }
}

/// Steps a simulation to completion and averages its metrics over every tick.
fn run(sim: &mut Simulation) -> RunMetrics {
    let mut totals = RunMetrics {
        happiness: 0.0,
        stress: 0.0,
        flow: 0.0,
    };
    for _ in 0..NUM_TICKS {
        sim.step();
        let snapshot = sim.snapshot();
        totals.happiness += snapshot.average_happiness;
        totals.stress += snapshot.average_stress;
        totals.flow += snapshot.traffic_flow;
    }
    let n = NUM_TICKS as f64;
    RunMetrics {
        happiness: totals.happiness / n,
        stress: totals.stress / n,
        flow: totals.flow / n,
    }
}

fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count().max(1) as f64;
    let mean = values.clone().sum::<f64>() / n;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

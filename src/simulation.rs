//! Time-stepping driver for flow past a body.
//!
//! The simulation owns the particle ensemble and everything needed to move
//! it forward: the body, the open domain, the free stream and the sampling
//! grid.
//!
//! Each step:
//! 1. Injects free-stream particles from the reservoir around the box
//! 2. Flies the ensemble and reflects it off the body
//! 3. Drops particles that left the box
//! 4. Adds the ensemble to the time average once sampling has started
//!
//! Particle counts are tallied in [`Totals`] so that runs can be checked
//! for mass balance.

use std::ops::AddAssign;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::collision::{advance_with_bias, StepStats};
use crate::containment::inside;
use crate::domain::{Domain, Flow};
use crate::geom::Body;
use crate::output::{self, Summary};
use crate::particle::Particle;
use crate::sampling::{Accumulator, Grid, Macroscopic};
use crate::settings::{validate_config, Settings};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::geom::BodyConfig;
    use crate::settings::{DomainConfig, FlowConfig, SamplingConfig};

    fn settings(body: BodyConfig) -> Settings {
        Settings {
            dt: 1e-4,
            steps: 20,
            seed: Some(42),
            reflection_bias: 1e-9,
            domain: DomainConfig {
                min: [-0.5, -0.5, -0.5],
                max: [0.5, 0.5, 0.5],
            },
            flow: FlowConfig {
                concentration: 5e3,
                velocity: [500.0, 0.0, 0.0],
                temperature: 300.0,
                mass: 6.63e-26,
                statistical_weight: 1.0,
            },
            sampling: SamplingConfig {
                cells: [4, 4, 4],
                start: 10,
            },
            body,
            output_dir: "output".to_string(),
        }
    }

    fn ball() -> BodyConfig {
        BodyConfig::Sphere {
            center: [0.0; 3],
            radius: 0.2,
        }
    }

    #[test]
    fn initial_fill_avoids_the_body() {
        let sim = Simulation::new(settings(ball())).unwrap();
        assert!(!sim.particles.is_empty());
        assert!(sim
            .particles
            .iter()
            .all(|p| !inside(&sim.body, &p.position) && sim.domain.contains(&p.position)));
    }

    #[test]
    fn steps_keep_particles_in_the_gas() {
        let mut sim = Simulation::new(settings(ball())).unwrap();
        let initial = sim.particles.len();
        for _ in 0..5 {
            sim.step();
        }
        assert_eq!(sim.step_count, 5);
        assert!(sim.totals.reflected > 0);
        assert!(sim.totals.injected > 0);
        assert!(sim
            .particles
            .iter()
            .all(|p| !inside(&sim.body, &p.position) && sim.domain.contains(&p.position)));

        // mass balance
        let t = &sim.totals;
        assert_eq!(
            sim.particles.len() + t.clipped + t.escaped,
            initial + t.injected
        );
    }

    #[test]
    fn seeded_runs_repeat() {
        let mut a = Simulation::new(settings(ball())).unwrap();
        let mut b = Simulation::new(settings(ball())).unwrap();
        a.step();
        b.step();
        assert_eq!(a.particles.len(), b.particles.len());
        assert_eq!(a.particles, b.particles);
    }

    #[test]
    fn sampling_starts_on_schedule() {
        let mut sim = Simulation::new(settings(ball())).unwrap();
        sim.run();
        assert_eq!(sim.sampler.samples, 10);
        let fields = sim.macroscopic();
        assert!(fields.density.iter().any(|&n| n > 0.0));
        assert!(fields.temperature.iter().all(|&t| t >= 0.0));
    }

    #[test]
    fn reject_invalid_settings() {
        let mut bad = settings(ball());
        bad.dt = -1.0;
        assert!(Simulation::new(bad).is_err());

        let bad = settings(BodyConfig::Sphere {
            center: [0.0; 3],
            radius: 0.0,
        });
        assert!(Simulation::new(bad).is_err());
    }
}

/// Particle tallies over a whole run.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub injected: usize,  // reservoir particles that entered the box
    pub reflected: usize, // wall reflections
    pub clipped: usize,   // particles removed from inside the body
    pub escaped: usize,   // particles that left the box
}

impl AddAssign<StepStats> for Totals {
    fn add_assign(&mut self, stats: StepStats) {
        self.reflected += stats.reflected;
        self.clipped += stats.clipped;
    }
}

/// A collisionless rarefied flow past a single body.
#[derive(Debug)]
pub struct Simulation {
    pub settings: Settings,
    pub body: Arc<Body>,
    pub domain: Domain,
    pub flow: Flow,
    pub grid: Grid,
    pub particles: Vec<Particle>,
    pub sampler: Accumulator,
    pub totals: Totals,
    pub step_count: usize,
    pub elapsed: f64, // wall-clock seconds spent in `run`
    rng: StdRng,
}

impl Simulation {
    /// Sets up the run and fills the box with free-stream gas.
    ///
    /// Particles that land inside the body are removed straight away and are
    /// not counted as clipped.
    pub fn new(settings: Settings) -> Result<Self> {
        validate_config(&settings)?;

        let body = Arc::new(settings.body.build().context("invalid body description")?);
        let domain = Domain::from_config(&settings.domain)?;
        let flow = Flow::new(&settings.flow)?;
        let grid = Grid::new(domain.clone(), settings.sampling.cells)?;
        let sampler = Accumulator::new(grid.cells);

        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let particles: Vec<Particle> = domain
            .fill(&flow, &mut rng)
            .into_iter()
            .filter(|p| !inside(&body, &p.position))
            .collect();
        if particles.is_empty() {
            warn!("initial fill is empty; check flow concentration and statistical weight");
        } else {
            info!("initial fill: {} particles", particles.len());
        }

        Ok(Self {
            settings,
            body,
            domain,
            flow,
            grid,
            particles,
            sampler,
            totals: Totals::default(),
            step_count: 0,
            elapsed: 0.0,
            rng,
        })
    }

    /// Advances the simulation by one time step.
    ///
    /// Resident particles and fresh reservoir particles are resolved apart so
    /// that the box boundary can tell escapes from arrivals. Reservoir
    /// particles clipped inside the body did cross into the box, and count as
    /// both injected and clipped.
    pub fn step(&mut self) {
        let dt = self.settings.dt;
        let bias = self.settings.reflection_bias;

        let reservoir = self.domain.inject(&self.flow, dt, &mut self.rng);
        let (resident, resident_stats) = advance_with_bias(&self.particles, dt, &self.body, bias);
        let (arrivals, arrival_stats) = advance_with_bias(&reservoir, dt, &self.body, bias);

        let flown = resident.len();
        let mut particles = self.domain.clip(resident);
        let escaped = flown - particles.len();
        let arrivals = self.domain.clip(arrivals);
        let injected = arrivals.len() + arrival_stats.clipped;
        particles.extend(arrivals);

        debug!(
            "step {}: {} injected, {} escaped, {} reflected, {} particles",
            self.step_count,
            injected,
            escaped,
            resident_stats.reflected + arrival_stats.reflected,
            particles.len()
        );

        self.particles = particles;
        self.totals += resident_stats + arrival_stats;
        self.totals.injected += injected;
        self.totals.escaped += escaped;

        if self.step_count >= self.settings.sampling.start {
            self.sampler += self.grid.sample(&self.particles);
        }
        self.step_count += 1;
    }

    /// Runs the configured number of steps with a progress bar.
    pub fn run(&mut self) {
        let start = Instant::now();
        info!("running {} steps", self.settings.steps);

        let pb = ProgressBar::new(self.settings.steps as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
        ) {
            pb.set_style(style.progress_chars("█▇▆▅▄▃▂▁"));
        }

        for _ in 0..self.settings.steps {
            self.step();
            pb.set_message(format!("{} particles", self.particles.len()));
            pb.inc(1);
        }
        pb.finish_and_clear();

        let duration = start.elapsed();
        self.elapsed += duration.as_secs_f64();
        info!(
            "finished in {:.2?} with {} particles, {} reflections",
            duration,
            self.particles.len(),
            self.totals.reflected
        );
    }

    /// Time-averaged fields from all samples taken so far.
    pub fn macroscopic(&self) -> Macroscopic {
        self.sampler.average(&self.grid, &self.flow)
    }

    /// Writes the sampled fields and a run summary to the output directory.
    pub fn writeup(&self) -> Result<()> {
        let summary = Summary {
            timestamp: chrono::Local::now().to_rfc3339(),
            steps: self.step_count,
            particles: self.particles.len(),
            samples: self.sampler.samples,
            totals: self.totals,
            elapsed_seconds: self.elapsed,
            settings: &self.settings,
        };
        let directory = Path::new(&self.settings.output_dir);
        output::writeup(directory, &self.grid, &self.macroscopic(), &summary)?;
        info!("results written to {:?}", directory);
        Ok(())
    }
}

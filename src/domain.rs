//! The simulation box and the free stream feeding it.
//!
//! The domain is an axis-aligned box with open boundaries: particles that
//! leave it are discarded and fresh free-stream particles enter through
//! every face each step.
//!
//! The domain system provides:
//! - Axis-aligned box geometry (volume, membership, extrusion)
//! - Free-stream state with Maxwellian velocity sampling
//! - Initial uniform fill of the box
//! - Open-boundary injection from a reservoir shell around the box
//!
//! Random generators are always passed in by the caller, so a seeded run is
//! reproducible.

use anyhow::{anyhow, ensure, Result};
use nalgebra::{Point3, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use crate::particle::Particle;
use crate::settings::{DomainConfig, FlowConfig, BOLTZMANN, RESERVOIR_SIGMAS};

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn unit_box() -> Domain {
        Domain::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 0.5)).unwrap()
    }

    fn argon(velocity: [f64; 3]) -> Flow {
        Flow::new(&FlowConfig {
            concentration: 2e4,
            velocity,
            temperature: 300.0,
            mass: 6.63e-26,
            statistical_weight: 1.0,
        })
        .unwrap()
    }

    #[test]
    fn box_geometry() {
        let domain = unit_box();
        assert_relative_eq!(domain.volume(), 1.0);
        assert!(domain.contains(&Point3::new(0.5, 1.0, 0.25)));
        assert!(!domain.contains(&Point3::new(0.5, 2.5, 0.25)));

        let outer = domain.extrude(0.5);
        assert_eq!(outer.min, Point3::new(-0.5, -0.5, -0.5));
        assert_eq!(outer.max, Point3::new(1.5, 2.5, 1.0));
    }

    #[test]
    fn reject_inverted_box() {
        assert!(Domain::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, -1.0, 1.0)).is_err());
        let config = DomainConfig {
            min: [0.0; 3],
            max: [0.0, 1.0, 1.0],
        };
        assert!(Domain::from_config(&config).is_err());
    }

    #[test]
    fn reject_bad_flow() {
        let config = FlowConfig {
            concentration: 1.0,
            velocity: [0.0; 3],
            temperature: -1.0,
            mass: 1.0,
            statistical_weight: 1.0,
        };
        assert!(Flow::new(&config).is_err());
    }

    #[test]
    fn fill_count_and_bounds() {
        let domain = unit_box();
        let flow = argon([300.0, 0.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(1);
        let particles = domain.fill(&flow, &mut rng);
        assert_eq!(particles.len(), 20_000);
        assert!(particles.iter().all(|p| domain.contains(&p.position)));

        let mean_vx =
            particles.iter().map(|p| p.velocity.x).sum::<f64>() / particles.len() as f64;
        assert_relative_eq!(mean_vx, 300.0, max_relative = 0.05);
    }

    #[test]
    fn injected_particles_start_in_the_reservoir() {
        let domain = unit_box();
        let flow = argon([300.0, 0.0, 0.0]);
        let dt = 1e-4;
        let mut rng = StdRng::seed_from_u64(7);
        let reservoir = domain.extrude(flow.reservoir_width(dt));

        let injected = domain.inject(&flow, dt, &mut rng);
        assert!(!injected.is_empty());
        assert!(injected
            .iter()
            .all(|p| reservoir.contains(&p.position) && !domain.contains(&p.position)));
    }

    #[test]
    fn clip_drops_escapees() {
        let domain = unit_box();
        let particles = vec![
            Particle::new(Point3::new(0.5, 0.5, 0.1), Vector3::zeros()),
            Particle::new(Point3::new(1.5, 0.5, 0.1), Vector3::zeros()),
        ];
        let kept = domain.clip(particles.clone());
        assert_eq!(kept, vec![particles[0]]);
    }

    #[test]
    fn cold_flow_has_no_spread() {
        let flow = argon([1.0, 2.0, 3.0]);
        assert!(flow.thermal_speed() > 0.0);
        let still = Flow::new(&FlowConfig {
            concentration: 1.0,
            velocity: [1.0, 2.0, 3.0],
            temperature: 0.0,
            mass: 1.0,
            statistical_weight: 1.0,
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(still.sample_velocity(&mut rng), Vector3::new(1.0, 2.0, 3.0));
    }
}

/// Axis-aligned simulation box.
///
/// **Context**: The box bounds the region where particles are tracked and
/// sampled. Its faces are open: gas flows in and out freely.
///
/// **How it Works**: Stores minimum and maximum corners. Membership is
/// inclusive on every face.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Domain {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Result<Self> {
        ensure!(
            (0..3).all(|i| min[i] < max[i]),
            "domain minimum {:?} must be strictly below maximum {:?} on every axis",
            min,
            max
        );
        Ok(Self { min, max })
    }

    pub fn from_config(config: &DomainConfig) -> Result<Self> {
        Self::new(Point3::from(config.min), Point3::from(config.max))
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        self.size().product()
    }

    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// The box grown by `width` on every side.
    pub fn extrude(&self, width: f64) -> Domain {
        let grow = Vector3::repeat(width);
        Domain {
            min: self.min - grow,
            max: self.max + grow,
        }
    }

    /// Uniformly distributed point in the box.
    pub fn sample_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point3<f64> {
        Point3::from(Vector3::from_fn(|i, _| {
            rng.random_range(self.min[i]..=self.max[i])
        }))
    }

    /// Drops particles that left the box.
    pub fn clip(&self, particles: Vec<Particle>) -> Vec<Particle> {
        particles
            .into_par_iter()
            .filter(|p| self.contains(&p.position))
            .collect()
    }

    /// Fills the box with free-stream particles.
    pub fn fill<R: Rng + ?Sized>(&self, flow: &Flow, rng: &mut R) -> Vec<Particle> {
        let count = (flow.density() * self.volume()).round() as usize;
        (0..count)
            .map(|_| Particle::new(self.sample_point(rng), flow.sample_velocity(rng)))
            .collect()
    }

    /// Free-stream particles for one step of open-boundary inflow.
    ///
    /// **Context**: Gas enters the box through every face. Rather than
    /// sampling the inflow flux through each face, the box is wrapped in a
    /// reservoir of free-stream gas thick enough that no particle outside it
    /// can reach the box within `dt`.
    ///
    /// **How it Works**: Fills the shell between the box and its extrusion at
    /// free-stream density and returns those particles unflown. After the
    /// step's free flight the caller clips the ensemble to the box, so only
    /// reservoir particles that actually crossed into it remain.
    pub fn inject<R: Rng + ?Sized>(&self, flow: &Flow, dt: f64, rng: &mut R) -> Vec<Particle> {
        let width = flow.reservoir_width(dt);
        if !(width > 0.0) {
            return Vec::new();
        }

        let reservoir = self.extrude(width);
        let count = (flow.density() * (reservoir.volume() - self.volume())).round() as usize;

        let mut particles = Vec::with_capacity(count);
        while particles.len() < count {
            let position = reservoir.sample_point(rng);
            if !self.contains(&position) {
                particles.push(Particle::new(position, flow.sample_velocity(rng)));
            }
        }
        particles
    }
}

/// Free-stream gas state with a Maxwellian velocity distribution.
#[derive(Debug, Clone)]
pub struct Flow {
    pub concentration: f64,
    pub velocity: Vector3<f64>,
    pub temperature: f64,
    pub mass: f64,
    pub statistical_weight: f64,
    maxwellian: [Normal<f64>; 3],
}

impl Flow {
    pub fn new(config: &FlowConfig) -> Result<Self> {
        ensure!(
            config.concentration >= 0.0,
            "flow concentration must not be negative"
        );
        ensure!(
            config.temperature >= 0.0,
            "flow temperature must not be negative"
        );
        ensure!(config.mass > 0.0, "molecular mass must be greater than 0");
        ensure!(
            config.statistical_weight > 0.0,
            "statistical weight must be greater than 0"
        );

        let velocity = Vector3::from(config.velocity);
        let sigma = (BOLTZMANN * config.temperature / config.mass).sqrt();
        let component = |i: usize| {
            Normal::new(velocity[i], sigma)
                .map_err(|e| anyhow!("invalid Maxwellian parameters: {}", e))
        };

        Ok(Self {
            concentration: config.concentration,
            velocity,
            temperature: config.temperature,
            mass: config.mass,
            statistical_weight: config.statistical_weight,
            maxwellian: [component(0)?, component(1)?, component(2)?],
        })
    }

    /// Standard deviation of each velocity component, `sqrt(kT/m)`.
    pub fn thermal_speed(&self) -> f64 {
        (BOLTZMANN * self.temperature / self.mass).sqrt()
    }

    /// Simulated particles per unit volume.
    pub fn density(&self) -> f64 {
        self.concentration / self.statistical_weight
    }

    /// Distance beyond which a free-stream particle cannot reach the box in
    /// `dt`, short of the far Maxwellian tail.
    pub fn reservoir_width(&self, dt: f64) -> f64 {
        (self.velocity.norm() + RESERVOIR_SIGMAS * self.thermal_speed()) * dt
    }

    pub fn sample_velocity<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3<f64> {
        Vector3::new(
            self.maxwellian[0].sample(rng),
            self.maxwellian[1].sample(rng),
            self.maxwellian[2].sample(rng),
        )
    }
}

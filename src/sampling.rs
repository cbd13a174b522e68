//! Macroscopic flow properties averaged over a regular spatial grid.
//!
//! Individual particles are noisy; the quantities of interest are cell
//! averages over many particles and many steps. Sampling is split in two:
//! an [`Accumulator`] collects raw per-cell sums step after step, and
//! [`Accumulator::average`] turns the sums into physical fields.
//!
//! # Sampled fields
//!
//! - Number density, in real molecules per unit volume
//! - Mean (drift) velocity
//! - Translational temperature from the velocity spread about the mean

use std::ops::{Add, AddAssign};

use anyhow::{ensure, Result};
use nalgebra::{Point3, Vector3};
use ndarray::{Array3, Array4};
use rayon::prelude::*;

use crate::domain::{Domain, Flow};
use crate::particle::Particle;
use crate::settings::BOLTZMANN;


/// Regular grid of sampling cells over a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub domain: Domain,
    pub cells: [usize; 3],
}

impl Grid {
    pub fn new(domain: Domain, cells: [usize; 3]) -> Result<Self> {
        ensure!(
            cells.iter().all(|&n| n > 0),
            "grid needs at least one cell per axis, got {:?}",
            cells
        );
        Ok(Self { domain, cells })
    }

    pub fn cell_size(&self) -> Vector3<f64> {
        self.domain
            .size()
            .component_div(&Vector3::from_fn(|i, _| self.cells[i] as f64))
    }

    pub fn cell_volume(&self) -> f64 {
        self.cell_size().product()
    }

    /// Index of the cell holding `point`, if it lies in the domain.
    pub fn locate(&self, point: &Point3<f64>) -> Option<[usize; 3]> {
        if !self.domain.contains(point) {
            return None;
        }
        let size = self.cell_size();
        let mut index = [0; 3];
        for i in 0..3 {
            let k = ((point[i] - self.domain.min[i]) / size[i]).floor() as usize;
            index[i] = k.min(self.cells[i] - 1);
        }
        Some(index)
    }

    pub fn cell_center(&self, index: [usize; 3]) -> Point3<f64> {
        let size = self.cell_size();
        Point3::from(Vector3::from_fn(|i, _| {
            self.domain.min[i] + (index[i] as f64 + 0.5) * size[i]
        }))
    }

    /// Sums over one snapshot of the ensemble, counted as one sample.
    pub fn sample(&self, particles: &[Particle]) -> Accumulator {
        let mut acc = particles
            .par_iter()
            .fold(
                || Accumulator::new(self.cells),
                |mut acc, particle| {
                    acc.record(self, particle);
                    acc
                },
            )
            .reduce(|| Accumulator::new(self.cells), |a, b| a + b);
        acc.samples = 1;
        acc
    }
}

/// Per-cell sums collected over any number of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    pub counts: Array3<f64>,   // particles seen per cell
    pub momentum: Array4<f64>, // velocity sums, last axis is the component
    pub energy: Array3<f64>,   // squared speed sums
    pub samples: usize,        // number of snapshots accumulated
}

impl Accumulator {
    pub fn new(cells: [usize; 3]) -> Self {
        let [nx, ny, nz] = cells;
        Self {
            counts: Array3::zeros((nx, ny, nz)),
            momentum: Array4::zeros((nx, ny, nz, 3)),
            energy: Array3::zeros((nx, ny, nz)),
            samples: 0,
        }
    }

    /// Adds one particle to the sums of its cell. Particles outside the grid
    /// are ignored.
    pub fn record(&mut self, grid: &Grid, particle: &Particle) {
        let Some([i, j, k]) = grid.locate(&particle.position) else {
            return;
        };
        let v = &particle.velocity;
        self.counts[[i, j, k]] += 1.0;
        for c in 0..3 {
            self.momentum[[i, j, k, c]] += v[c];
        }
        self.energy[[i, j, k]] += v.norm_squared();
    }

    /// Converts the sums to macroscopic fields. Empty cells are all zero.
    pub fn average(&self, grid: &Grid, flow: &Flow) -> Macroscopic {
        let mut fields = Macroscopic::new(self.counts.dim());
        let samples = self.samples.max(1) as f64;
        let volume = grid.cell_volume();

        for ((i, j, k), &count) in self.counts.indexed_iter() {
            if count == 0.0 {
                continue;
            }
            fields.density[[i, j, k]] = count / samples * flow.statistical_weight / volume;

            let u = Vector3::from_fn(|c, _| self.momentum[[i, j, k, c]] / count);
            for c in 0..3 {
                fields.velocity[[i, j, k, c]] = u[c];
            }

            let spread = (self.energy[[i, j, k]] / count - u.norm_squared()).max(0.0);
            fields.temperature[[i, j, k]] = flow.mass * spread / (3.0 * BOLTZMANN);
        }

        fields
    }
}

impl Add for Accumulator {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl AddAssign for Accumulator {
    fn add_assign(&mut self, other: Self) {
        self.counts += &other.counts;
        self.momentum += &other.momentum;
        self.energy += &other.energy;
        self.samples += other.samples;
    }
}

/// Cell-averaged macroscopic fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Macroscopic {
    pub density: Array3<f64>,     // real molecules per unit volume
    pub velocity: Array4<f64>,    // mean velocity, last axis is the component
    pub temperature: Array3<f64>, // translational temperature, K
}

impl Macroscopic {
    fn new((nx, ny, nz): (usize, usize, usize)) -> Self {
        Self {
            density: Array3::zeros((nx, ny, nz)),
            velocity: Array4::zeros((nx, ny, nz, 3)),
            temperature: Array3::zeros((nx, ny, nz)),
        }
    }
}

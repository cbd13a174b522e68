//! Free flight and specular wall reflection of a particle ensemble.
//!
//! One step of the collisionless DSMC scheme is a pure pipeline applied to
//! every particle independently:
//! 1. free flight for the step duration
//! 2. reflection off the first body surface crossed during the flight
//! 3. removal of particles that still end up inside the body
//!
//! Particles never interact, and the body is read-only, so the ensemble is
//! processed in parallel with `rayon`.

use std::ops::{Add, AddAssign};

use rayon::prelude::*;
use serde::Serialize;

use crate::containment::{hit_point, inside};
use crate::geom::Body;
use crate::helpers::reflect;
use crate::particle::Particle;
use crate::settings::REFLECTION_BIAS;


/// Particle counts from one application of the resolver.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct StepStats {
    pub reflected: usize, // particles that bounced off a surface
    pub clipped: usize,   // particles removed for ending up inside the body
}

impl Add for StepStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            reflected: self.reflected + other.reflected,
            clipped: self.clipped + other.clipped,
        }
    }
}

impl AddAssign for StepStats {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Reflects a particle that has just completed free flight of duration `dt`
/// off the first surface of `body` it crossed.
///
/// Returns `None` when no surface was crossed, or when the particle was
/// already inside at the start of the step (no normal to reflect about).
///
/// The particle is moved back to the crossing point, its velocity mirrored
/// about the surface normal, and then moved forward along the new velocity
/// by `bias` so that the same crossing is not found again next step.
pub fn collide(particle: &Particle, dt: f64, body: &Body, bias: f64) -> Option<Particle> {
    let hit = hit_point(dt, body, particle)?;
    let normal = hit.normal?;

    let contact = particle.advance(hit.time);
    let bounced = contact.with_velocity(reflect(&contact.velocity, &normal));

    Some(bounced.advance(bias))
}

/// Advances the ensemble by one step of length `dt` past `body`.
///
/// Uses the default reflection bias. Particles left inside the body are
/// dropped; the survivors keep their input order.
pub fn advance(particles: &[Particle], dt: f64, body: &Body) -> Vec<Particle> {
    advance_with_bias(particles, dt, body, REFLECTION_BIAS).0
}

/// As [`advance`], with an explicit reflection bias and step statistics.
///
/// **Context**: Reflection only resolves the first crossing in a step, and
/// floating-point error can leave a reflected particle a hair inside a
/// surface. Grazing hits and multiple crossings per step can do the same.
///
/// **How it Works**: Flies and resolves every particle in parallel, then,
/// once the whole ensemble is resolved, removes those found inside the
/// body. This keeps leakage into solids from accumulating over many steps.
pub fn advance_with_bias(
    particles: &[Particle],
    dt: f64,
    body: &Body,
    bias: f64,
) -> (Vec<Particle>, StepStats) {
    let resolved: Vec<(Particle, bool)> = particles
        .par_iter()
        .map(|particle| {
            let flown = particle.advance(dt);
            match collide(&flown, dt, body, bias) {
                Some(bounced) => (bounced, true),
                None => (flown, false),
            }
        })
        .collect();

    let reflected = resolved.iter().filter(|(_, bounced)| *bounced).count();
    let total = resolved.len();

    let survivors: Vec<Particle> = resolved
        .into_par_iter()
        .map(|(particle, _)| particle)
        .filter(|particle| !inside(body, &particle.position))
        .collect();

    let stats = StepStats {
        reflected,
        clipped: total - survivors.len(),
    };

    (survivors, stats)
}

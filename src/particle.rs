use nalgebra::{Point3, Vector3};

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn advance_is_pure_translation() {
        let p = Particle::new(Point3::new(1.0, 0.0, -1.0), Vector3::new(2.0, 0.5, 0.0));
        let q = p.advance(0.5);
        assert_eq!(q.position, Point3::new(2.0, 0.25, -1.0));
        assert_eq!(q.velocity, p.velocity);
        // the original value is untouched
        assert_eq!(p.position, Point3::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn position_at_negative_time() {
        let p = Particle::new(Point3::origin(), Vector3::new(1.0, -1.0, 2.0));
        assert_eq!(p.at(-2.0), Point3::new(-2.0, 2.0, -4.0));
    }
}

/// A simulated gas molecule: a point moving in free flight.
///
/// Particles are values. Every stage of a step (flight, reflection) returns a
/// new particle instead of mutating the old one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Point3<f64>,
    pub velocity: Vector3<f64>,
}

impl Particle {
    pub fn new(position: Point3<f64>, velocity: Vector3<f64>) -> Self {
        Self { position, velocity }
    }

    /// Position reached after time `t` of free flight. `t` may be negative.
    #[inline]
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.position + self.velocity * t
    }

    /// The particle after time `dt` of free flight.
    #[inline]
    pub fn advance(&self, dt: f64) -> Self {
        Self {
            position: self.at(dt),
            velocity: self.velocity,
        }
    }

    /// The same position with a new velocity.
    #[inline]
    pub fn with_velocity(&self, velocity: Vector3<f64>) -> Self {
        Self {
            position: self.position,
            velocity,
        }
    }
}

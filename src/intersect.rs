//! Closed-form intersection of particle trajectories with primitive bodies.
//!
//! Each primitive is a quadric (or a half-space), so the times at which a
//! straight trajectory crosses its surface are the roots of at most a
//! quadratic. A primitive therefore yields at most one segment, which may be
//! open towards either infinity. Degenerate cases (parallel to a plane,
//! tangent to a curved surface, wrong nappe of a cone) give an empty trace
//! rather than an error.

use nalgebra::{Point3, Vector3};

use crate::geom::{Cone, Cylinder, Plane, Sphere};
use crate::helpers::{axial, radial, solve_quadratic};
use crate::particle::Particle;
use crate::trace::{HitPoint, HitSegment, Trace, Traceable};


impl Traceable for Plane {
    fn trace(&self, particle: &Particle) -> Trace {
        let f = -self.normal.dot(&particle.velocity);
        if f == 0.0 {
            return Trace::new();
        }

        let t = (particle.position.coords.dot(&self.normal) - self.distance) / f;
        let hit = HitPoint::new(t, Some(self.normal));

        if f > 0.0 {
            HitSegment::new(hit, HitPoint::pos_infinity()).into()
        } else {
            HitSegment::new(HitPoint::neg_infinity(), hit).into()
        }
    }
}

impl Traceable for Sphere {
    fn trace(&self, particle: &Particle) -> Trace {
        let v = &particle.velocity;
        let d = particle.position - self.center;

        let a = v.dot(v);
        let b = 2.0 * v.dot(&d);
        let c = d.dot(&d) - self.radius * self.radius;

        let normal = |t: f64| (particle.at(t) - self.center).normalize();

        match solve_quadratic(a, b, c) {
            Some((t1, t2)) => HitSegment::new(
                HitPoint::new(t1, Some(normal(t1))),
                HitPoint::new(t2, Some(normal(t2))),
            )
            .into(),
            None => Trace::new(),
        }
    }
}

impl Traceable for Cylinder {
    fn trace(&self, particle: &Particle) -> Trace {
        // only the components across the axis matter
        let v = self.axis.cross(&particle.velocity);
        let d = self.axis.cross(&(particle.position - self.center));

        let a = v.dot(&v);
        let b = 2.0 * v.dot(&d);
        let c = d.dot(&d) - self.radius * self.radius;

        let normal = |t: f64| radial(&(particle.at(t) - self.center), &self.axis).normalize();

        match solve_quadratic(a, b, c) {
            Some((t1, t2)) => HitSegment::new(
                HitPoint::new(t1, Some(normal(t1))),
                HitPoint::new(t2, Some(normal(t2))),
            )
            .into(),
            None => Trace::new(),
        }
    }
}

impl Cone {
    /// Signed distance of `point` from the plane through the apex across the
    /// axis; positive on the nappe that belongs to the body.
    #[inline]
    fn nappe(&self, point: &Point3<f64>) -> f64 {
        point.coords.dot(&self.axis) - self.offset
    }

    /// Outward unit normal at a point on the surface.
    ///
    /// On the surface the radial offset from the axis grows with slope
    /// `tangent` along it, so the normal leans back along `−axis` by the
    /// same slope.
    fn normal(&self, point: &Point3<f64>) -> Vector3<f64> {
        let u = point - self.apex;
        let across = u - axial(&u, &self.axis);
        (across.normalize() - self.axis * self.tangent).normalize()
    }
}

impl Traceable for Cone {
    /// **Context**: The quadric `M` describes a double cone, so a trajectory
    /// can cross either sheet. Only the positive nappe is part of the body.
    ///
    /// **How it Works**: Solves `(x(t) − apex)ᵀ M (x(t) − apex) = 0` for the
    /// crossing times, then checks each crossing point on its own against
    /// the apex plane. Both crossings on the body's nappe bound a closed
    /// segment. A single surviving crossing means the other end of the
    /// inside stretch runs off through the far sheet's side to infinity, so
    /// the segment is half-open in the direction away from the discarded
    /// crossing. No surviving crossing leaves the trace empty.
    fn trace(&self, particle: &Particle) -> Trace {
        let v = &particle.velocity;
        let delta = particle.position - self.apex;

        let mv = self.matrix * v;
        let a = v.dot(&mv);
        let b = 2.0 * delta.dot(&mv);
        let c = delta.dot(&(self.matrix * delta));

        let Some((t1, t2)) = solve_quadratic(a, b, c) else {
            return Trace::new();
        };

        let (p1, p2) = (particle.at(t1), particle.at(t2));
        let hit = |t: f64, p: &Point3<f64>| HitPoint::new(t, Some(self.normal(p)));

        match (self.nappe(&p1) >= 0.0, self.nappe(&p2) >= 0.0) {
            (true, true) => HitSegment::new(hit(t1, &p1), hit(t2, &p2)).into(),
            (true, false) => HitSegment::new(HitPoint::neg_infinity(), hit(t1, &p1)).into(),
            (false, true) => HitSegment::new(hit(t2, &p2), HitPoint::pos_infinity()).into(),
            (false, false) => Trace::new(),
        }
    }
}

//! Point membership and surface-hit queries against a body.
//!
//! This module turns traces into the two questions the rest of the
//! simulation actually asks about geometry: did a particle cross the surface
//! of a body during the step that just elapsed, and is a point inside a body.
//!
//! The query system provides:
//! - Earliest surface crossing within the last time step
//! - Point-in-body classification for clipping and sampling
//!
//! Both queries clip a trace against a time window with
//! [`Trace::intersect`](crate::trace::Trace::intersect), so they inherit the
//! sortedness of traces: the first segment of the clipped trace is always
//! the earliest one.

use nalgebra::{Point3, Vector3};

use crate::geom::Body;
use crate::particle::Particle;
use crate::trace::{HitPoint, HitSegment, Trace, Traceable};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::geom::{complement, cylinder, intersect, plane, sphere, unite};
    use approx::assert_abs_diff_eq;

    #[test]
    fn hit_during_last_step() {
        let body = sphere(Point3::origin(), 1.0);
        // started at x = -1.5 and flew for one time unit
        let p = Particle::new(Point3::new(-1.5, 0.0, 0.0), Vector3::x()).advance(1.0);
        let hit = hit_point(1.0, &body, &p).unwrap();
        assert_abs_diff_eq!(hit.time, -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(hit.normal.unwrap(), -Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn no_hit_outside_the_step() {
        let body = sphere(Point3::origin(), 1.0);
        // will hit in the future, not in the past step
        let p = Particle::new(Point3::new(-3.0, 0.0, 0.0), Vector3::x());
        assert_eq!(hit_point(1.0, &body, &p), None);
        // crossed long before the step began and is still inside
        let p = Particle::new(Point3::new(-0.2, 0.0, 0.0), Vector3::x());
        let hit = hit_point(0.1, &body, &p).unwrap();
        assert_eq!(hit.normal, None);
        assert_abs_diff_eq!(hit.time, -0.1, epsilon = 1e-12);
    }

    #[test]
    fn hit_time_lies_in_step() {
        let body = plane(Vector3::x(), 0.0);
        let p = Particle::new(Point3::new(-0.25, 0.0, 0.0), -Vector3::x() * 2.0);
        // moving deeper into the half-space x <= 0, entered 0.125 ago
        let hit = hit_point(0.5, &body, &p).unwrap();
        assert!(hit.time >= -0.5 && hit.time <= 0.0);
        assert_abs_diff_eq!(hit.time, -0.125, epsilon = 1e-12);
        assert_eq!(hit.normal, Some(Vector3::x()));
    }

    #[test]
    fn earliest_of_two_crossings() {
        // two spheres on the path, both crossed within one long step
        let body = unite(
            sphere(Point3::new(1.0, 0.0, 0.0), 0.5),
            sphere(Point3::new(3.0, 0.0, 0.0), 0.5),
        );
        let p = Particle::new(Point3::new(5.0, 0.0, 0.0), Vector3::x());
        let hit = hit_point(5.0, &body, &p).unwrap();
        assert_abs_diff_eq!(hit.time, -4.5, epsilon = 1e-12);
    }

    #[test]
    fn hollow_sphere_from_inside_cavity() {
        let shell = intersect(
            sphere(Point3::origin(), 2.0),
            complement(sphere(Point3::origin(), 1.0)),
        );
        let p = Particle::new(Point3::new(1.25, 0.0, 0.0), Vector3::x());
        let hit = hit_point(0.5, &shell, &p).unwrap();
        assert_abs_diff_eq!(hit.time, -0.25, epsilon = 1e-12);
        // cavity wall normal points back towards the centre
        assert_abs_diff_eq!(hit.normal.unwrap(), -Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn inside_primitives() {
        let ball = sphere(Point3::new(1.0, 0.0, 0.0), 1.0);
        assert!(inside(&ball, &Point3::new(1.5, 0.2, 0.0)));
        assert!(!inside(&ball, &Point3::new(-0.5, 0.0, 0.0)));

        let half = plane(Vector3::z(), 1.0);
        assert!(inside(&half, &Point3::new(0.0, 0.0, 0.5)));
        assert!(!inside(&half, &Point3::new(0.0, 0.0, 1.5)));

        let tube = cylinder(Vector3::new(1.0, -1.0, 0.5), Point3::origin(), 0.5);
        assert!(inside(&tube, &Point3::new(2.0, -2.0, 1.0)));
        assert!(!inside(&tube, &Point3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn surface_points_count_as_inside() {
        let ball = sphere(Point3::origin(), 1.0);
        assert!(inside(&ball, &Point3::new(1.0, 0.0, 0.0)));
        assert!(inside(&ball, &Point3::new(0.0, -1.0, 0.0)));

        let half = plane(Vector3::z(), 1.0);
        assert!(inside(&half, &Point3::new(0.3, -2.0, 1.0)));
    }

    #[test]
    fn inside_composites() {
        let shell = intersect(
            sphere(Point3::origin(), 2.0),
            complement(sphere(Point3::origin(), 1.0)),
        );
        assert!(!inside(&shell, &Point3::origin()));
        assert!(inside(&shell, &Point3::new(0.0, 1.5, 0.0)));
        assert!(!inside(&shell, &Point3::new(0.0, 0.0, 2.5)));
        assert!(inside(&complement(shell), &Point3::origin()));
    }
}

/// Fixed direction for membership rays. Skewed so that it is not parallel
/// to the coordinate axes; a ray running exactly along a cylinder axis or a
/// cone generatrix sees no crossing.
fn probe_direction() -> Vector3<f64> {
    Vector3::new(1.0, 2.0, 3.0).normalize()
}

/// Earliest crossing of the surface of `body` during the step of length `dt`
/// that brought `particle` to its current position.
///
/// **Context**: After free flight the resolver has to know whether, and
/// where, a particle went through a wall on the way. Times are in the
/// particle's current frame, so the elapsed step is `[−dt, 0]`.
///
/// **How it Works**: Clips the body trace to the step window and returns the
/// start of the first remaining segment. The returned time lies in
/// `[−dt, 0]`. A hit without a normal means the particle was already inside
/// when the step began.
pub fn hit_point(dt: f64, body: &Body, particle: &Particle) -> Option<HitPoint> {
    let window: Trace = HitSegment::window(-dt, 0.0).into();
    body.trace(particle)
        .intersect(&window)
        .first()
        .map(|segment| segment.start)
}

/// True if `point` lies inside `body` or on its surface.
///
/// Casts a ray from `point` and checks whether `t = 0` falls inside any
/// segment of its trace. Membership does not depend on the ray direction.
pub fn inside(body: &Body, point: &Point3<f64>) -> bool {
    let probe = Particle::new(*point, probe_direction());
    let now: Trace = HitSegment::window(0.0, 0.0).into();
    !body.trace(&probe).intersect(&now).is_empty()
}

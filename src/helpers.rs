//! Small numerical helpers shared by the geometry and collision code.
//!
//! `nalgebra` already provides the vector algebra (addition, scaling, dot and
//! cross products, norms). This module adds the pieces it does not:
//! - A real quadratic-root solver with the tangent-root policy used by tracing
//! - Decomposition of a vector into axial and radial parts against a unit axis
//! - Specular reflection of a velocity about a surface normal

use nalgebra::Vector3;


/// Real roots of `a t² + b t + c = 0`, ordered `(min, max)`.
///
/// Returns `None` when the discriminant is not strictly positive. A tangent
/// double root is treated as no root at all: a zero-width interval carries no
/// meaning for wall collisions.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let d = b * b - 4.0 * a * c;
    if d <= 0.0 {
        return None;
    }

    let sq = d.sqrt();
    let r1 = (-b - sq) / (2.0 * a);
    let r2 = (-b + sq) / (2.0 * a);

    Some((r1.min(r2), r1.max(r2)))
}

/// Component of `u` along the unit vector `axis`.
#[inline]
pub fn axial(u: &Vector3<f64>, axis: &Vector3<f64>) -> Vector3<f64> {
    axis * u.dot(axis)
}

/// Component of `u` perpendicular to the unit vector `axis`.
#[inline]
pub fn radial(u: &Vector3<f64>, axis: &Vector3<f64>) -> Vector3<f64> {
    u - axial(u, axis)
}

/// Mirrors `velocity` about a surface with unit `normal`.
///
/// The tangential component is kept and the normal component reversed, so
/// the result does not depend on which way the normal points.
#[inline]
pub fn reflect(velocity: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
    velocity - normal * (2.0 * velocity.dot(normal))
}

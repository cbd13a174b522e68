use std::sync::Arc;

use anyhow::{anyhow, Result};
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};


/// Half-space `normal · x <= distance`, bounded by a plane.
/// `normal` is the unit outward normal.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

/// Infinite circular cylinder around a unit `axis` through `center`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    pub axis: Vector3<f64>,
    pub center: Point3<f64>,
    pub radius: f64,
}

/// Infinite solid cone opening from `apex` along the unit `axis`, with
/// half-angle `angle`. Only the nappe on the positive side of the axis
/// belongs to the body.
///
/// The remaining fields are derived once at construction:
/// - `matrix` is the quadric `axis ⊗ axis − cos²(angle)·I`; a point `x` lies
///   on the double cone when `(x − apex)ᵀ M (x − apex) = 0`
/// - `tangent` is the slope of a generatrix against the axis
/// - `offset` is `axis · apex`, the apex-plane offset used to pick a nappe
#[derive(Debug, Clone, PartialEq)]
pub struct Cone {
    pub axis: Vector3<f64>,
    pub apex: Point3<f64>,
    pub matrix: Matrix3<f64>,
    pub tangent: f64,
    pub offset: f64,
}

impl Cone {
    pub fn new(axis: Vector3<f64>, apex: Point3<f64>, angle: f64) -> Self {
        let axis = axis.normalize();
        let cos2 = angle.cos().powi(2);
        Self {
            axis,
            apex,
            matrix: axis * axis.transpose() - Matrix3::identity() * cos2,
            tangent: angle.tan(),
            offset: axis.dot(&apex.coords),
        }
    }
}

/// A solid body: a primitive or a boolean combination of bodies.
///
/// Bodies form a finite tree built once before a simulation and never
/// mutated. Children sit behind `Arc` so subtrees can be shared, and the
/// whole tree can be read from many threads at once.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Plane(Plane),
    Sphere(Sphere),
    Cylinder(Cylinder),
    Cone(Cone),
    Union(Arc<Body>, Arc<Body>),
    Intersection(Arc<Body>, Arc<Body>),
    Complement(Arc<Body>),
}

const _: () = {
    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send_sync::<Body>();
    }
};

/// Half-space behind the plane `normal · x = distance`.
/// `normal` is normalised; `distance` is taken as given.
pub fn plane(normal: Vector3<f64>, distance: f64) -> Body {
    Body::Plane(Plane {
        normal: normal.normalize(),
        distance,
    })
}

pub fn sphere(center: Point3<f64>, radius: f64) -> Body {
    Body::Sphere(Sphere { center, radius })
}

/// Infinite cylinder; `axis` is normalised.
pub fn cylinder(axis: Vector3<f64>, center: Point3<f64>, radius: f64) -> Body {
    Body::Cylinder(Cylinder {
        axis: axis.normalize(),
        center,
        radius,
    })
}

/// Infinite one-sided cone with half-angle `angle` in radians.
pub fn cone(axis: Vector3<f64>, apex: Point3<f64>, angle: f64) -> Body {
    Body::Cone(Cone::new(axis, apex, angle))
}

pub fn intersect(left: impl Into<Arc<Body>>, right: impl Into<Arc<Body>>) -> Body {
    Body::Intersection(left.into(), right.into())
}

pub fn unite(left: impl Into<Arc<Body>>, right: impl Into<Arc<Body>>) -> Body {
    Body::Union(left.into(), right.into())
}

pub fn complement(inner: impl Into<Arc<Body>>) -> Body {
    Body::Complement(inner.into())
}

/// Serialisable description of a body, as written in configuration files.
///
/// **Context**: Simulated geometry is assembled from user input rather than
/// code, so it needs a plain-data form that nests the same way `Body` does.
///
/// **How it Works**: Each variant mirrors one construction operation and is
/// selected by its `type` key. [`BodyConfig::build`] validates parameters and
/// recursively produces the immutable `Body` tree.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BodyConfig {
    Plane {
        normal: [f64; 3],
        distance: f64,
    },
    Sphere {
        center: [f64; 3],
        radius: f64,
    },
    Cylinder {
        axis: [f64; 3],
        center: [f64; 3],
        radius: f64,
    },
    Cone {
        axis: [f64; 3],
        apex: [f64; 3],
        /// Half-angle in degrees.
        angle: f64,
    },
    Union {
        left: Box<BodyConfig>,
        right: Box<BodyConfig>,
    },
    Intersection {
        left: Box<BodyConfig>,
        right: Box<BodyConfig>,
    },
    Complement {
        inner: Box<BodyConfig>,
    },
}

impl BodyConfig {
    /// Builds the body tree, rejecting degenerate primitives.
    pub fn build(&self) -> Result<Body> {
        let body = match self {
            BodyConfig::Plane { normal, distance } => {
                plane(direction(normal, "plane normal")?, *distance)
            }
            BodyConfig::Sphere { center, radius } => {
                sphere(Point3::from(*center), positive(*radius, "sphere radius")?)
            }
            BodyConfig::Cylinder {
                axis,
                center,
                radius,
            } => cylinder(
                direction(axis, "cylinder axis")?,
                Point3::from(*center),
                positive(*radius, "cylinder radius")?,
            ),
            BodyConfig::Cone { axis, apex, angle } => {
                if !(*angle > 0.0 && *angle < 90.0) {
                    return Err(anyhow!(
                        "cone half-angle must lie strictly between 0 and 90 degrees, got {}",
                        angle
                    ));
                }
                cone(
                    direction(axis, "cone axis")?,
                    Point3::from(*apex),
                    angle.to_radians(),
                )
            }
            BodyConfig::Union { left, right } => unite(left.build()?, right.build()?),
            BodyConfig::Intersection { left, right } => intersect(left.build()?, right.build()?),
            BodyConfig::Complement { inner } => complement(inner.build()?),
        };
        Ok(body)
    }
}

fn direction(v: &[f64; 3], what: &str) -> Result<Vector3<f64>> {
    let v = Vector3::from(*v);
    let norm = v.norm();
    if norm.is_finite() && norm > 0.0 {
        Ok(v)
    } else {
        Err(anyhow!("{} must be a finite non-zero vector, got {:?}", what, v))
    }
}

fn positive(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(anyhow!("{} must be finite and > 0, got {}", what, value))
    }
}

//! Traces: the time intervals during which a trajectory lies inside a body.
//!
//! A trajectory is a particle in free flight, parameterised by time with
//! `t = 0` at the particle's current position. Tracing a body yields a
//! [`Trace`], a sorted list of disjoint [`HitSegment`]s. Every segment
//! boundary is a [`HitPoint`] carrying the outward surface normal at that
//! boundary, or no normal when the boundary lies at infinity.
//!
//! Composite bodies are traced by combining the traces of their children:
//! - Intersection of bodies: [`Trace::intersect`]
//! - Union of bodies: [`Trace::unite`]
//! - Complement of a body: [`Trace::complement`]
//!
//! All three are linear merges over sorted lists, so every trace produced
//! here stays sorted and disjoint regardless of nesting depth.

use itertools::Itertools;
use nalgebra::Vector3;

use crate::geom::Body;
use crate::particle::Particle;


/// A boundary of a trace segment.
///
/// `normal` is the outward unit normal of the body at the crossing. A hit
/// without a normal lies at infinity and marks the open end of a ray.
/// Hit points are ordered by `time` only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPoint {
    pub time: f64,
    pub normal: Option<Vector3<f64>>,
}

impl HitPoint {
    pub fn new(time: f64, normal: Option<Vector3<f64>>) -> Self {
        Self { time, normal }
    }

    /// The open start of a ray that has always been inside.
    pub fn neg_infinity() -> Self {
        Self::new(f64::NEG_INFINITY, None)
    }

    /// The open end of a ray that stays inside forever.
    pub fn pos_infinity() -> Self {
        Self::new(f64::INFINITY, None)
    }

    /// The same hit with the normal pointing the other way.
    pub fn flipped(&self) -> Self {
        Self::new(self.time, self.normal.map(|n| -n))
    }

    /// The later of two hits. Ties keep `self`.
    fn later(self, other: Self) -> Self {
        if other.time > self.time {
            other
        } else {
            self
        }
    }

    /// The earlier of two hits. Ties keep `self`.
    fn earlier(self, other: Self) -> Self {
        if other.time < self.time {
            other
        } else {
            self
        }
    }
}

/// A maximal stretch of time spent inside a body, `start.time <= end.time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitSegment {
    pub start: HitPoint,
    pub end: HitPoint,
}

impl HitSegment {
    pub fn new(start: HitPoint, end: HitPoint) -> Self {
        debug_assert!(
            !(start.time > end.time),
            "segment starts at {} after it ends at {}",
            start.time,
            end.time
        );
        Self { start, end }
    }

    /// A segment with no surface at either end, used as a query window.
    pub fn window(start: f64, end: f64) -> Self {
        Self::new(HitPoint::new(start, None), HitPoint::new(end, None))
    }

    /// True if `self` ends strictly before `other` starts.
    #[inline]
    fn precedes(&self, other: &HitSegment) -> bool {
        self.end.time < other.start.time
    }

    #[inline]
    fn merge(&self, other: &HitSegment) -> HitSegment {
        HitSegment::new(
            self.start.earlier(other.start),
            self.end.later(other.end),
        )
    }
}

/// Sorted, pairwise disjoint segments. An empty trace means never inside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    segments: Vec<HitSegment>,
}

impl From<Vec<HitSegment>> for Trace {
    fn from(segments: Vec<HitSegment>) -> Self {
        debug_assert!(
            segments
                .iter()
                .tuple_windows()
                .all(|(a, b)| a.start.time < b.start.time && a.end.time <= b.start.time),
            "trace segments must be sorted and disjoint"
        );
        Self { segments }
    }
}

impl From<HitSegment> for Trace {
    fn from(segment: HitSegment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[HitSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// The earliest segment, if any.
    pub fn first(&self) -> Option<&HitSegment> {
        self.segments.first()
    }

    /// Times spent inside both `self` and `other`.
    ///
    /// **Context**: The trace of an intersection body is the overlap of its
    /// children's traces. The same operation clips a trace to a time window.
    ///
    /// **How it Works**: Walks both lists at once. A pair that overlaps
    /// (touching included) emits the later start and the earlier end; then
    /// whichever segment ends first is dropped, since the other may still
    /// overlap the next segment on the opposite side. On equal times the
    /// boundary from `self` is kept.
    pub fn intersect(&self, other: &Trace) -> Trace {
        let mut segments = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < self.segments.len() && j < other.segments.len() {
            let a = &self.segments[i];
            let b = &other.segments[j];

            if a.precedes(b) {
                i += 1;
                continue;
            }
            if b.precedes(a) {
                j += 1;
                continue;
            }

            segments.push(HitSegment::new(
                a.start.later(b.start),
                a.end.earlier(b.end),
            ));

            if a.end.time < b.end.time {
                i += 1;
            } else {
                j += 1;
            }
        }

        Trace { segments }
    }

    /// Times spent inside `self` or `other`.
    ///
    /// Each segment of `other` is folded into a copy of `self`. Touching or
    /// overlapping segments merge, so the result stays disjoint.
    pub fn unite(&self, other: &Trace) -> Trace {
        other
            .segments
            .iter()
            .fold(self.clone(), |acc, segment| acc.insert(*segment))
    }

    fn insert(self, segment: HitSegment) -> Trace {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        let mut merged = segment;
        let mut placed = false;

        for current in self.segments {
            if placed || current.precedes(&merged) {
                segments.push(current);
            } else if merged.precedes(&current) {
                segments.push(merged);
                segments.push(current);
                placed = true;
            } else {
                merged = current.merge(&merged);
            }
        }
        if !placed {
            segments.push(merged);
        }

        Trace { segments }
    }

    /// Times spent outside `self`, over the whole real line.
    ///
    /// Outside a body is inside its complement, so every surviving boundary
    /// has its normal reversed to keep normals pointing out of the result.
    pub fn complement(&self) -> Trace {
        let (Some(first), Some(last)) = (self.segments.first(), self.segments.last()) else {
            return HitSegment::new(HitPoint::neg_infinity(), HitPoint::pos_infinity()).into();
        };

        let mut segments = Vec::with_capacity(self.segments.len() + 1);

        if first.start.time != f64::NEG_INFINITY {
            segments.push(HitSegment::new(
                HitPoint::neg_infinity(),
                first.start.flipped(),
            ));
        }
        segments.extend(
            self.segments
                .iter()
                .tuple_windows()
                .map(|(a, b)| HitSegment::new(a.end.flipped(), b.start.flipped())),
        );
        if last.end.time != f64::INFINITY {
            segments.push(HitSegment::new(
                last.end.flipped(),
                HitPoint::pos_infinity(),
            ));
        }

        Trace { segments }
    }
}

/// Anything a particle trajectory can be traced through.
pub trait Traceable {
    /// The times, relative to the particle's current position, during which
    /// its free-flight trajectory is inside `self`.
    fn trace(&self, particle: &Particle) -> Trace;
}

impl Traceable for Body {
    fn trace(&self, particle: &Particle) -> Trace {
        match self {
            Body::Plane(plane) => plane.trace(particle),
            Body::Sphere(sphere) => sphere.trace(particle),
            Body::Cylinder(cylinder) => cylinder.trace(particle),
            Body::Cone(cone) => cone.trace(particle),
            Body::Intersection(left, right) => {
                left.trace(particle).intersect(&right.trace(particle))
            }
            Body::Union(left, right) => left.trace(particle).unite(&right.trace(particle)),
            Body::Complement(inner) => inner.trace(particle).complement(),
        }
    }
}

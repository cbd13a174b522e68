//! Collisionless direct simulation Monte Carlo of rarefied gas flow past
//! bodies described by constructive solid geometry.

pub mod collision;
pub mod containment;
pub mod domain;
pub mod geom;
pub mod helpers;
pub mod intersect;
pub mod output;
pub mod particle;
pub mod sampling;
pub mod settings;
pub mod simulation;
pub mod trace;

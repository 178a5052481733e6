//! 2-D vector helpers over glam
//!
//! Lattice sites are integer (`IVec2`), particles live in continuous space
//! (`Vec2`). The checked variants refuse degenerate input instead of
//! producing NaN.

use glam::{IVec2, Vec2};
use rand::Rng;

use crate::error::{SimError, SimResult};

/// Vectors shorter than this are treated as zero length
const MIN_NORMALIZE_LENGTH: f32 = 1e-6;

/// Normalize a vector, failing on zero length
#[inline]
pub fn try_normalize(v: Vec2) -> SimResult<Vec2> {
    if !v.is_finite() || v.length_squared() < MIN_NORMALIZE_LENGTH * MIN_NORMALIZE_LENGTH {
        return Err(SimError::ZeroLengthVector);
    }
    Ok(v / v.length())
}

/// Rescale a vector to the given magnitude, keeping its direction
#[inline]
pub fn with_magnitude(v: Vec2, magnitude: f32) -> SimResult<Vec2> {
    Ok(try_normalize(v)? * magnitude)
}

/// Euclidean distance between two continuous points
#[inline]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

/// Euclidean distance between a lattice site and a continuous point
#[inline]
pub fn lattice_distance(site: IVec2, point: Vec2) -> f32 {
    site.as_vec2().distance(point)
}

/// Nearest lattice site to a continuous point
#[inline]
pub fn nearest_site(point: Vec2) -> IVec2 {
    point.round().as_ivec2()
}

/// Uniformly distributed direction with magnitude 1
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    let theta = rng.random_range(0.0..std::f32::consts::TAU);
    Vec2::from_angle(theta)
}

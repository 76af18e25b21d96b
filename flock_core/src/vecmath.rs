//! Vector helpers shared by the flock engine.

use nalgebra::Vector3;

/// Magnitudes at or below this are treated as zero when normalizing.
pub const EPSILON: f64 = 1e-12;

/// Normalizes a vector to unit length.
///
/// A near-zero-magnitude vector is returned unchanged instead of producing
/// NaNs. Callers that care about the degenerate case check the magnitude
/// themselves.
pub fn unit_or_self(v: Vector3<f64>) -> Vector3<f64> {
    let magnitude = v.norm();
    if magnitude > EPSILON {
        v / magnitude
    } else {
        v
    }
}

/// Angle between two vectors in radians.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let a_unit = unit_or_self(*a);
    let b_unit = unit_or_self(*b);
    a_unit.dot(&b_unit).clamp(-1.0, 1.0).acos()
}

/// Euclidean distance between two points.
pub fn euclidean_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (b - a).norm()
}

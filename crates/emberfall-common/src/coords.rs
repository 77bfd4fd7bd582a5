//! Position and angle helpers.
//!
//! World positions are `glam::Vec2` in world units. Angles are radians
//! measured from the +X axis, the same convention as `f32::atan2`.

use glam::Vec2;
use std::f32::consts::TAU;

/// Position in world space.
pub type WorldPos = Vec2;

/// Returns the heading (radians) of a direction vector.
///
/// A zero vector has heading 0.
#[must_use]
pub fn heading(dir: Vec2) -> f32 {
    if dir.length_squared() <= f32::EPSILON {
        0.0
    } else {
        dir.y.atan2(dir.x)
    }
}

/// Returns the heading from `from` toward `to`.
#[must_use]
pub fn heading_to(from: WorldPos, to: WorldPos) -> f32 {
    heading(to - from)
}

/// Returns the unit vector pointing along `angle`.
#[must_use]
pub fn unit_from_heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Shortest angular distance between two headings, in `[0, PI]`.
///
/// Uses `min(diff, TAU - diff)` so headings either side of the +/-PI seam
/// compare as neighbours.
#[must_use]
pub fn shortest_angle(a: f32, b: f32) -> f32 {
    let diff = (a - b).abs().rem_euclid(TAU);
    diff.min(TAU - diff)
}

/// Moves `from` toward `to` by at most `max_step`, never overshooting.
#[must_use]
pub fn step_toward(from: WorldPos, to: WorldPos, max_step: f32) -> WorldPos {
    let offset = to - from;
    let dist = offset.length();
    if dist <= max_step || dist <= f32::EPSILON {
        to
    } else {
        from + offset / dist * max_step.max(0.0)
    }
}

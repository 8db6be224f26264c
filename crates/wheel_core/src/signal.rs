//! Pure math for grip interaction: stillness, braking, deceleration, slopes.
//!
//! # Design Principles
//!
//! - **Pure functions**: No ECS, no physics engine, just `Vec3` math
//! - **Testable**: Each monitor's decision rule can be checked in isolation
//!
//! The monitors in this crate are thin loops around these functions.

use bevy::math::{Quat, Vec3};

/// Linearly map `value` from `[from_low, from_high]` to `[to_low, to_high]`.
///
/// Not clamped: values outside the source range extrapolate.
pub fn remap(value: f32, from_low: f32, from_high: f32, to_low: f32, to_high: f32) -> f32 {
    (value - from_low) / (from_high - from_low) * (to_high - to_low) + to_low
}

/// Like [`remap`], but the normalized position is clamped to `[0, 1]` first.
pub fn remap_clamped(value: f32, from_low: f32, from_high: f32, to_low: f32, to_high: f32) -> f32 {
    let t = ((value - from_low) / (from_high - from_low)).clamp(0.0, 1.0);
    to_low + (to_high - to_low) * t
}

/// Component of `velocity` along `axis` (assumed unit length).
pub fn axis_component(velocity: Vec3, axis: Vec3) -> f32 {
    velocity.dot(axis)
}

/// A hand is stationary when its forward speed is strictly below `threshold`.
pub fn is_stationary(forward_speed: f32, threshold: f32) -> bool {
    forward_speed.abs() < threshold
}

/// Braking torque opposing the wheel's spin.
///
/// Returns `None` when the spin magnitude is at or below `spin_epsilon`,
/// so an almost still wheel never receives a torque kick and a near-zero
/// vector is never normalized.
pub fn brake_torque(angular_velocity: Vec3, brake_force: f32, spin_epsilon: f32) -> Option<Vec3> {
    if angular_velocity.length() <= spin_epsilon {
        return None;
    }
    Some(-angular_velocity.normalize() * brake_force)
}

/// Wheel spin about its local primary axis, as a vector along local X.
///
/// # Arguments
/// * `world_angular_velocity` - Angular velocity in world space
/// * `wheel_rotation` - Current wheel orientation
/// * `local_axis` - Wheel-local rotation axis (unit length)
pub fn axis_angular_velocity(world_angular_velocity: Vec3, wheel_rotation: Quat, local_axis: Vec3) -> Vec3 {
    let local = wheel_rotation.inverse() * world_angular_velocity;
    Vec3::new(local.dot(local_axis), 0.0, 0.0)
}

/// Finite-difference angular acceleration over one sampling interval.
pub fn angular_acceleration(current: Vec3, previous: Vec3, interval: f32) -> Vec3 {
    if interval <= 0.0 {
        return Vec3::ZERO;
    }
    (current - previous) / interval
}

/// True when the wheel is spinning faster than `velocity_epsilon` and
/// its acceleration points against its velocity.
pub fn is_decelerating(velocity: Vec3, acceleration: Vec3, velocity_epsilon: f32) -> bool {
    if velocity.length() <= velocity_epsilon {
        return false;
    }
    velocity
        .normalize_or_zero()
        .dot(acceleration.normalize_or_zero())
        < 0.0
}

/// Haptic amplitude for a deceleration, in `[0, 1]`.
///
/// Returns `None` when the magnitude does not exceed `min_threshold`.
pub fn impulse_amplitude(acceleration: Vec3, min_threshold: f32, max_value: f32) -> Option<f32> {
    let magnitude = acceleration.x.abs();
    if magnitude <= min_threshold {
        return None;
    }
    Some(remap_clamped(magnitude, min_threshold, max_value, 0.0, 1.0))
}

/// Squared distance at which a grip is forcibly released.
pub fn release_distance_squared(wheel_radius: f32, deselection_threshold: f32) -> f32 {
    let limit = wheel_radius + deselection_threshold;
    limit * limit
}

/// True when `hand` has moved at least `limit_squared` (squared) away from `center`.
pub fn exceeds_release_distance(center: Vec3, hand: Vec3, limit_squared: f32) -> bool {
    center.distance_squared(hand) >= limit_squared
}

/// Angle between `normal` and world up, in degrees.
pub fn slope_angle_degrees(normal: Vec3) -> f32 {
    let n = normal.normalize_or_zero();
    if n == Vec3::ZERO {
        return 0.0;
    }
    n.angle_between(Vec3::Y).to_degrees()
}

/// Project `point` onto the sphere of `radius` around `center`.
///
/// Falls back to `point` itself when it coincides with the center.
pub fn project_onto_surface(center: Vec3, point: Vec3, radius: f32) -> Vec3 {
    match (point - center).try_normalize() {
        Some(direction) => center + direction * radius,
        None => point,
    }
}

/// Exponential smoothing step: move `previous` toward `sample` by `factor`.
pub fn smooth(previous: Vec3, sample: Vec3, factor: f32) -> Vec3 {
    previous.lerp(sample, factor.clamp(0.0, 1.0))
}

/// Velocity from two positions `dt` seconds apart, or `None` if `dt` is not positive.
pub fn finite_difference(previous: Vec3, current: Vec3, dt: f32) -> Option<Vec3> {
    (dt > 0.0).then(|| (current - previous) / dt)
}

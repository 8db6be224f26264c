//! Tunable parameters for grip interaction on a wheel.
//!
//! Values load from JSON (every field optional) and are clamped into the
//! ranges the interaction was tuned for:
//!
//! ```ignore
//! let config = WheelInteractionConfig::load("config/wheel.json")?;
//! ```

use std::fs;
use std::path::Path;

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{InteractionError, InteractionResult};

/// Where the proxy anchor is placed when a grip engages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnchorPlacement {
    /// Exactly at the effector's current position.
    AtEffector,
    /// Projected onto the wheel surface along center -> effector.
    #[default]
    WheelSurface,
}

/// When the effector takes over the freshly spawned anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnchorHandoff {
    /// Select the anchor in the same step it is spawned.
    #[default]
    Immediate,
    /// Wait one frame step, cancel the wheel's selection, then select the anchor.
    Deferred,
}

/// Configuration for one wheel's grab session controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelInteractionConfig {
    /// Forward-axis hand speed below which the hand counts as stationary (m/s)
    pub stationary_threshold: f32,
    /// Magnitude of the braking torque (N*m)
    pub brake_force: f32,
    /// Wheel spin below which no brake torque is applied (rad/s)
    pub brake_spin_epsilon: f32,
    /// Re-spawn the anchor at the moment a brake is applied
    pub reanchor_on_brake: bool,
    /// Effector-space axis whose velocity component decides stillness
    pub forward_axis: Vec3,

    /// Extra distance beyond the wheel radius before a forced release (m)
    pub deselection_threshold: f32,
    /// Seconds between distance checks
    pub distance_check_interval: f32,

    /// Emit haptic impulses on deceleration
    pub haptics_enabled: bool,
    /// Seconds between angular velocity samples
    pub haptic_interval: f32,
    /// Angular deceleration at or below which no impulse is sent (rad/s^2)
    pub haptic_min_threshold: f32,
    /// Angular deceleration mapped to full amplitude (rad/s^2)
    pub haptic_max_value: f32,
    /// Spin below which deceleration is not evaluated (rad/s)
    pub haptic_velocity_epsilon: f32,
    /// Wheel-local axis the wheel rolls around
    pub wheel_axis: Vec3,

    /// Run the ground slope monitor
    pub slope_enabled: bool,
    /// Ground tilt above which the wheel is on a slope (degrees)
    pub slope_angle_threshold: f32,
    /// Seconds between slope probes
    pub slope_check_interval: f32,
    /// Ray length as a multiple of the wheel radius
    pub slope_ray_multiplier: f32,

    /// Mass of the proxy anchor body (kg)
    pub anchor_mass: f32,
    pub anchor_placement: AnchorPlacement,
    pub anchor_handoff: AnchorHandoff,
}

impl Default for WheelInteractionConfig {
    fn default() -> Self {
        Self {
            stationary_threshold: 0.05,
            brake_force: 25.0,
            brake_spin_epsilon: 0.1,
            reanchor_on_brake: false,
            forward_axis: Vec3::Z,
            deselection_threshold: 0.25,
            distance_check_interval: 0.05,
            haptics_enabled: true,
            haptic_interval: 0.1,
            haptic_min_threshold: 1.5,
            haptic_max_value: 40.0,
            haptic_velocity_epsilon: 0.1,
            wheel_axis: Vec3::X,
            slope_enabled: true,
            slope_angle_threshold: 1.0,
            slope_check_interval: 0.2,
            slope_ray_multiplier: 2.0,
            anchor_mass: 0.1,
            anchor_placement: AnchorPlacement::WheelSurface,
            anchor_handoff: AnchorHandoff::Immediate,
        }
    }
}

impl WheelInteractionConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> InteractionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> InteractionResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Clamp every option into its supported range.
    ///
    /// Fails on non-finite numbers, zero-length axes, and haptic ranges
    /// that are empty after clamping.
    pub fn validated(mut self) -> InteractionResult<Self> {
        let scalars = [
            ("stationary_threshold", self.stationary_threshold),
            ("brake_force", self.brake_force),
            ("brake_spin_epsilon", self.brake_spin_epsilon),
            ("deselection_threshold", self.deselection_threshold),
            ("distance_check_interval", self.distance_check_interval),
            ("haptic_interval", self.haptic_interval),
            ("haptic_min_threshold", self.haptic_min_threshold),
            ("haptic_max_value", self.haptic_max_value),
            ("haptic_velocity_epsilon", self.haptic_velocity_epsilon),
            ("slope_angle_threshold", self.slope_angle_threshold),
            ("slope_check_interval", self.slope_check_interval),
            ("slope_ray_multiplier", self.slope_ray_multiplier),
            ("anchor_mass", self.anchor_mass),
        ];
        if let Some((name, value)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(InteractionError::InvalidConfig(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }

        self.forward_axis = unit_axis("forward_axis", self.forward_axis)?;
        self.wheel_axis = unit_axis("wheel_axis", self.wheel_axis)?;

        self.stationary_threshold = clamp_stationary_threshold(self.stationary_threshold);
        self.brake_force = clamp_brake_force(self.brake_force);
        self.brake_spin_epsilon = self.brake_spin_epsilon.max(0.0);
        self.deselection_threshold = clamp_deselection_threshold(self.deselection_threshold);
        self.distance_check_interval = clamp_distance_interval(self.distance_check_interval);
        self.haptic_interval = clamp_haptic_interval(self.haptic_interval);
        self.haptic_min_threshold = clamp_haptic_min(self.haptic_min_threshold);
        self.haptic_max_value = clamp_haptic_max(self.haptic_max_value);
        self.haptic_velocity_epsilon = self.haptic_velocity_epsilon.max(0.0);
        self.slope_angle_threshold = clamp_slope_threshold(self.slope_angle_threshold);
        self.slope_check_interval = clamp_slope_interval(self.slope_check_interval);
        self.slope_ray_multiplier = clamp_slope_multiplier(self.slope_ray_multiplier);

        if self.anchor_mass <= 0.0 {
            return Err(InteractionError::InvalidConfig(format!(
                "anchor_mass must be positive, got {}",
                self.anchor_mass
            )));
        }
        if self.haptic_max_value <= self.haptic_min_threshold {
            return Err(InteractionError::InvalidConfig(format!(
                "haptic_max_value ({}) must exceed haptic_min_threshold ({})",
                self.haptic_max_value, self.haptic_min_threshold
            )));
        }
        Ok(self)
    }
}

fn unit_axis(name: &str, axis: Vec3) -> InteractionResult<Vec3> {
    if !axis.is_finite() {
        return Err(InteractionError::InvalidConfig(format!(
            "{} must be finite, got {:?}",
            name, axis
        )));
    }
    axis.try_normalize()
        .ok_or_else(|| InteractionError::InvalidConfig(format!("{} must be non-zero", name)))
}

// Range clamps shared by `validated` and the controller's runtime setters.

pub(crate) fn clamp_stationary_threshold(v: f32) -> f32 {
    v.clamp(0.01, 0.2)
}

pub(crate) fn clamp_brake_force(v: f32) -> f32 {
    v.clamp(1.0, 50.0)
}

pub(crate) fn clamp_deselection_threshold(v: f32) -> f32 {
    v.clamp(0.0, 0.5)
}

pub(crate) fn clamp_distance_interval(v: f32) -> f32 {
    v.clamp(0.01, 0.1)
}

pub(crate) fn clamp_haptic_interval(v: f32) -> f32 {
    v.clamp(0.05, 0.2)
}

pub(crate) fn clamp_haptic_min(v: f32) -> f32 {
    v.clamp(1.0, 50.0)
}

pub(crate) fn clamp_haptic_max(v: f32) -> f32 {
    v.clamp(10.0, 100.0)
}

pub(crate) fn clamp_slope_threshold(v: f32) -> f32 {
    v.clamp(0.1, 10.0)
}

pub(crate) fn clamp_slope_interval(v: f32) -> f32 {
    v.clamp(0.1, 1.0)
}

pub(crate) fn clamp_slope_multiplier(v: f32) -> f32 {
    v.clamp(1.0, 5.0)
}

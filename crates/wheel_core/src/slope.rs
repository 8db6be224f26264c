//! Ground slope sensing beneath a wheel.
//!
//! Independent of grips: runs from controller construction until the
//! wheel is disabled. The `on_slope` flag is sticky and a sample is only
//! reported when the flag flips.

use bevy::log::info;
use bevy::math::Vec3;

use crate::config::{clamp_slope_interval, clamp_slope_multiplier, clamp_slope_threshold, WheelInteractionConfig};
use crate::schedule::{Cadence, PollClock, PollTask, Step};
use crate::signal::slope_angle_degrees;
use crate::world::{BodyId, WheelWorld};

/// One ground probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeSample {
    pub on_slope: bool,
    /// Tilt of the ground from horizontal, in degrees (0 when nothing was hit)
    pub angle: f32,
    /// Ground normal, or world up when nothing was hit
    pub surface_normal: Vec3,
    pub contact_point: Option<Vec3>,
}

#[derive(Debug)]
pub struct SlopeMonitor {
    task: Option<PollTask>,
    on_slope: bool,
    wheel_radius: f32,
    threshold: f32,
    interval: f32,
    ray_multiplier: f32,
}

impl SlopeMonitor {
    pub fn new(wheel_radius: f32, config: &WheelInteractionConfig) -> Self {
        Self {
            task: None,
            on_slope: false,
            wheel_radius,
            threshold: config.slope_angle_threshold,
            interval: config.slope_check_interval,
            ray_multiplier: config.slope_ray_multiplier,
        }
    }

    /// Begin probing; the first probe runs on the next frame step.
    pub fn start(&mut self) {
        self.stop();
        self.task = Some(PollTask::new(PollClock::immediate(Cadence::Every(self.interval))));
    }

    /// Stop probing. The last known flag is kept.
    pub fn stop(&mut self) {
        self.task = None;
    }

    /// Cast straight down from the wheel center without touching the flag.
    ///
    /// Returns `None` only if the wheel body is gone.
    pub fn probe(&self, world: &dyn WheelWorld, wheel: BodyId) -> Option<SlopeSample> {
        let center = world.body_state(wheel)?.position;
        let max_distance = self.wheel_radius * self.ray_multiplier;
        let sample = match world.cast_ray(center, Vec3::NEG_Y, max_distance, Some(wheel)) {
            Some(hit) => {
                let angle = slope_angle_degrees(hit.normal);
                SlopeSample {
                    on_slope: angle > self.threshold,
                    angle,
                    surface_normal: hit.normal,
                    contact_point: Some(hit.point),
                }
            }
            None => SlopeSample {
                on_slope: false,
                angle: 0.0,
                surface_normal: Vec3::Y,
                contact_point: None,
            },
        };
        Some(sample)
    }

    /// Run one poll. Returns a sample only when the flag changed.
    pub fn tick(&mut self, step: Step, world: &dyn WheelWorld, wheel: BodyId) -> Option<SlopeSample> {
        if !self.task.as_mut()?.due(step) {
            return None;
        }
        let sample = self.probe(world, wheel)?;
        if sample.on_slope == self.on_slope {
            return None;
        }
        self.on_slope = sample.on_slope;
        if sample.on_slope {
            info!("Wheel {:?} on slope ({:.1} degrees)", wheel, sample.angle);
        } else {
            info!("Wheel {:?} on level ground", wheel);
        }
        Some(sample)
    }

    pub fn on_slope(&self) -> bool {
        self.on_slope
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn set_threshold(&mut self, degrees: f32) {
        self.threshold = clamp_slope_threshold(degrees);
    }

    pub fn set_interval(&mut self, interval: f32) {
        self.interval = clamp_slope_interval(interval);
        if let Some(task) = self.task.as_mut() {
            task.clock_mut().set_interval(self.interval);
        }
    }

    pub fn set_ray_multiplier(&mut self, multiplier: f32) {
        self.ray_multiplier = clamp_slope_multiplier(multiplier);
    }

    pub fn ray_multiplier(&self) -> f32 {
        self.ray_multiplier
    }
}

//! Hand velocity estimation.
//!
//! A [`VelocitySource`] turns tracking samples into a velocity estimate.
//! [`VelocitySupplier`] is the standard implementation: it prefers the
//! device-reported velocity, falls back to finite differences of successive
//! positions, and optionally smooths the result with an exponential blend.
//!
//! Consumers must treat "not ready" as "no velocity data", never as zero.

use bevy::log::{error, info};
use bevy::math::{Quat, Vec3};

use crate::signal::{finite_difference, smooth};

/// One tracking reading for an effector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingSample {
    /// Timeline time in seconds
    pub time: f32,
    /// Tracked position, or `None` while tracking is lost
    pub position: Option<Vec3>,
    /// Tracked orientation, if the tracker reports one
    pub rotation: Option<Quat>,
    /// Velocity reported by the tracking device, if it reports one
    pub device_velocity: Option<Vec3>,
}

/// Capability: the effector can report how fast it moves.
pub trait VelocitySource {
    /// Feed the latest tracking reading.
    fn sample(&mut self, sample: &TrackingSample);

    /// Current estimate, or `None` while not ready.
    fn velocity(&self) -> Option<Vec3>;

    /// Whether at least one valid reading has been produced.
    fn is_ready(&self) -> bool;
}

/// Settings for [`VelocitySupplier`].
#[derive(Debug, Clone, PartialEq)]
pub struct VelocitySupplierConfig {
    pub smoothing_enabled: bool,
    /// Blend factor toward each new reading (0 = frozen, 1 = raw)
    pub smoothing_factor: f32,
    /// Minimum seconds between recomputations
    pub update_interval: f32,
    /// Seconds to wait for a first valid reading before giving up
    pub initialization_timeout: f32,
}

impl Default for VelocitySupplierConfig {
    fn default() -> Self {
        Self {
            smoothing_enabled: true,
            smoothing_factor: 0.3,
            update_interval: 0.02,
            initialization_timeout: 10.0,
        }
    }
}

impl VelocitySupplierConfig {
    /// Unsmoothed, recomputed on every sample.
    pub fn raw() -> Self {
        Self {
            smoothing_enabled: false,
            update_interval: 0.0,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct VelocitySupplier {
    config: VelocitySupplierConfig,
    raw: Vec3,
    smoothed: Vec3,
    last_position: Option<(Vec3, f32)>,
    last_update: Option<f32>,
    started_at: Option<f32>,
    ready: bool,
    timed_out: bool,
}

impl VelocitySupplier {
    pub fn new(mut config: VelocitySupplierConfig) -> Self {
        config.smoothing_factor = config.smoothing_factor.clamp(0.0, 1.0);
        config.update_interval = config.update_interval.max(0.0);
        Self {
            config,
            raw: Vec3::ZERO,
            smoothed: Vec3::ZERO,
            last_position: None,
            last_update: None,
            started_at: None,
            ready: false,
            timed_out: false,
        }
    }

    /// Unfiltered velocity of the last recomputation.
    pub fn raw_velocity(&self) -> Vec3 {
        self.raw
    }

    pub fn config(&self) -> &VelocitySupplierConfig {
        &self.config
    }

    pub fn set_smoothing(&mut self, enabled: bool, factor: f32) {
        self.config.smoothing_enabled = enabled;
        self.config.smoothing_factor = factor.clamp(0.0, 1.0);
    }

    /// True once the initialization timeout passed without a valid reading.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

impl Default for VelocitySupplier {
    fn default() -> Self {
        Self::new(VelocitySupplierConfig::default())
    }
}

impl VelocitySource for VelocitySupplier {
    fn sample(&mut self, sample: &TrackingSample) {
        let started = *self.started_at.get_or_insert(sample.time);
        if let Some(last) = self.last_update {
            if sample.time - last < self.config.update_interval {
                return;
            }
        }

        let reading = sample.device_velocity.or_else(|| {
            let (previous, at) = self.last_position?;
            finite_difference(previous, sample.position?, sample.time - at)
        });
        if let Some(position) = sample.position {
            self.last_position = Some((position, sample.time));
        }
        self.last_update = Some(sample.time);

        if self.timed_out {
            return;
        }
        match reading {
            Some(v) => {
                self.raw = v;
                self.smoothed = if self.config.smoothing_enabled {
                    smooth(self.smoothed, v, self.config.smoothing_factor)
                } else {
                    v
                };
                if !self.ready {
                    self.ready = true;
                    info!("Velocity supplier ready after {:.2}s", sample.time - started);
                }
            }
            None => {
                if !self.ready && sample.time - started > self.config.initialization_timeout {
                    self.timed_out = true;
                    error!(
                        "No valid tracking velocity within {}s; continuing without velocity",
                        self.config.initialization_timeout
                    );
                }
            }
        }
    }

    fn velocity(&self) -> Option<Vec3> {
        self.ready.then(|| {
            if self.config.smoothing_enabled {
                self.smoothed
            } else {
                self.raw
            }
        })
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f32, position: Option<Vec3>, device_velocity: Option<Vec3>) -> TrackingSample {
        TrackingSample {
            time,
            position,
            rotation: None,
            device_velocity,
        }
    }

    #[test]
    fn test_not_ready_means_no_velocity() {
        let supplier = VelocitySupplier::default();
        assert!(!supplier.is_ready());
        assert_eq!(supplier.velocity(), None);
    }

    #[test]
    fn test_device_velocity_used_directly() {
        let mut supplier = VelocitySupplier::new(VelocitySupplierConfig::raw());
        supplier.sample(&sample(0.0, Some(Vec3::ZERO), Some(Vec3::new(0.0, 0.0, 0.4))));
        assert!(supplier.is_ready());
        assert_eq!(supplier.velocity(), Some(Vec3::new(0.0, 0.0, 0.4)));
    }

    #[test]
    fn test_finite_difference_fallback() {
        let mut supplier = VelocitySupplier::new(VelocitySupplierConfig::raw());
        supplier.sample(&sample(0.0, Some(Vec3::ZERO), None));
        assert!(!supplier.is_ready(), "a single position gives no velocity");

        supplier.sample(&sample(0.1, Some(Vec3::new(0.0, 0.0, 0.05)), None));
        let v = supplier.velocity().unwrap();
        assert!((v.z - 0.5).abs() < 1e-4, "got {:?}", v);
    }

    #[test]
    fn test_smoothing_blends_toward_reading() {
        let mut supplier = VelocitySupplier::new(VelocitySupplierConfig {
            update_interval: 0.0,
            ..Default::default()
        });
        supplier.sample(&sample(0.0, Some(Vec3::ZERO), Some(Vec3::new(1.0, 0.0, 0.0))));
        let first = supplier.velocity().unwrap();
        assert!((first.x - 0.3).abs() < 1e-6);
        assert_eq!(supplier.raw_velocity(), Vec3::new(1.0, 0.0, 0.0));

        supplier.sample(&sample(0.1, Some(Vec3::ZERO), Some(Vec3::new(1.0, 0.0, 0.0))));
        let second = supplier.velocity().unwrap();
        assert!((second.x - 0.51).abs() < 1e-5, "got {}", second.x);
    }

    #[test]
    fn test_update_interval_rate_limits() {
        let mut supplier = VelocitySupplier::new(VelocitySupplierConfig {
            smoothing_enabled: false,
            update_interval: 0.02,
            ..Default::default()
        });
        supplier.sample(&sample(0.0, Some(Vec3::ZERO), Some(Vec3::X)));
        supplier.sample(&sample(0.01, Some(Vec3::ZERO), Some(Vec3::Y)));
        assert_eq!(supplier.velocity(), Some(Vec3::X), "too soon to recompute");
        supplier.sample(&sample(0.03, Some(Vec3::ZERO), Some(Vec3::Y)));
        assert_eq!(supplier.velocity(), Some(Vec3::Y));
    }

    #[test]
    fn test_lost_tracking_gives_no_reading() {
        let mut supplier = VelocitySupplier::new(VelocitySupplierConfig::raw());
        supplier.sample(&sample(0.0, None, None));
        supplier.sample(&sample(0.5, None, None));
        assert!(!supplier.is_ready());

        supplier.sample(&sample(0.6, Some(Vec3::ZERO), None));
        supplier.sample(&sample(0.8, Some(Vec3::new(0.2, 0.0, 0.0)), None));
        let v = supplier.velocity().unwrap();
        assert!((v.x - 1.0).abs() < 1e-4, "got {:?}", v);
    }

    #[test]
    fn test_initialization_timeout_is_final() {
        let mut supplier = VelocitySupplier::new(VelocitySupplierConfig {
            initialization_timeout: 1.0,
            ..VelocitySupplierConfig::raw()
        });
        supplier.sample(&sample(0.0, None, None));
        supplier.sample(&sample(1.5, None, None));
        assert!(supplier.timed_out());

        supplier.sample(&sample(2.0, Some(Vec3::ZERO), Some(Vec3::X)));
        assert!(!supplier.is_ready(), "a supplier that timed out stays without velocity");
        assert_eq!(supplier.velocity(), None);
    }
}

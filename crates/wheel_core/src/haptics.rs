//! Deceleration haptics.
//!
//! Samples the wheel's spin about its rolling axis at a fixed interval.
//! When the spin slows down hard enough, the gripping hand gets a pulse
//! whose strength scales with the deceleration.

use bevy::log::{debug, warn};
use bevy::math::Vec3;

use crate::config::{clamp_haptic_interval, clamp_haptic_max, clamp_haptic_min, WheelInteractionConfig};
use crate::effector::{EffectorId, Effectors, HapticImpulse};
use crate::schedule::{Cadence, CancellationToken, PollClock, PollTask, Step};
use crate::signal::{angular_acceleration, axis_angular_velocity, impulse_amplitude, is_decelerating};
use crate::world::{BodyId, SessionGuard, WheelWorld};

#[derive(Debug)]
pub struct HapticFeedbackMonitor {
    task: Option<PollTask>,
    effector: Option<EffectorId>,
    previous: Vec3,
    interval: f32,
    min_threshold: f32,
    max_value: f32,
    velocity_epsilon: f32,
    wheel_axis: Vec3,
}

impl HapticFeedbackMonitor {
    pub fn new(config: &WheelInteractionConfig) -> Self {
        Self {
            task: None,
            effector: None,
            previous: Vec3::ZERO,
            interval: config.haptic_interval,
            min_threshold: config.haptic_min_threshold,
            max_value: config.haptic_max_value,
            velocity_epsilon: config.haptic_velocity_epsilon,
            wheel_axis: config.wheel_axis,
        }
    }

    /// Start sampling for `effector`, seeded with the wheel's current spin.
    /// Runs until stopped or `session` is cancelled.
    ///
    /// An effector without a haptic sink is still sampled; pulses are dropped.
    pub fn start(
        &mut self,
        effector: EffectorId,
        world: &dyn WheelWorld,
        wheel: BodyId,
        effectors: &Effectors,
        session: CancellationToken,
    ) {
        self.stop();
        if !effectors.get(effector).is_some_and(|e| e.has_haptics()) {
            warn!("Effector {:?} has no haptic output; feedback will be silent", effector);
        }
        self.previous = self.axis_velocity(world, wheel).unwrap_or(Vec3::ZERO);
        self.task = Some(PollTask::linked(PollClock::delayed(Cadence::Every(self.interval)), session));
        self.effector = Some(effector);
    }

    pub fn stop(&mut self) {
        self.task = None;
        self.effector = None;
    }

    fn axis_velocity(&self, world: &dyn WheelWorld, wheel: BodyId) -> Option<Vec3> {
        let state = world.body_state(wheel)?;
        Some(axis_angular_velocity(state.angular_velocity, state.rotation, self.wheel_axis))
    }

    /// Run one poll. Returns the impulse delivered to the effector, if any.
    pub fn tick(
        &mut self,
        step: Step,
        guard: &dyn SessionGuard,
        world: &dyn WheelWorld,
        wheel: BodyId,
        effectors: &mut Effectors,
    ) -> Option<HapticImpulse> {
        match &self.task {
            None => return None,
            Some(task) if task.is_cancelled() => {
                self.stop();
                return None;
            }
            Some(_) => {}
        }
        if !guard.is_active() {
            self.stop();
            return None;
        }
        if !self.task.as_mut()?.due(step) {
            return None;
        }
        let current = self.axis_velocity(world, wheel)?;
        let acceleration = angular_acceleration(current, self.previous, self.interval);
        self.previous = current;

        if !is_decelerating(current, acceleration, self.velocity_epsilon) {
            return None;
        }
        let amplitude = impulse_amplitude(acceleration, self.min_threshold, self.max_value)?;
        let impulse = HapticImpulse {
            amplitude,
            duration: self.interval * 2.0,
            channel: 0,
        };
        let sink = effectors.get_mut(self.effector?)?.haptic_sink()?;
        sink.send_impulse(impulse);
        debug!("Haptic pulse {:.3} for deceleration {:.2}", amplitude, acceleration.length());
        Some(impulse)
    }

    /// Takes effect on the running task as well.
    pub fn set_interval(&mut self, interval: f32) {
        self.interval = clamp_haptic_interval(interval);
        if let Some(task) = self.task.as_mut() {
            task.clock_mut().set_interval(self.interval);
        }
    }

    /// Update the amplitude range. Ignored (returns false) if it would be empty.
    pub fn set_thresholds(&mut self, min_threshold: f32, max_value: f32) -> bool {
        let min = clamp_haptic_min(min_threshold);
        let max = clamp_haptic_max(max_value);
        if max <= min {
            warn!("Ignoring haptic range {}..{}: max must exceed min", min, max);
            return false;
        }
        self.min_threshold = min;
        self.max_value = max;
        true
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn thresholds(&self) -> (f32, f32) {
        (self.min_threshold, self.max_value)
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effector::GripEffector;
    use crate::testing::{tracked_hand, FakeWorld};
    use bevy::math::Quat;

    struct Held;

    impl SessionGuard for Held {
        fn is_active(&self) -> bool {
            true
        }
    }

    const INTERVAL: f32 = 0.1;

    fn setup(spin: f32) -> (FakeWorld, BodyId, Effectors, HapticFeedbackMonitor) {
        let mut world = FakeWorld::new();
        let wheel = world.add_wheel(Vec3::ZERO, 0.5);
        world.set_angular_velocity(wheel, Vec3::new(spin, 0.0, 0.0));
        (world, wheel, Effectors::new(), HapticFeedbackMonitor::new(&WheelInteractionConfig::default()))
    }

    #[test]
    fn test_deceleration_sends_scaled_pulse() {
        let (mut world, wheel, mut effectors, mut monitor) = setup(5.0);
        let (hand, recorder) = tracked_hand(&mut effectors, Vec3::ZERO);
        monitor.start(hand, &world, wheel, &effectors, CancellationToken::new());

        // 5.0 -> 3.0 over 0.1s is -20 rad/s^2
        world.set_angular_velocity(wheel, Vec3::new(3.0, 0.0, 0.0));
        assert!(monitor.tick(Step::Frame(0.05), &Held, &world, wheel, &mut effectors).is_none());
        let impulse = monitor
            .tick(Step::Frame(0.05), &Held, &world, wheel, &mut effectors)
            .unwrap();

        assert!((impulse.amplitude - 0.4805).abs() < 1e-3, "got {}", impulse.amplitude);
        assert!((impulse.duration - 0.2).abs() < 1e-6);
        assert_eq!(recorder.drain(), vec![impulse]);
    }

    #[test]
    fn test_small_deceleration_is_silent() {
        let (mut world, wheel, mut effectors, mut monitor) = setup(5.0);
        let (hand, recorder) = tracked_hand(&mut effectors, Vec3::ZERO);
        monitor.start(hand, &world, wheel, &effectors, CancellationToken::new());

        // -1 rad/s^2 is under the 1.5 minimum
        world.set_angular_velocity(wheel, Vec3::new(4.9, 0.0, 0.0));
        assert!(monitor.tick(Step::Frame(0.1), &Held, &world, wheel, &mut effectors).is_none());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_speeding_up_is_silent() {
        let (mut world, wheel, mut effectors, mut monitor) = setup(1.0);
        let (hand, recorder) = tracked_hand(&mut effectors, Vec3::ZERO);
        monitor.start(hand, &world, wheel, &effectors, CancellationToken::new());

        world.set_angular_velocity(wheel, Vec3::new(6.0, 0.0, 0.0));
        assert!(monitor.tick(Step::Frame(0.1), &Held, &world, wheel, &mut effectors).is_none());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_spin_measured_about_wheel_axis() {
        let (mut world, wheel, mut effectors, mut monitor) = setup(0.0);
        // Wheel yawed 90 degrees: its rolling axis now points along world -Z.
        world.set_rotation(wheel, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        world.set_angular_velocity(wheel, Vec3::new(0.0, 0.0, -5.0));
        let (hand, recorder) = tracked_hand(&mut effectors, Vec3::ZERO);
        monitor.start(hand, &world, wheel, &effectors, CancellationToken::new());

        world.set_angular_velocity(wheel, Vec3::new(0.0, 0.0, -1.0));
        assert!(monitor.tick(Step::Frame(0.1), &Held, &world, wheel, &mut effectors).is_some());
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_no_sink_keeps_sampling() {
        let (mut world, wheel, mut effectors, mut monitor) = setup(5.0);
        let bare = effectors.register(GripEffector::new("bare", Vec3::ZERO));
        monitor.start(bare, &world, wheel, &effectors, CancellationToken::new());

        world.set_angular_velocity(wheel, Vec3::new(1.0, 0.0, 0.0));
        assert!(monitor.tick(Step::Frame(0.1), &Held, &world, wheel, &mut effectors).is_none());
        assert!(monitor.is_active());
    }

    #[test]
    fn test_threshold_setter_rejects_empty_range() {
        let (_, _, _, mut monitor) = setup(0.0);
        assert!(!monitor.set_thresholds(50.0, 10.0));
        assert_eq!(monitor.thresholds(), (1.5, 40.0));
        assert!(monitor.set_thresholds(2.0, 60.0));
        assert_eq!(monitor.thresholds(), (2.0, 60.0));
        monitor.set_interval(INTERVAL * 10.0);
        assert_eq!(monitor.interval(), 0.2);
    }
}

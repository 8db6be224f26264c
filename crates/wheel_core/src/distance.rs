//! Distance-based auto-release.
//!
//! While a session is active the hand must stay within
//! `wheel_radius + deselection_threshold` of the wheel center. The first
//! check that finds it farther away forces a release and ends the monitor;
//! a new grip is needed to start it again.

use bevy::log::{debug, info};

use crate::config::{clamp_deselection_threshold, clamp_distance_interval};
use crate::effector::{EffectorId, Effectors};
use crate::schedule::{Cadence, CancellationToken, PollClock, PollTask, Step};
use crate::signal::{exceeds_release_distance, release_distance_squared};
use crate::world::{BodyId, SelectionSystem, SessionGuard, WheelWorld};

#[derive(Debug)]
pub struct DistanceMonitor {
    task: Option<PollTask>,
    effector: Option<EffectorId>,
    wheel_radius: f32,
    deselection_threshold: f32,
    interval: f32,
}

impl DistanceMonitor {
    pub fn new(wheel_radius: f32, deselection_threshold: f32, interval: f32) -> Self {
        Self {
            task: None,
            effector: None,
            wheel_radius,
            deselection_threshold: clamp_deselection_threshold(deselection_threshold),
            interval: clamp_distance_interval(interval),
        }
    }

    /// Start watching `effector` until stopped or `session` is cancelled.
    /// The first check runs on the next frame step.
    pub fn start(&mut self, effector: EffectorId, session: CancellationToken) {
        self.stop();
        self.task = Some(PollTask::linked(
            PollClock::immediate(Cadence::Every(self.interval)),
            session,
        ));
        self.effector = Some(effector);
    }

    pub fn stop(&mut self) {
        self.task = None;
        self.effector = None;
    }

    /// Run one poll. Returns the effector that was forced to let go.
    pub fn tick(
        &mut self,
        step: Step,
        guard: &dyn SessionGuard,
        world: &dyn WheelWorld,
        effectors: &Effectors,
        selection: &mut dyn SelectionSystem,
        wheel: BodyId,
    ) -> Option<EffectorId> {
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
        let effector = self.effector?;
        let Some(hand) = effectors.position(effector) else {
            debug!("Distance monitor stopping: effector {:?} is gone", effector);
            self.stop();
            return None;
        };
        let center = world.body_state(wheel)?.position;

        let limit = release_distance_squared(self.wheel_radius, self.deselection_threshold);
        if !exceeds_release_distance(center, hand, limit) {
            return None;
        }
        info!(
            "Effector {:?} moved {:.3} from wheel {:?} (limit {:.3}); forcing release",
            effector,
            center.distance(hand),
            wheel,
            self.current_threshold()
        );
        selection.force_release(effector);
        self.stop();
        Some(effector)
    }

    /// Release distance from the wheel center.
    pub fn current_threshold(&self) -> f32 {
        self.wheel_radius + self.deselection_threshold
    }

    /// Distance between the watched hand and the wheel center, if both exist.
    pub fn current_distance(&self, world: &dyn WheelWorld, effectors: &Effectors, wheel: BodyId) -> Option<f32> {
        let hand = effectors.position(self.effector?)?;
        let center = world.body_state(wheel)?.position;
        Some(center.distance(hand))
    }

    pub fn set_deselection_threshold(&mut self, threshold: f32) {
        self.deselection_threshold = clamp_deselection_threshold(threshold);
    }

    /// Takes effect on the running task as well.
    pub fn set_interval(&mut self, interval: f32) {
        self.interval = clamp_distance_interval(interval);
        if let Some(task) = self.task.as_mut() {
            task.clock_mut().set_interval(self.interval);
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_cancelled())
    }
}

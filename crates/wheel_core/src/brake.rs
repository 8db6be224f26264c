//! Stillness-triggered brake assist.
//!
//! Polled once per physics step while a session holds an anchor. When the
//! gripping hand stops moving along its forward axis, the wheel receives a
//! single counter-torque on that step. Staying still does not brake again;
//! the hand must move and stop once more.

use bevy::log::{debug, warn};
use bevy::math::Vec3;

use crate::config::{clamp_brake_force, clamp_stationary_threshold, WheelInteractionConfig};
use crate::effector::{EffectorId, Effectors};
use crate::schedule::{Cadence, CancellationToken, MonitorState, PollClock, PollTask, Step};
use crate::signal::{axis_component, brake_torque, is_stationary};
use crate::world::{BodyId, SessionGuard, WheelWorld};

/// What happened on a stationary rising edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrakeEvent {
    pub effector: EffectorId,
    /// Torque applied to the wheel, or `None` if it was already still
    pub torque: Option<Vec3>,
}

#[derive(Debug)]
pub struct BrakeAssistMonitor {
    task: Option<PollTask>,
    effector: Option<EffectorId>,
    was_stationary: bool,
    stationary_threshold: f32,
    brake_force: f32,
    spin_epsilon: f32,
    forward_axis: Vec3,
}

impl BrakeAssistMonitor {
    pub fn new(config: &WheelInteractionConfig) -> Self {
        Self {
            task: None,
            effector: None,
            was_stationary: false,
            stationary_threshold: config.stationary_threshold,
            brake_force: config.brake_force,
            spin_epsilon: config.brake_spin_epsilon,
            forward_axis: config.forward_axis,
        }
    }

    /// Start watching `effector` until stopped or `session` is cancelled.
    /// Restarts if already running.
    ///
    /// Declines to start (returns false) when the effector has no velocity source.
    pub fn start(&mut self, effector: EffectorId, effectors: &Effectors, session: CancellationToken) -> bool {
        self.stop();
        let has_velocity = effectors
            .get(effector)
            .is_some_and(|e| e.has_velocity_source());
        if !has_velocity {
            warn!("Brake assist disabled: effector {:?} has no velocity source", effector);
            return false;
        }
        self.task = Some(PollTask::linked(PollClock::immediate(Cadence::PhysicsStep), session));
        self.effector = Some(effector);
        self.was_stationary = false;
        true
    }

    pub fn stop(&mut self) {
        self.task = None;
        self.effector = None;
        self.was_stationary = false;
    }

    /// Run one poll. Applies the brake torque synchronously, so it lands
    /// before the physics step that follows.
    pub fn tick(
        &mut self,
        step: Step,
        guard: &dyn SessionGuard,
        effectors: &Effectors,
        world: &mut dyn WheelWorld,
        wheel: BodyId,
    ) -> Option<BrakeEvent> {
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
        let task = self.task.as_mut()?;
        if !task.due(step) {
            return None;
        }
        let effector_id = self.effector?;
        let Some(effector) = effectors.get(effector_id) else {
            debug!("Brake assist stopping: effector {:?} is gone", effector_id);
            self.stop();
            return None;
        };
        // Not ready is "no data": keep the previous classification.
        let velocity = effector.velocity_source()?.velocity()?;

        // forward_axis is in the hand's frame
        let forward = axis_component(velocity, effector.rotation * self.forward_axis);
        let stationary = is_stationary(forward, self.stationary_threshold);
        let rising = stationary && !self.was_stationary;
        self.was_stationary = stationary;
        if !rising {
            return None;
        }

        let angular_velocity = world.body_state(wheel)?.angular_velocity;
        let torque = brake_torque(angular_velocity, self.brake_force, self.spin_epsilon);
        if let Some(torque) = torque {
            world.apply_torque(wheel, torque);
            debug!("Brake torque {:?} on {:?}", torque, wheel);
        }
        Some(BrakeEvent {
            effector: effector_id,
            torque,
        })
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_cancelled())
    }

    pub fn state(&self) -> MonitorState {
        if self.is_active() {
            MonitorState::Running
        } else {
            MonitorState::Stopped
        }
    }

    pub fn set_stationary_threshold(&mut self, threshold: f32) {
        self.stationary_threshold = clamp_stationary_threshold(threshold);
    }

    pub fn set_brake_force(&mut self, force: f32) {
        self.brake_force = clamp_brake_force(force);
    }

    pub fn stationary_threshold(&self) -> f32 {
        self.stationary_threshold
    }

    pub fn brake_force(&self) -> f32 {
        self.brake_force
    }
}

//! Cooperative polling for monitor tasks.
//!
//! The host drives two timelines: a fixed-rate physics step and a
//! variable-rate frame step. A monitor declares a [`Cadence`] and asks its
//! [`PollClock`] on every step whether it is due. Tasks started for one
//! grip session share that session's [`CancellationToken`]; cancelling it
//! stops all of them at their next poll, never in the middle of a tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How often a task wants to run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cadence {
    /// Once per physics step.
    PhysicsStep,
    /// At most once per `interval` seconds of frame time.
    Every(f32),
    /// Exactly once, on the next frame step.
    NextFrame,
}

/// One step of the host timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Physics(f32),
    Frame(f32),
}

/// Shared stop flag for the tasks of one session.
///
/// Clones observe the same flag; cancelling is idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Run state of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    #[default]
    Stopped,
    Running,
}

/// Decides when a task with a given cadence is due.
#[derive(Debug, Clone)]
pub struct PollClock {
    cadence: Cadence,
    elapsed: f32,
    fired: bool,
}

impl PollClock {
    /// Clock whose first interval poll is due immediately.
    pub fn immediate(cadence: Cadence) -> Self {
        let elapsed = match cadence {
            Cadence::Every(interval) => interval,
            _ => 0.0,
        };
        Self {
            cadence,
            elapsed,
            fired: false,
        }
    }

    /// Clock whose first interval poll is due after one full interval.
    pub fn delayed(cadence: Cadence) -> Self {
        Self {
            cadence,
            elapsed: 0.0,
            fired: false,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Change the interval of an `Every` clock, keeping accumulated time.
    pub fn set_interval(&mut self, interval: f32) {
        if let Cadence::Every(_) = self.cadence {
            self.cadence = Cadence::Every(interval);
        }
    }

    /// Advance by `step` and report whether the task should run now.
    ///
    /// Interval clocks fire at most once per poll. The overshoot past the
    /// interval carries into the next one, but whole intervals that pile up
    /// across a long frame are dropped rather than replayed.
    pub fn poll(&mut self, step: Step) -> bool {
        match (self.cadence, step) {
            (Cadence::PhysicsStep, Step::Physics(_)) => true,
            (Cadence::Every(interval), Step::Frame(dt)) => {
                self.elapsed += dt;
                if self.elapsed >= interval {
                    self.elapsed = (self.elapsed - interval) % interval;
                    true
                } else {
                    false
                }
            }
            (Cadence::NextFrame, Step::Frame(_)) => {
                if self.fired {
                    false
                } else {
                    self.fired = true;
                    true
                }
            }
            _ => false,
        }
    }
}

/// A running task: its clock plus the token that can stop it.
#[derive(Debug, Clone)]
pub struct PollTask {
    token: CancellationToken,
    clock: PollClock,
}

impl PollTask {
    /// Task stopped only by dropping it.
    pub fn new(clock: PollClock) -> Self {
        Self::linked(clock, CancellationToken::new())
    }

    /// Task that also stops once `token` is cancelled.
    pub fn linked(clock: PollClock, token: CancellationToken) -> Self {
        Self { token, clock }
    }

    pub fn clock_mut(&mut self) -> &mut PollClock {
        &mut self.clock
    }

    /// Whether the task should run a tick for this step.
    ///
    /// A cancelled task is never due.
    pub fn due(&mut self, step: Step) -> bool {
        !self.token.is_cancelled() && self.clock.poll(step)
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_cadence_ignores_frames() {
        let mut clock = PollClock::immediate(Cadence::PhysicsStep);
        assert!(clock.poll(Step::Physics(0.02)));
        assert!(!clock.poll(Step::Frame(0.016)));
        assert!(clock.poll(Step::Physics(0.02)));
    }

    #[test]
    fn test_interval_immediate_then_spaced() {
        let mut clock = PollClock::immediate(Cadence::Every(0.05));
        assert!(clock.poll(Step::Frame(0.0)), "first poll is due at once");
        assert!(!clock.poll(Step::Frame(0.03)));
        assert!(clock.poll(Step::Frame(0.03)));
        assert!(!clock.poll(Step::Physics(1.0)), "physics steps do not advance wall time");
    }

    #[test]
    fn test_interval_delayed_and_no_catch_up() {
        let mut clock = PollClock::delayed(Cadence::Every(0.1));
        assert!(!clock.poll(Step::Frame(0.05)));
        assert!(clock.poll(Step::Frame(0.5)), "long frame fires once");
        assert!(!clock.poll(Step::Frame(0.01)), "backlog is dropped");
    }

    #[test]
    fn test_next_frame_fires_once() {
        let mut clock = PollClock::immediate(Cadence::NextFrame);
        assert!(!clock.poll(Step::Physics(0.02)));
        assert!(clock.poll(Step::Frame(0.016)));
        assert!(!clock.poll(Step::Frame(0.016)));
    }

    #[test]
    fn test_interval_keeps_overshoot() {
        let mut clock = PollClock::delayed(Cadence::Every(0.05));
        let fired = (0..101).filter(|_| clock.poll(Step::Frame(0.03))).count();
        // 3.03 s of frames at one fire per 0.05 s; resetting to zero would give 50
        assert_eq!(fired, 60);
    }

    #[test]
    fn test_cancelling_session_token_stops_linked_tasks() {
        let session = CancellationToken::new();
        let mut physics = PollTask::linked(PollClock::immediate(Cadence::PhysicsStep), session.clone());
        let mut frame = PollTask::linked(PollClock::immediate(Cadence::Every(0.05)), session.clone());
        let mut unrelated = PollTask::new(PollClock::immediate(Cadence::PhysicsStep));
        assert!(physics.due(Step::Physics(0.02)));
        assert!(frame.due(Step::Frame(0.0)));

        session.cancel();
        session.cancel();
        assert!(physics.is_cancelled());
        assert!(!physics.due(Step::Physics(0.02)));
        assert!(!frame.due(Step::Frame(1.0)));
        assert!(unrelated.due(Step::Physics(0.02)));
    }
}

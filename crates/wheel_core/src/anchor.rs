//! Proxy anchor ownership.
//!
//! The anchor is a light body rigidly coupled to the wheel. The effector
//! holds the anchor instead of the wheel, so hand motion reaches the wheel
//! only through the coupling.
//!
//! At most one anchor exists per wheel: the manager keeps it in a single
//! slot and always empties the slot before filling it again.

use bevy::log::{debug, warn};
use bevy::math::Vec3;

use crate::config::{AnchorHandoff, AnchorPlacement, WheelInteractionConfig};
use crate::effector::EffectorId;
use crate::schedule::{Cadence, PollClock, PollTask, Step};
use crate::signal::project_onto_surface;
use crate::world::{AnchorSpec, BodyId, Interactable, SelectionSystem, SessionGuard, WheelWorld};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AnchorSlot {
    body: BodyId,
    effector: EffectorId,
}

/// Creates, hands off and destroys the proxy anchor for one wheel.
#[derive(Debug)]
pub struct ProxyAnchorManager {
    wheel: BodyId,
    slot: Option<AnchorSlot>,
    pending_handoff: Option<PollTask>,
}

impl ProxyAnchorManager {
    pub fn new(wheel: BodyId) -> Self {
        Self {
            wheel,
            slot: None,
            pending_handoff: None,
        }
    }

    /// Replace any existing anchor with a fresh one for `effector`.
    ///
    /// Returns the new anchor, or `None` when the wheel body is gone.
    pub fn spawn_anchor(
        &mut self,
        world: &mut dyn WheelWorld,
        selection: &mut dyn SelectionSystem,
        effector: EffectorId,
        effector_position: Vec3,
        wheel_radius: f32,
        config: &WheelInteractionConfig,
    ) -> Option<BodyId> {
        self.cleanup_anchor(world, selection);

        let Some(wheel_state) = world.body_state(self.wheel) else {
            warn!("Cannot spawn anchor: wheel body {:?} is gone", self.wheel);
            return None;
        };
        let position = match config.anchor_placement {
            AnchorPlacement::AtEffector => effector_position,
            AnchorPlacement::WheelSurface => {
                project_onto_surface(wheel_state.position, effector_position, wheel_radius)
            }
        };
        let spec = AnchorSpec {
            wheel: self.wheel,
            position,
            rotation: wheel_state.rotation,
            mass: config.anchor_mass,
        };
        let body = world.spawn_anchor(&spec)?;
        self.slot = Some(AnchorSlot { body, effector });
        debug!("Spawned anchor {:?} at {:?} for {:?}", body, position, effector);

        match config.anchor_handoff {
            AnchorHandoff::Immediate => {
                selection.force_select(effector, Interactable::Anchor(body));
            }
            AnchorHandoff::Deferred => {
                self.pending_handoff = Some(PollTask::new(PollClock::immediate(Cadence::NextFrame)));
            }
        }
        Some(body)
    }

    /// Complete a deferred hand-off once its frame comes around.
    ///
    /// Returns true on the step the effector took over the anchor.
    pub fn frame_update(&mut self, selection: &mut dyn SelectionSystem, step: Step) -> bool {
        let Some(task) = self.pending_handoff.as_mut() else {
            return false;
        };
        if !task.due(step) {
            return false;
        }
        self.pending_handoff = None;
        let Some(slot) = self.slot else {
            return false;
        };
        selection.cancel_selection(Interactable::Wheel(self.wheel));
        selection.force_select(slot.effector, Interactable::Anchor(slot.body));
        true
    }

    /// Release and destroy the current anchor. Safe to call with no anchor.
    pub fn cleanup_anchor(&mut self, world: &mut dyn WheelWorld, selection: &mut dyn SelectionSystem) {
        self.pending_handoff = None;
        let Some(slot) = self.slot.take() else {
            return;
        };
        selection.cancel_selection(Interactable::Anchor(slot.body));
        world.despawn_anchor(slot.body);
        debug!("Cleaned up anchor {:?}", slot.body);
    }

    pub fn current_anchor(&self) -> Option<BodyId> {
        self.slot.map(|s| s.body)
    }

    pub fn has_active_anchor(&self) -> bool {
        self.slot.is_some()
    }

    pub fn handoff_pending(&self) -> bool {
        self.pending_handoff.is_some()
    }
}

impl SessionGuard for ProxyAnchorManager {
    fn is_active(&self) -> bool {
        self.has_active_anchor()
    }
}

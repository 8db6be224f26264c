//! Concrete selection system used by the Bevy plugin.
//!
//! Tracks which effector holds which interactable and pulls every held
//! anchor toward its effector once per physics step.

use std::collections::HashMap;

use bevy::log::debug;
use bevy::prelude::Resource;

use crate::effector::{EffectorId, Effectors};
use crate::world::{Interactable, SelectionSystem, WheelWorld};

#[derive(Resource, Debug, Default)]
pub struct SelectionState {
    held: HashMap<EffectorId, Interactable>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default grab: the effector directly selects what it touched.
    pub fn select(&mut self, effector: EffectorId, interactable: Interactable) {
        self.held.insert(effector, interactable);
    }

    /// Voluntary release by the effector.
    pub fn release(&mut self, effector: EffectorId) -> Option<Interactable> {
        self.held.remove(&effector)
    }

    pub fn selection(&self, effector: EffectorId) -> Option<Interactable> {
        self.held.get(&effector).copied()
    }

    pub fn holder_of(&self, interactable: Interactable) -> Option<EffectorId> {
        self.held
            .iter()
            .find(|(_, held)| **held == interactable)
            .map(|(effector, _)| *effector)
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Velocity-track each held anchor toward its effector. Runs before the
    /// physics step; the wheel follows through the anchor's coupling.
    pub fn drive_anchors(&self, world: &mut dyn WheelWorld, effectors: &Effectors, dt: f32) {
        for (effector, held) in &self.held {
            let Interactable::Anchor(anchor) = held else {
                continue;
            };
            if let Some(target) = effectors.position(*effector) {
                world.drive_toward(*anchor, target, dt);
            }
        }
    }
}

impl SelectionSystem for SelectionState {
    fn cancel_selection(&mut self, interactable: Interactable) {
        self.held.retain(|_, held| *held != interactable);
    }

    fn force_select(&mut self, effector: EffectorId, interactable: Interactable) {
        self.held.insert(effector, interactable);
    }

    fn force_release(&mut self, effector: EffectorId) {
        if let Some(held) = self.held.remove(&effector) {
            debug!("Forced {:?} to release {:?}", effector, held);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tracked_hand, FakeWorld};
    use crate::world::BodyId;
    use bevy::math::Vec3;

    #[test]
    fn test_force_select_replaces_selection() {
        let mut selection = SelectionState::new();
        let wheel = Interactable::Wheel(BodyId::new(0, 0));
        let anchor = Interactable::Anchor(BodyId::new(1, 0));

        selection.select(EffectorId(0), wheel);
        selection.cancel_selection(wheel);
        selection.force_select(EffectorId(0), anchor);

        assert_eq!(selection.selection(EffectorId(0)), Some(anchor));
        assert_eq!(selection.holder_of(wheel), None);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_cancel_and_release_are_idempotent() {
        let mut selection = SelectionState::new();
        let anchor = Interactable::Anchor(BodyId::new(1, 0));
        selection.force_select(EffectorId(2), anchor);

        selection.cancel_selection(anchor);
        selection.cancel_selection(anchor);
        selection.force_release(EffectorId(2));
        assert!(selection.is_empty());
        assert_eq!(selection.release(EffectorId(2)), None);
    }

    #[test]
    fn test_only_anchors_are_driven() {
        let mut world = FakeWorld::new();
        let mut effectors = Effectors::new();
        let (left, _) = tracked_hand(&mut effectors, Vec3::new(1.0, 0.0, 0.0));
        let (right, _) = tracked_hand(&mut effectors, Vec3::new(-1.0, 0.0, 0.0));

        let mut selection = SelectionState::new();
        selection.select(left, Interactable::Wheel(BodyId::new(0, 0)));
        selection.force_select(right, Interactable::Anchor(BodyId::new(5, 0)));
        selection.drive_anchors(&mut world, &effectors, 0.02);

        assert_eq!(world.driven, vec![(BodyId::new(5, 0), Vec3::new(-1.0, 0.0, 0.0))]);
    }
}

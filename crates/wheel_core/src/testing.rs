//! In-crate fakes for controller and monitor tests.

use std::collections::HashMap;

use bevy::math::{Quat, Vec3};

use crate::effector::{EffectorId, Effectors, GripEffector, HapticRecorder};
use crate::velocity::{TrackingSample, VelocitySupplier, VelocitySupplierConfig};
use crate::world::{
    AnchorSpec, BodyId, BodyState, GroundHit, Interactable, SelectionSystem, WheelWorld,
};

#[derive(Debug, Clone)]
struct FakeBody {
    state: BodyState,
    radius: Option<f32>,
    anchor: Option<AnchorSpec>,
}

/// A physics world with no integration: bodies hold whatever state tests set.
#[derive(Debug, Default)]
pub(crate) struct FakeWorld {
    bodies: HashMap<BodyId, FakeBody>,
    next_index: u32,
    /// Flat ground height and its surface normal, if any
    pub ground: Option<(f32, Vec3)>,
    pub torques: Vec<(BodyId, Vec3)>,
    pub despawned: Vec<BodyId>,
    pub driven: Vec<(BodyId, Vec3)>,
    pub max_live_anchors: usize,
}

impl FakeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, body: FakeBody) -> BodyId {
        let id = BodyId::new(self.next_index, 0);
        self.next_index += 1;
        self.bodies.insert(id, body);
        id
    }

    pub fn add_wheel(&mut self, position: Vec3, radius: f32) -> BodyId {
        self.insert(FakeBody {
            state: BodyState {
                position,
                ..Default::default()
            },
            radius: Some(radius),
            anchor: None,
        })
    }

    /// A body without a spherical collider.
    pub fn add_box(&mut self, position: Vec3) -> BodyId {
        self.insert(FakeBody {
            state: BodyState {
                position,
                ..Default::default()
            },
            radius: None,
            anchor: None,
        })
    }

    pub fn set_angular_velocity(&mut self, body: BodyId, angular_velocity: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.state.angular_velocity = angular_velocity;
        }
    }

    pub fn set_rotation(&mut self, body: BodyId, rotation: Quat) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.state.rotation = rotation;
        }
    }

    /// Flat ground at `height` tilted so its normal is `degrees` away from up.
    pub fn set_ground_tilt(&mut self, height: f32, degrees: f32) {
        let normal = Quat::from_rotation_x(degrees.to_radians()) * Vec3::Y;
        self.ground = Some((height, normal));
    }

    pub fn anchor_spec(&self, anchor: BodyId) -> Option<AnchorSpec> {
        self.bodies.get(&anchor).and_then(|b| b.anchor)
    }

    pub fn live_anchors(&self) -> Vec<BodyId> {
        let mut anchors: Vec<BodyId> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.anchor.is_some())
            .map(|(id, _)| *id)
            .collect();
        anchors.sort_by_key(|id| id.index);
        anchors
    }
}

impl WheelWorld for FakeWorld {
    fn body_state(&self, body: BodyId) -> Option<BodyState> {
        self.bodies.get(&body).map(|b| b.state)
    }

    fn sphere_radius(&self, body: BodyId) -> Option<f32> {
        self.bodies.get(&body).and_then(|b| b.radius)
    }

    fn apply_torque(&mut self, body: BodyId, torque: Vec3) {
        self.torques.push((body, torque));
    }

    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        _exclude: Option<BodyId>,
    ) -> Option<GroundHit> {
        let (height, normal) = self.ground?;
        let drop = origin.y - height;
        if direction.y >= 0.0 || drop < 0.0 || drop > max_distance {
            return None;
        }
        Some(GroundHit {
            point: Vec3::new(origin.x, height, origin.z),
            normal,
        })
    }

    fn spawn_anchor(&mut self, spec: &AnchorSpec) -> Option<BodyId> {
        self.bodies.get(&spec.wheel)?;
        let id = self.insert(FakeBody {
            state: BodyState {
                position: spec.position,
                rotation: spec.rotation,
                ..Default::default()
            },
            radius: None,
            anchor: Some(*spec),
        });
        self.max_live_anchors = self.max_live_anchors.max(self.live_anchors().len());
        Some(id)
    }

    fn despawn_anchor(&mut self, anchor: BodyId) {
        if self.bodies.remove(&anchor).is_some() {
            self.despawned.push(anchor);
        }
    }

    fn drive_toward(&mut self, body: BodyId, target: Vec3, _dt: f32) {
        self.driven.push((body, target));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SelectionCall {
    Cancel(Interactable),
    Select(EffectorId, Interactable),
    Release(EffectorId),
}

/// Selection system that only records what it was asked to do.
#[derive(Debug, Default)]
pub(crate) struct RecordingSelection {
    pub calls: Vec<SelectionCall>,
}

impl RecordingSelection {
    pub fn releases(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SelectionCall::Release(_)))
            .count()
    }
}

impl SelectionSystem for RecordingSelection {
    fn cancel_selection(&mut self, interactable: Interactable) {
        self.calls.push(SelectionCall::Cancel(interactable));
    }

    fn force_select(&mut self, effector: EffectorId, interactable: Interactable) {
        self.calls.push(SelectionCall::Select(effector, interactable));
    }

    fn force_release(&mut self, effector: EffectorId) {
        self.calls.push(SelectionCall::Release(effector));
    }
}

/// Register a hand with an unsmoothed velocity supplier and a haptic recorder.
pub(crate) fn tracked_hand(effectors: &mut Effectors, position: Vec3) -> (EffectorId, HapticRecorder) {
    let recorder = HapticRecorder::new();
    let id = effectors.register(
        GripEffector::new("hand", position)
            .with_velocity(VelocitySupplier::new(VelocitySupplierConfig::raw()))
            .with_haptics(recorder.clone()),
    );
    (id, recorder)
}

/// Feed a device velocity reading to a hand registered by [`tracked_hand`].
pub(crate) fn push_velocity(effectors: &mut Effectors, id: EffectorId, time: f32, velocity: Vec3) {
    if let Some(effector) = effectors.get_mut(id) {
        effector.track(TrackingSample {
            time,
            position: None,
            rotation: None,
            device_velocity: Some(velocity),
        });
    }
}

/// Move a hand without touching its velocity estimate.
pub(crate) fn move_hand(effectors: &mut Effectors, id: EffectorId, position: Vec3) {
    if let Some(effector) = effectors.get_mut(id) {
        effector.position = position;
    }
}

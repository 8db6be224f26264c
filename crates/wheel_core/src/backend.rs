//! [`WheelWorld`] on top of the rapier-backed [`PhysicsState`].

use bevy::math::Vec3;
use rapier3d::prelude::RigidBodyHandle;
use wheel_physics::{from_rotation, from_vector, PhysicsState};

use crate::world::{AnchorSpec, BodyId, BodyState, GroundHit, WheelWorld};

pub fn body_id(handle: RigidBodyHandle) -> BodyId {
    let (index, generation) = handle.into_raw_parts();
    BodyId::new(index, generation)
}

pub fn rigid_body_handle(body: BodyId) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(body.index, body.generation)
}

impl WheelWorld for PhysicsState {
    fn body_state(&self, body: BodyId) -> Option<BodyState> {
        let rb = self.rigid_body_set.get(rigid_body_handle(body))?;
        Some(BodyState {
            position: from_vector(rb.translation()),
            rotation: from_rotation(rb.rotation()),
            linear_velocity: from_vector(rb.linvel()),
            angular_velocity: from_vector(rb.angvel()),
        })
    }

    fn sphere_radius(&self, body: BodyId) -> Option<f32> {
        self.ball_radius(rigid_body_handle(body))
    }

    fn apply_torque(&mut self, body: BodyId, torque: Vec3) {
        self.apply_step_torque(rigid_body_handle(body), torque);
    }

    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<BodyId>,
    ) -> Option<GroundHit> {
        let hit = PhysicsState::cast_ray(self, origin, direction, max_distance, exclude.map(rigid_body_handle))?;
        Some(GroundHit {
            point: hit.point,
            normal: hit.normal,
        })
    }

    fn spawn_anchor(&mut self, spec: &AnchorSpec) -> Option<BodyId> {
        self.add_coupled_anchor(rigid_body_handle(spec.wheel), spec.position, spec.rotation, spec.mass)
            .map(body_id)
    }

    fn despawn_anchor(&mut self, anchor: BodyId) {
        self.remove_body(rigid_body_handle(anchor));
    }

    fn drive_toward(&mut self, body: BodyId, target: Vec3, dt: f32) {
        self.track_position(rigid_body_handle(body), target, dt);
    }
}

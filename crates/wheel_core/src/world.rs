//! Collaborator contracts the interaction controller depends on.
//!
//! - [`WheelWorld`]: rigid body reads/writes, anchor bodies, ground queries
//! - [`SelectionSystem`]: which effector holds which interactable
//! - [`SessionGuard`]: whether a grip session still owns an anchor
//!
//! The rapier-backed implementation of [`WheelWorld`] lives in `backend`.

use bevy::math::{Quat, Vec3};

use crate::effector::EffectorId;

/// Opaque key for a rigid body in the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId {
    pub index: u32,
    pub generation: u32,
}

impl BodyId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Snapshot of a rigid body's kinematic state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Default for BodyState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

/// Surface hit returned by a ground query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    pub point: Vec3,
    pub normal: Vec3,
}

/// Everything needed to create a proxy anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorSpec {
    /// Body the anchor is rigidly coupled to
    pub wheel: BodyId,
    pub position: Vec3,
    pub rotation: Quat,
    pub mass: f32,
}

/// Physics world as seen by the interaction controller.
pub trait WheelWorld {
    fn body_state(&self, body: BodyId) -> Option<BodyState>;

    /// Radius of the body's spherical bounding volume, if it has one.
    fn sphere_radius(&self, body: BodyId) -> Option<f32>;

    /// Apply `torque` during the next integration step only.
    fn apply_torque(&mut self, body: BodyId, torque: Vec3);

    /// Cast a ray; `exclude` is skipped so a wheel never hits itself.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<BodyId>,
    ) -> Option<GroundHit>;

    /// Create a gravity-free anchor body with an unbreakable, non-colliding
    /// coupling to `spec.wheel`. Returns `None` if the wheel is gone.
    fn spawn_anchor(&mut self, spec: &AnchorSpec) -> Option<BodyId>;

    /// Destroy an anchor and its coupling. Unknown ids are ignored.
    fn despawn_anchor(&mut self, anchor: BodyId);

    /// Velocity-track `body` toward `target` over `dt` seconds.
    fn drive_toward(&mut self, body: BodyId, target: Vec3, dt: f32);
}

/// Something an effector can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interactable {
    /// The wheel itself (default "direct follow" selection)
    Wheel(BodyId),
    /// A proxy anchor coupled to a wheel
    Anchor(BodyId),
}

/// The external selection system the controller overrides.
pub trait SelectionSystem {
    /// Drop whatever selection currently targets `interactable`.
    fn cancel_selection(&mut self, interactable: Interactable);

    /// Make `effector` select `interactable`, replacing its current selection.
    fn force_select(&mut self, effector: EffectorId, interactable: Interactable);

    /// Make `effector` let go of whatever it holds.
    fn force_release(&mut self, effector: EffectorId);
}

/// Continuation condition for session-scoped monitors.
pub trait SessionGuard {
    fn is_active(&self) -> bool;
}

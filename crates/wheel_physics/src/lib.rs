//! Rapier-backed rigid body world for the wheelchair scene.
//!
//! Owns the raw rapier pipeline (bodies, colliders, impulse joints, query
//! pipeline) and steps it on Bevy's fixed timestep. Knows nothing about
//! grips or sessions; the interaction layer talks to it through plain
//! methods on [`PhysicsState`].

use std::collections::HashMap;

use bevy::prelude::*;
use rapier3d::prelude as rapier;
use rapier::nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        let state = PhysicsState::default();
        // Step Bevy's fixed schedule at the rapier timestep.
        app.insert_resource(Time::<Fixed>::from_seconds(state.dt() as f64))
            .insert_resource(state)
            .configure_sets(FixedUpdate, PhysicsSystems::Step)
            .add_systems(FixedUpdate, step_physics.in_set(PhysicsSystems::Step))
            .add_systems(Update, sync_transforms);
    }
}

/// System sets exposed so other plugins can order work around integration.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum PhysicsSystems {
    /// The rapier pipeline step. Torque and velocity writes must run before it.
    Step,
}

/// Settings for a wheel body.
#[derive(Debug, Clone)]
pub struct WheelBodyConfig {
    /// Radius of the spherical collider (meters)
    pub radius: f32,
    /// Total mass (kg)
    pub mass: f32,
    /// Contact friction against the ground
    pub friction: f32,
    /// Angular damping applied by the solver
    pub angular_damping: f32,
    /// Angular speed cap enforced after every step (rad/s)
    pub max_angular_velocity: f32,
}

impl Default for WheelBodyConfig {
    fn default() -> Self {
        Self {
            radius: 0.3,
            mass: 2.0,
            friction: 1.0,
            angular_damping: 0.05,
            max_angular_velocity: 7.0,
        }
    }
}

/// Result of a ray query against static and dynamic colliders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

#[derive(Resource)]
pub struct PhysicsState {
    pub gravity: Vector3<f32>,
    pub integration_parameters: rapier::IntegrationParameters,
    pub physics_pipeline: rapier::PhysicsPipeline,
    pub island_manager: rapier::IslandManager,
    pub broad_phase: rapier::DefaultBroadPhase,
    pub narrow_phase: rapier::NarrowPhase,
    pub rigid_body_set: rapier::RigidBodySet,
    pub collider_set: rapier::ColliderSet,
    pub impulse_joint_set: rapier::ImpulseJointSet,
    pub multibody_joint_set: rapier::MultibodyJointSet,
    pub ccd_solver: rapier::CCDSolver,
    pub query_pipeline: rapier::QueryPipeline,
    /// Angular speed caps keyed by wheel body
    wheel_limits: HashMap<rapier::RigidBodyHandle, f32>,
}

impl PhysicsState {
    pub fn new() -> Self {
        Self {
            gravity: Vector3::new(0.0, -9.81, 0.0),
            integration_parameters: rapier::IntegrationParameters::default(),
            physics_pipeline: rapier::PhysicsPipeline::new(),
            island_manager: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            rigid_body_set: rapier::RigidBodySet::new(),
            collider_set: rapier::ColliderSet::new(),
            impulse_joint_set: rapier::ImpulseJointSet::new(),
            multibody_joint_set: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            query_pipeline: rapier::QueryPipeline::new(),
            wheel_limits: HashMap::new(),
        }
    }

    /// Fixed timestep used by the pipeline (seconds).
    pub fn dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Add a flat fixed ground slab whose top surface sits at `height`.
    pub fn add_ground(&mut self, height: f32, half_extent: f32) -> rapier::RigidBodyHandle {
        let body = rapier::RigidBodyBuilder::fixed()
            .translation(Vector3::new(0.0, height - 0.5, 0.0));
        let handle = self.rigid_body_set.insert(body);
        let collider = rapier::ColliderBuilder::cuboid(half_extent, 0.5, half_extent).friction(1.0);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.refresh_queries();
        handle
    }

    /// Add a fixed ramp tilted by `angle_degrees` around the X axis.
    ///
    /// The ramp's top surface passes through `center`.
    pub fn add_ramp(
        &mut self,
        center: Vec3,
        angle_degrees: f32,
        half_extent: f32,
    ) -> rapier::RigidBodyHandle {
        let rotation = Quat::from_rotation_x(angle_degrees.to_radians());
        let offset = rotation * Vec3::new(0.0, -0.5, 0.0);
        let body = rapier::RigidBodyBuilder::fixed().position(to_isometry(center + offset, rotation));
        let handle = self.rigid_body_set.insert(body);
        let collider = rapier::ColliderBuilder::cuboid(half_extent, 0.5, half_extent).friction(1.0);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.refresh_queries();
        handle
    }

    /// Add a dynamic wheel with a spherical collider.
    pub fn add_wheel(&mut self, position: Vec3, config: &WheelBodyConfig) -> rapier::RigidBodyHandle {
        let body = rapier::RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .angular_damping(config.angular_damping)
            .can_sleep(false);
        let handle = self.rigid_body_set.insert(body);
        let collider = rapier::ColliderBuilder::ball(config.radius)
            .mass(config.mass)
            .friction(config.friction);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.wheel_limits.insert(handle, config.max_angular_velocity);
        self.refresh_queries();
        handle
    }

    /// Create a light, gravity-free body at `position` rigidly coupled to `target`.
    ///
    /// The coupling is a fixed joint with collisions between the pair disabled.
    /// Rapier joints never break, so the break thresholds are infinite.
    pub fn add_coupled_anchor(
        &mut self,
        target: rapier::RigidBodyHandle,
        position: Vec3,
        rotation: Quat,
        mass: f32,
    ) -> Option<rapier::RigidBodyHandle> {
        let target_pose = *self.rigid_body_set.get(target)?.position();

        let body = rapier::RigidBodyBuilder::dynamic()
            .position(to_isometry(position, rotation))
            .gravity_scale(0.0)
            .linear_damping(0.0)
            .angular_damping(0.0)
            .can_sleep(false);
        let handle = self.rigid_body_set.insert(body);
        let collider = rapier::ColliderBuilder::ball(0.02).sensor(true).mass(mass);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        let local_on_target = target_pose.inverse_transform_point(&Point3::from(to_vector(position)));
        let joint = rapier::FixedJointBuilder::new()
            .local_anchor1(Point3::origin())
            .local_anchor2(local_on_target)
            .contacts_enabled(false);
        self.impulse_joint_set.insert(handle, target, joint, true);
        Some(handle)
    }

    /// Remove a body together with its colliders and joints. Unknown handles are ignored.
    pub fn remove_body(&mut self, handle: rapier::RigidBodyHandle) -> bool {
        self.wheel_limits.remove(&handle);
        let removed = self
            .rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some();
        if removed {
            self.refresh_queries();
        }
        removed
    }

    /// Radius of the first spherical collider attached to `handle`.
    pub fn ball_radius(&self, handle: rapier::RigidBodyHandle) -> Option<f32> {
        let body = self.rigid_body_set.get(handle)?;
        body.colliders()
            .iter()
            .filter_map(|c| self.collider_set.get(*c))
            .find_map(|c| c.shape().as_ball().map(|ball| ball.radius))
    }

    /// Apply `torque` for exactly one step, as an impulse of `torque * dt`.
    pub fn apply_step_torque(&mut self, handle: rapier::RigidBodyHandle, torque: Vec3) {
        let dt = self.dt();
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_torque_impulse(to_vector(torque * dt), true);
        }
    }

    /// Velocity-track a body toward `target`, reaching it in one step if unobstructed.
    pub fn track_position(&mut self, handle: rapier::RigidBodyHandle, target: Vec3, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            let current = from_vector(body.translation());
            body.set_linvel(to_vector((target - current) / dt), true);
        }
    }

    /// Cast a ray, skipping sensors and (optionally) one body.
    pub fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<rapier::RigidBodyHandle>,
    ) -> Option<RayHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        let ray = rapier::Ray::new(Point3::from(to_vector(origin)), to_vector(dir));
        let mut filter = rapier::QueryFilter::default().exclude_sensors();
        if let Some(body) = exclude {
            filter = filter.exclude_rigid_body(body);
        }
        let (_collider, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        Some(RayHit {
            point: from_point(&ray.point_at(hit.time_of_impact)),
            normal: from_vector(&hit.normal),
            distance: hit.time_of_impact,
        })
    }

    /// Advance the simulation by one fixed step.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.clamp_wheel_spin();
    }

    /// Number of dynamic bodies currently in the world.
    pub fn dynamic_body_count(&self) -> usize {
        self.rigid_body_set
            .iter()
            .filter(|(_, body)| body.is_dynamic())
            .count()
    }

    fn clamp_wheel_spin(&mut self) {
        for (handle, max) in &self.wheel_limits {
            if let Some(body) = self.rigid_body_set.get_mut(*handle) {
                let angvel = *body.angvel();
                let speed = angvel.norm();
                if speed > *max {
                    body.set_angvel(angvel * (*max / speed), false);
                }
            }
        }
    }

    fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Links a Bevy entity to a Rapier rigid body
#[derive(Component)]
pub struct RigidBodyLink(pub rapier::RigidBodyHandle);

pub fn to_vector(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

pub fn from_vector(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn from_point(p: &Point3<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub fn to_rotation(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn from_rotation(q: &UnitQuaternion<f32>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

pub fn to_isometry(position: Vec3, rotation: Quat) -> Isometry3<f32> {
    Isometry3::from_parts(Translation3::from(to_vector(position)), to_rotation(rotation))
}

fn step_physics(mut physics: ResMut<PhysicsState>) {
    physics.step();
}

fn sync_transforms(physics: Res<PhysicsState>, mut query: Query<(&RigidBodyLink, &mut Transform)>) {
    for (link, mut transform) in query.iter_mut() {
        if let Some(body) = physics.rigid_body_set.get(link.0) {
            transform.translation = from_vector(body.translation());
            transform.rotation = from_rotation(body.rotation());
        }
    }
}

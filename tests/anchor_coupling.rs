//! Proxy anchor coupling against the real rapier world.

use bevy::math::{Quat, Vec3};
use wheel_core::{
    body_id, AnchorSpec, EffectorId, Effectors, FrameOutput, GrabSessionController, GripEffector,
    Interactable, InteractionContext, SelectionState, SessionPhase, VelocitySupplier, VelocitySupplierConfig,
    WheelInteractionConfig, WheelWorld,
};
use wheel_physics::{PhysicsState, WheelBodyConfig};

fn zero_gravity_world() -> PhysicsState {
    let mut physics = PhysicsState::new();
    physics.gravity.fill(0.0);
    physics
}

#[test]
fn test_anchor_round_trip_leaves_wheel_untouched() {
    let mut physics = zero_gravity_world();
    let wheel = body_id(physics.add_wheel(Vec3::new(0.0, 1.0, 0.0), &WheelBodyConfig::default()));
    let before = physics.body_state(wheel).unwrap();

    let anchor = physics
        .spawn_anchor(&AnchorSpec {
            wheel,
            position: Vec3::new(0.0, 1.3, 0.0),
            rotation: before.rotation,
            mass: 0.1,
        })
        .expect("wheel exists");
    physics.despawn_anchor(anchor);
    for _ in 0..10 {
        physics.step();
    }

    let after = physics.body_state(wheel).unwrap();
    assert!((after.position - before.position).length() < 1e-6, "moved to {:?}", after.position);
    assert!(after.linear_velocity.length() < 1e-6);
    assert!(after.angular_velocity.length() < 1e-6);
}

#[test]
fn test_idle_coupling_adds_no_impulse() {
    let mut physics = zero_gravity_world();
    let wheel = body_id(physics.add_wheel(Vec3::new(0.0, 1.0, 0.0), &WheelBodyConfig::default()));
    let start = physics.body_state(wheel).unwrap();

    let anchor = physics
        .spawn_anchor(&AnchorSpec {
            wheel,
            position: Vec3::new(0.3, 1.0, 0.0),
            rotation: Quat::IDENTITY,
            mass: 0.1,
        })
        .unwrap();
    for _ in 0..30 {
        physics.step();
    }

    let held = physics.body_state(wheel).unwrap();
    assert!((held.position - start.position).length() < 1e-4, "drifted to {:?}", held.position);
    assert!(held.angular_velocity.length() < 1e-4, "spun at {:?}", held.angular_velocity);

    physics.despawn_anchor(anchor);
    assert_eq!(physics.impulse_joint_set.len(), 0);
    assert_eq!(physics.dynamic_body_count(), 1);
}

struct Scene {
    physics: PhysicsState,
    selection: SelectionState,
    effectors: Effectors,
    hand: EffectorId,
    controller: GrabSessionController,
}

impl Scene {
    fn new() -> Self {
        let mut physics = PhysicsState::new();
        physics.add_ground(0.0, 10.0);
        let handle = physics.add_wheel(Vec3::new(0.0, 0.3, 0.0), &WheelBodyConfig::default());
        let controller =
            GrabSessionController::new(body_id(handle), WheelInteractionConfig::default(), &physics).unwrap();

        let mut effectors = Effectors::new();
        let hand = effectors.register(
            GripEffector::new("hand", Vec3::new(0.0, 0.6, 0.0))
                .with_velocity(VelocitySupplier::new(VelocitySupplierConfig::raw())),
        );
        Self {
            physics,
            selection: SelectionState::new(),
            effectors,
            hand,
            controller,
        }
    }

    fn grip(&mut self) {
        let wheel = self.controller.wheel();
        self.selection.select(self.hand, Interactable::Wheel(wheel));
        let mut ctx = InteractionContext {
            world: &mut self.physics,
            selection: &mut self.selection,
            effectors: &mut self.effectors,
        };
        self.controller.on_grip_begin(&mut ctx, self.hand);
    }

    fn release(&mut self) {
        self.selection.release(self.hand);
        let mut ctx = InteractionContext {
            world: &mut self.physics,
            selection: &mut self.selection,
            effectors: &mut self.effectors,
        };
        self.controller.on_grip_end(&mut ctx, self.hand);
    }

    /// One frame, then one physics step, in plugin order.
    fn advance(&mut self, frame_dt: f32) -> FrameOutput {
        let dt = self.physics.dt();
        let output = {
            let mut ctx = InteractionContext {
                world: &mut self.physics,
                selection: &mut self.selection,
                effectors: &mut self.effectors,
            };
            let output = self.controller.frame_update(&mut ctx, frame_dt);
            self.controller.fixed_update(&mut ctx, dt);
            output
        };
        self.selection.drive_anchors(&mut self.physics, &self.effectors, dt);
        self.physics.step();
        output
    }

    fn move_hand(&mut self, position: Vec3) {
        if let Some(hand) = self.effectors.get_mut(self.hand) {
            hand.position = position;
        }
    }
}

#[test]
fn test_full_session_on_rapier() {
    let mut scene = Scene::new();
    let wheel = scene.controller.wheel();

    scene.grip();
    assert_eq!(scene.controller.phase(), SessionPhase::Engaging);
    scene.advance(1.0 / 60.0);
    assert_eq!(scene.controller.phase(), SessionPhase::Active);
    assert_eq!(scene.physics.impulse_joint_set.len(), 1);
    let anchor = scene.controller.current_anchor().unwrap();
    assert_eq!(scene.selection.selection(scene.hand), Some(Interactable::Anchor(anchor)));

    // Anchor sits on the wheel surface straight above the center.
    let anchor_pos = scene.physics.body_state(anchor).unwrap().position;
    assert!((anchor_pos - Vec3::new(0.0, 0.6, 0.0)).length() < 0.05, "anchor at {:?}", anchor_pos);

    // Push the top of the wheel forward.
    for i in 1..=20 {
        scene.move_hand(Vec3::new(0.0, 0.6, 0.005 * i as f32));
        let out = scene.advance(1.0 / 60.0);
        assert_eq!(out.forced_release, None, "released at push step {}", i);
    }
    let pushed = scene.physics.body_state(wheel).unwrap();
    assert!(pushed.angular_velocity.length() > 0.1, "wheel did not turn: {:?}", pushed.angular_velocity);

    scene.release();
    assert_eq!(scene.controller.phase(), SessionPhase::Idle);
    assert_eq!(scene.physics.impulse_joint_set.len(), 0);
    assert_eq!(scene.physics.dynamic_body_count(), 1);
    assert!(scene.selection.is_empty());
}

#[test]
fn test_hand_drifting_away_forces_release() {
    let mut scene = Scene::new();
    scene.grip();
    scene.advance(1.0 / 60.0);
    assert_eq!(scene.controller.phase(), SessionPhase::Active);

    scene.move_hand(Vec3::new(0.0, 0.6, 2.0));
    let mut released = None;
    for _ in 0..10 {
        if let Some(effector) = scene.advance(0.05).forced_release {
            released = Some(effector);
            break;
        }
    }

    assert_eq!(released, Some(scene.hand));
    assert_eq!(scene.controller.phase(), SessionPhase::Idle);
    assert_eq!(scene.physics.impulse_joint_set.len(), 0);
    assert_eq!(scene.selection.selection(scene.hand), None);

    // The selection system's own release arrives afterwards and is harmless.
    scene.release();
    assert_eq!(scene.physics.dynamic_body_count(), 1);
}

//! Bevy integration for grip interaction.
//!
//! # Messages
//!
//! Inputs: [`TrackingUpdate`], [`GripChanged`], [`WheelLifecycle`].
//! Outputs: [`SlopeChanged`], [`ForcedRelease`], [`HapticPulse`], [`EffectorReady`].
//!
//! Grip begin and end share one message type so they are handled in the
//! order the selection system sent them.
//!
//! # Schedule
//!
//! - `FixedUpdate`, before the rapier step: brake assist, then anchor drive.
//! - `Update`: tracking, frame tick, then grip and lifecycle messages. A grip
//!   read this frame therefore engages on the next one.

use bevy::prelude::*;
use rapier3d::prelude::RigidBodyHandle;
use wheel_physics::{PhysicsState, PhysicsSystems, RigidBodyLink};

use crate::backend::body_id;
use crate::config::WheelInteractionConfig;
use crate::effector::{EffectorId, Effectors, HapticImpulse};
use crate::selection::SelectionState;
use crate::session::{GrabSessionController, InteractionContext};
use crate::slope::SlopeSample;
use crate::velocity::TrackingSample;
use crate::world::Interactable;

pub struct WheelInteractionPlugin;

impl Plugin for WheelInteractionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SelectionState>()
            .init_resource::<Effectors>()
            .add_message::<TrackingUpdate>()
            .add_message::<GripChanged>()
            .add_message::<WheelLifecycle>()
            .add_message::<SlopeChanged>()
            .add_message::<ForcedRelease>()
            .add_message::<HapticPulse>()
            .add_message::<EffectorReady>()
            .configure_sets(
                FixedUpdate,
                InteractionSystems::Physics.before(PhysicsSystems::Step),
            )
            .add_systems(
                FixedUpdate,
                (tick_physics, drive_anchors)
                    .chain()
                    .in_set(InteractionSystems::Physics),
            )
            .add_systems(
                Update,
                (apply_tracking, tick_frame, handle_grips, handle_lifecycle)
                    .chain()
                    .in_set(InteractionSystems::Frame),
            );
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum InteractionSystems {
    /// Torque and anchor velocity writes, ordered before integration.
    Physics,
    Frame,
}

/// New tracking reading for an effector.
#[derive(Message, Debug, Clone, Copy)]
pub struct TrackingUpdate {
    pub effector: EffectorId,
    pub sample: TrackingSample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripKind {
    Began,
    Ended,
}

/// The selection system saw `effector` grab or let go of the wheel on `wheel`.
#[derive(Message, Debug, Clone, Copy)]
pub struct GripChanged {
    pub wheel: Entity,
    pub effector: EffectorId,
    pub kind: GripKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Enable,
    Disable,
    Destroy,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct WheelLifecycle {
    pub wheel: Entity,
    pub kind: LifecycleKind,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct SlopeChanged {
    pub wheel: Entity,
    pub sample: SlopeSample,
}

/// A grip was ended because the hand drifted too far from the wheel.
#[derive(Message, Debug, Clone, Copy)]
pub struct ForcedRelease {
    pub wheel: Entity,
    pub effector: EffectorId,
}

/// A deceleration pulse sent to the hand gripping `wheel`.
#[derive(Message, Debug, Clone, Copy)]
pub struct HapticPulse {
    pub wheel: Entity,
    pub effector: EffectorId,
    pub impulse: HapticImpulse,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct EffectorReady {
    pub effector: EffectorId,
}

/// Grip interaction for one wheel entity.
#[derive(Component, Debug)]
pub struct WheelInteractable {
    pub controller: GrabSessionController,
}

/// Spawn a wheel entity with interaction for the rapier body `handle`.
///
/// Construction failures are logged and no entity is spawned.
pub fn spawn_wheel_interactable(
    commands: &mut Commands,
    physics: &PhysicsState,
    handle: RigidBodyHandle,
    config: WheelInteractionConfig,
) -> Option<Entity> {
    match GrabSessionController::new(body_id(handle), config, physics) {
        Ok(controller) => {
            let entity = commands
                .spawn((RigidBodyLink(handle), WheelInteractable { controller }))
                .id();
            info!("Wheel interaction ready on {:?} (body {:?})", entity, handle);
            Some(entity)
        }
        Err(e) => {
            error!("Wheel interaction disabled for body {:?}: {}", handle, e);
            None
        }
    }
}

fn tick_physics(
    mut physics: ResMut<PhysicsState>,
    mut selection: ResMut<SelectionState>,
    mut effectors: ResMut<Effectors>,
    mut wheels: Query<&mut WheelInteractable>,
) {
    let dt = physics.dt();
    for mut wheel in wheels.iter_mut() {
        let mut ctx = InteractionContext {
            world: &mut *physics,
            selection: &mut *selection,
            effectors: &mut *effectors,
        };
        wheel.controller.fixed_update(&mut ctx, dt);
    }
}

fn drive_anchors(
    mut physics: ResMut<PhysicsState>,
    selection: Res<SelectionState>,
    effectors: Res<Effectors>,
) {
    let dt = physics.dt();
    selection.drive_anchors(&mut *physics, &effectors, dt);
}

fn apply_tracking(
    mut updates: MessageReader<TrackingUpdate>,
    mut effectors: ResMut<Effectors>,
    mut ready: MessageWriter<EffectorReady>,
) {
    for update in updates.read() {
        if let Some(effector) = effectors.get_mut(update.effector) {
            effector.track(update.sample);
        }
    }
    for effector in effectors.take_newly_ready() {
        ready.write(EffectorReady { effector });
    }
}

fn tick_frame(
    time: Res<Time>,
    mut physics: ResMut<PhysicsState>,
    mut selection: ResMut<SelectionState>,
    mut effectors: ResMut<Effectors>,
    mut wheels: Query<(Entity, &mut WheelInteractable)>,
    mut slope_changed: MessageWriter<SlopeChanged>,
    mut forced: MessageWriter<ForcedRelease>,
    mut pulses: MessageWriter<HapticPulse>,
) {
    let dt = time.delta_secs();
    for (entity, mut wheel) in wheels.iter_mut() {
        let mut ctx = InteractionContext {
            world: &mut *physics,
            selection: &mut *selection,
            effectors: &mut *effectors,
        };
        let output = wheel.controller.frame_update(&mut ctx, dt);
        if let Some(sample) = output.slope_changed {
            slope_changed.write(SlopeChanged { wheel: entity, sample });
        }
        if let Some(effector) = output.forced_release {
            forced.write(ForcedRelease { wheel: entity, effector });
        }
        if let (Some(impulse), Some(effector)) = (output.haptic, wheel.controller.current_effector()) {
            pulses.write(HapticPulse {
                wheel: entity,
                effector,
                impulse,
            });
        }
    }
}

fn handle_grips(
    mut grips: MessageReader<GripChanged>,
    mut physics: ResMut<PhysicsState>,
    mut selection: ResMut<SelectionState>,
    mut effectors: ResMut<Effectors>,
    mut wheels: Query<&mut WheelInteractable>,
) {
    for grip in grips.read() {
        if grip.kind == GripKind::Ended {
            selection.release(grip.effector);
        }
        let Ok(mut wheel) = wheels.get_mut(grip.wheel) else {
            if grip.kind == GripKind::Began {
                warn!("Grip on {:?}, which has no wheel interaction", grip.wheel);
            }
            continue;
        };
        if grip.kind == GripKind::Began {
            selection.select(grip.effector, Interactable::Wheel(wheel.controller.wheel()));
        }
        let mut ctx = InteractionContext {
            world: &mut *physics,
            selection: &mut *selection,
            effectors: &mut *effectors,
        };
        match grip.kind {
            GripKind::Began => wheel.controller.on_grip_begin(&mut ctx, grip.effector),
            GripKind::Ended => wheel.controller.on_grip_end(&mut ctx, grip.effector),
        }
    }
}

fn handle_lifecycle(
    mut commands: Commands,
    mut lifecycle: MessageReader<WheelLifecycle>,
    mut physics: ResMut<PhysicsState>,
    mut selection: ResMut<SelectionState>,
    mut effectors: ResMut<Effectors>,
    mut wheels: Query<&mut WheelInteractable>,
) {
    for event in lifecycle.read() {
        let Ok(mut wheel) = wheels.get_mut(event.wheel) else {
            continue;
        };
        let mut ctx = InteractionContext {
            world: &mut *physics,
            selection: &mut *selection,
            effectors: &mut *effectors,
        };
        match event.kind {
            LifecycleKind::Enable => wheel.controller.on_enable(),
            LifecycleKind::Disable => wheel.controller.on_disable(&mut ctx),
            LifecycleKind::Destroy => {
                wheel.controller.on_destroy(&mut ctx);
                commands.entity(event.wheel).remove::<WheelInteractable>();
            }
        }
    }
}

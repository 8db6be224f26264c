use bevy::prelude::*;
use rand::Rng;
use wheel_core::{
    spawn_wheel_interactable, EffectorId, EffectorReady, Effectors, ForcedRelease, GripChanged, GripEffector,
    GripKind, HapticPulse, HapticRecorder, InteractionSystems, SlopeChanged, TrackingSample, TrackingUpdate,
    VelocitySupplier, VelocitySupplierConfig, WheelInteractionConfig, WheelInteractionPlugin,
};
use wheel_physics::{PhysicsPlugin, PhysicsState, WheelBodyConfig};

const CONFIG_PATH: &str = "config/wheel_interaction.json";
const WHEEL_RADIUS: f32 = 0.3;
/// Seconds per scripted push: grip, push forward, release, reach back.
const PUSH_CYCLE: f32 = 1.6;
const GRIP_PORTION: f32 = 0.6;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(PhysicsPlugin)
        .add_plugins(WheelInteractionPlugin)
        .insert_resource(ClearColor(Color::srgb(0.05, 0.05, 0.08)))
        .add_systems(Startup, setup)
        .add_systems(Update, drive_scripted_hand.before(InteractionSystems::Frame))
        .add_systems(Update, log_feedback.after(InteractionSystems::Frame))
        .run();
}

/// A hand that pushes the right wheel in a loop.
#[derive(Resource)]
struct ScriptedHand {
    effector: EffectorId,
    wheel: Entity,
    haptics: HapticRecorder,
    gripping: bool,
}

fn load_config() -> WheelInteractionConfig {
    match WheelInteractionConfig::load(CONFIG_PATH) {
        Ok(config) => {
            info!("Loaded wheel interaction config from {}", CONFIG_PATH);
            config
        }
        Err(e) => {
            warn!("Using default wheel interaction config ({})", e);
            WheelInteractionConfig::default()
        }
    }
}

fn setup(
    mut commands: Commands,
    mut physics: ResMut<PhysicsState>,
    mut effectors: ResMut<Effectors>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(3.0, 2.5, -3.0).looking_at(Vec3::new(0.0, 0.3, 1.0), Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    physics.add_ground(0.0, 10.0);
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(20.0, 20.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.3, 0.32, 0.3))),
    ));

    // A gentle ramp ahead of the chair
    let ramp_center = Vec3::new(0.0, 0.0, 6.0);
    physics.add_ramp(ramp_center, 5.0, 2.0);
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(4.0, 0.02, 4.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.45, 0.4, 0.3))),
        Transform::from_translation(ramp_center).with_rotation(Quat::from_rotation_x(5f32.to_radians())),
    ));

    let config = load_config();
    let wheel_body = WheelBodyConfig {
        radius: WHEEL_RADIUS,
        ..Default::default()
    };
    let wheel_mesh = meshes.add(Sphere::new(WHEEL_RADIUS));
    let wheel_material = materials.add(Color::srgb(0.15, 0.15, 0.18));

    let mut wheels = Vec::new();
    for x in [-0.3, 0.3] {
        let handle = physics.add_wheel(Vec3::new(x, WHEEL_RADIUS, 0.0), &wheel_body);
        if let Some(entity) = spawn_wheel_interactable(&mut commands, &physics, handle, config.clone()) {
            commands.entity(entity).insert((
                Mesh3d(wheel_mesh.clone()),
                MeshMaterial3d(wheel_material.clone()),
                Transform::from_xyz(x, WHEEL_RADIUS, 0.0),
            ));
            wheels.push(entity);
        }
    }

    let Some(&right_wheel) = wheels.last() else {
        error!("No wheel could be set up; scripted hand disabled");
        return;
    };
    let haptics = HapticRecorder::new();
    let effector = effectors.register(
        GripEffector::new("right_hand", Vec3::new(0.3, WHEEL_RADIUS * 2.0, 0.0))
            .with_velocity(VelocitySupplier::new(VelocitySupplierConfig::default()))
            .with_haptics(haptics.clone()),
    );
    commands.insert_resource(ScriptedHand {
        effector,
        wheel: right_wheel,
        haptics,
        gripping: false,
    });
}

/// Hand position on the scripted push arc: over the top of the wheel,
/// front to back while gripping, returning higher up while released.
fn hand_target(center: Vec3, phase: f32) -> Vec3 {
    let reach = WHEEL_RADIUS + 0.05;
    if phase < GRIP_PORTION {
        let t = phase / GRIP_PORTION;
        let angle = (-30.0 + 90.0 * t).to_radians();
        center + Vec3::new(0.0, angle.cos() * reach, angle.sin() * reach)
    } else {
        let t = (phase - GRIP_PORTION) / (1.0 - GRIP_PORTION);
        let angle = (60.0 - 90.0 * t).to_radians();
        center + Vec3::new(0.0, angle.cos() * (reach + 0.15), angle.sin() * (reach + 0.15))
    }
}

fn drive_scripted_hand(
    time: Res<Time>,
    hand: Option<ResMut<ScriptedHand>>,
    wheels: Query<&Transform>,
    mut tracking: MessageWriter<TrackingUpdate>,
    mut grips: MessageWriter<GripChanged>,
) {
    let Some(mut hand) = hand else {
        return;
    };
    let Ok(wheel) = wheels.get(hand.wheel) else {
        return;
    };

    let now = time.elapsed_secs();
    let phase = (now % PUSH_CYCLE) / PUSH_CYCLE;
    let mut rng = rand::thread_rng();
    let jitter = Vec3::new(
        rng.gen_range(-0.002..0.002),
        rng.gen_range(-0.002..0.002),
        rng.gen_range(-0.002..0.002),
    );
    tracking.write(TrackingUpdate {
        effector: hand.effector,
        sample: TrackingSample {
            time: now,
            position: Some(hand_target(wheel.translation, phase) + jitter),
            rotation: Some(Quat::IDENTITY),
            device_velocity: None,
        },
    });

    let should_grip = phase < GRIP_PORTION;
    if should_grip != hand.gripping {
        grips.write(GripChanged {
            wheel: hand.wheel,
            effector: hand.effector,
            kind: if should_grip { GripKind::Began } else { GripKind::Ended },
        });
    }
    hand.gripping = should_grip;
}

fn log_feedback(
    hand: Option<Res<ScriptedHand>>,
    mut slopes: MessageReader<SlopeChanged>,
    mut releases: MessageReader<ForcedRelease>,
    mut pulses: MessageReader<HapticPulse>,
    mut ready: MessageReader<EffectorReady>,
) {
    for change in slopes.read() {
        info!(
            "{:?}: on_slope={} ({:.1} degrees)",
            change.wheel, change.sample.on_slope, change.sample.angle
        );
    }
    for release in releases.read() {
        info!("{:?} let go of {:?}: too far from the wheel", release.effector, release.wheel);
    }
    for effector in ready.read() {
        info!("{:?} tracking ready", effector.effector);
    }
    for pulse in pulses.read() {
        debug!(
            "{:?} braking felt by {:?}: {:.2} for {:.2}s",
            pulse.wheel, pulse.effector, pulse.impulse.amplitude, pulse.impulse.duration
        );
    }
    // The recorder stands in for the controller's rumble motor.
    if let Some(hand) = hand {
        let delivered = hand.haptics.drain().len();
        if delivered > 0 {
            debug!("{} pulse(s) delivered to the hand", delivered);
        }
    }
}

use std::io::Write;
use std::path::Path;

use wheel_core::{body_id, GrabSessionController, InteractionError, WheelInteractionConfig};
use wheel_physics::{PhysicsState, WheelBodyConfig};

#[test]
fn test_shipped_config_matches_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/wheel_interaction.json");
    let config = WheelInteractionConfig::load(&path).unwrap();
    assert_eq!(config, WheelInteractionConfig::default());
}

#[test]
fn test_loaded_config_reaches_controller() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{ "deselection_threshold": 0.1, "slope_ray_multiplier": 3.0, "haptics_enabled": false }}"#
    )
    .unwrap();
    let config = WheelInteractionConfig::load(file.path()).unwrap();

    let mut physics = PhysicsState::new();
    let wheel = physics.add_wheel(bevy::math::Vec3::ZERO, &WheelBodyConfig::default());
    let controller = GrabSessionController::new(body_id(wheel), config, &physics).unwrap();

    assert!((controller.release_threshold() - 0.4).abs() < 1e-6);
    assert_eq!(controller.config().slope_ray_multiplier, 3.0);
    assert!(!controller.config().haptics_enabled);
}

#[test]
fn test_invalid_config_is_rejected_at_construction() {
    let mut physics = PhysicsState::new();
    let wheel = physics.add_wheel(bevy::math::Vec3::ZERO, &WheelBodyConfig::default());
    let config = WheelInteractionConfig {
        anchor_mass: -1.0,
        ..Default::default()
    };
    let err = GrabSessionController::new(body_id(wheel), config, &physics).unwrap_err();
    assert!(matches!(err, InteractionError::InvalidConfig(_)), "{}", err);
}

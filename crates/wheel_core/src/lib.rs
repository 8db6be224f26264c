//! Grab-mediated wheel interaction for VR wheelchair propulsion.
//!
//! A tracked hand grips a freely spinning wheel. Instead of the hand owning
//! the wheel, a light proxy anchor is coupled to the wheel and the hand
//! drives the anchor. While the grip lasts, four monitors run alongside:
//!
//! - [`brake::BrakeAssistMonitor`]: counter-torque when the hand stops
//! - [`distance::DistanceMonitor`]: forced release when the hand drifts away
//! - [`haptics::HapticFeedbackMonitor`]: pulses on wheel deceleration
//! - [`slope::SlopeMonitor`]: ground tilt under the wheel (runs without a grip too)
//!
//! [`session::GrabSessionController`] ties them together per wheel and
//! [`plugin::WheelInteractionPlugin`] drives controllers from Bevy schedules.

pub mod anchor;
pub mod backend;
pub mod brake;
pub mod config;
pub mod distance;
pub mod effector;
pub mod error;
pub mod haptics;
pub mod plugin;
pub mod schedule;
pub mod selection;
pub mod session;
pub mod signal;
pub mod slope;
pub mod velocity;
pub mod world;

#[cfg(test)]
mod testing;

pub use anchor::ProxyAnchorManager;
pub use backend::{body_id, rigid_body_handle};
pub use brake::{BrakeAssistMonitor, BrakeEvent};
pub use config::{AnchorHandoff, AnchorPlacement, WheelInteractionConfig};
pub use distance::DistanceMonitor;
pub use effector::{EffectorId, Effectors, GripEffector, HapticImpulse, HapticRecorder, HapticSink};
pub use error::{InteractionError, InteractionResult};
pub use haptics::HapticFeedbackMonitor;
pub use plugin::{
    spawn_wheel_interactable, EffectorReady, ForcedRelease, GripChanged, GripKind, HapticPulse, InteractionSystems,
    LifecycleKind, SlopeChanged, TrackingUpdate, WheelInteractable, WheelInteractionPlugin, WheelLifecycle,
};
pub use schedule::{Cadence, CancellationToken, MonitorState, PollClock, PollTask, Step};
pub use selection::SelectionState;
pub use session::{FrameOutput, GrabSessionController, InteractionContext, SessionPhase};
pub use slope::{SlopeMonitor, SlopeSample};
pub use velocity::{TrackingSample, VelocitySource, VelocitySupplier, VelocitySupplierConfig};
pub use world::{AnchorSpec, BodyId, BodyState, GroundHit, Interactable, SelectionSystem, SessionGuard, WheelWorld};

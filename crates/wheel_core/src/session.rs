//! Grab session controller: one per wheel.
//!
//! Reacts to grip begin/end, owns the proxy anchor and the four monitors,
//! and funnels every way a session can end (release, forced release,
//! disable, destroy) into one idempotent teardown.
//!
//! ```text
//! Idle --grip begin--> Engaging --next frame--> Active
//!   ^                                             |
//!   +---- grip end | distance | disable/destroy --+
//! ```

use bevy::log::{debug, error, info, warn};

use crate::anchor::ProxyAnchorManager;
use crate::brake::{BrakeAssistMonitor, BrakeEvent};
use crate::config::{
    clamp_brake_force, clamp_deselection_threshold, clamp_distance_interval, clamp_haptic_interval,
    clamp_slope_interval, clamp_slope_multiplier, clamp_slope_threshold, clamp_stationary_threshold,
    WheelInteractionConfig,
};
use crate::distance::DistanceMonitor;
use crate::effector::{EffectorId, Effectors, HapticImpulse};
use crate::error::{InteractionError, InteractionResult};
use crate::haptics::HapticFeedbackMonitor;
use crate::schedule::{Cadence, CancellationToken, PollClock, PollTask, Step};
use crate::slope::{SlopeMonitor, SlopeSample};
use crate::world::{BodyId, Interactable, SelectionSystem, WheelWorld};

/// Collaborators a controller needs for one update.
pub struct InteractionContext<'a> {
    pub world: &'a mut dyn WheelWorld,
    pub selection: &'a mut dyn SelectionSystem,
    pub effectors: &'a mut Effectors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Grip seen, anchor not yet spawned
    Engaging,
    Active,
}

/// Everything a frame step produced for the host to publish.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    pub slope_changed: Option<SlopeSample>,
    pub forced_release: Option<EffectorId>,
    pub haptic: Option<HapticImpulse>,
}

#[derive(Debug)]
pub struct GrabSessionController {
    wheel: BodyId,
    radius: f32,
    config: WheelInteractionConfig,
    phase: SessionPhase,
    current_effector: Option<EffectorId>,
    engage: Option<PollTask>,
    /// Shared by every task of the current session
    session: CancellationToken,
    anchors: ProxyAnchorManager,
    brake: BrakeAssistMonitor,
    distance: DistanceMonitor,
    haptics: HapticFeedbackMonitor,
    slope: SlopeMonitor,
    enabled: bool,
    destroyed: bool,
}

impl GrabSessionController {
    /// Build a controller for `wheel`.
    ///
    /// Fails when the wheel body is missing or has no spherical collider
    /// to take a radius from.
    pub fn new(wheel: BodyId, config: WheelInteractionConfig, world: &dyn WheelWorld) -> InteractionResult<Self> {
        let config = config.validated()?;
        if world.body_state(wheel).is_none() {
            return Err(InteractionError::MissingWheelBody(wheel));
        }
        let radius = world
            .sphere_radius(wheel)
            .ok_or(InteractionError::MissingRadius(wheel))?;

        let mut slope = SlopeMonitor::new(radius, &config);
        if config.slope_enabled {
            slope.start();
        }
        Ok(Self {
            wheel,
            radius,
            phase: SessionPhase::Idle,
            current_effector: None,
            engage: None,
            session: CancellationToken::new(),
            anchors: ProxyAnchorManager::new(wheel),
            brake: BrakeAssistMonitor::new(&config),
            distance: DistanceMonitor::new(radius, config.deselection_threshold, config.distance_check_interval),
            haptics: HapticFeedbackMonitor::new(&config),
            slope,
            enabled: true,
            destroyed: false,
            config,
        })
    }

    /// Start a session for `effector`, ending any session already running.
    ///
    /// The anchor is set up on the next frame step, after the selection
    /// system has finished its own bookkeeping for this grip.
    pub fn on_grip_begin(&mut self, ctx: &mut InteractionContext, effector: EffectorId) {
        if self.destroyed || !self.enabled {
            debug!("Ignoring grip on inactive wheel {:?}", self.wheel);
            return;
        }
        self.teardown(ctx);
        self.current_effector = Some(effector);
        self.phase = SessionPhase::Engaging;
        self.session = CancellationToken::new();
        self.engage = Some(PollTask::linked(
            PollClock::immediate(Cadence::NextFrame),
            self.session.clone(),
        ));
        debug!("Grip began on {:?} by {:?}", self.wheel, effector);
    }

    /// End the session if `effector` owns it.
    pub fn on_grip_end(&mut self, ctx: &mut InteractionContext, effector: EffectorId) {
        if self.current_effector != Some(effector) {
            debug!("Ignoring release by {:?}: not the current grip on {:?}", effector, self.wheel);
            return;
        }
        self.teardown(ctx);
    }

    /// Tear down any session and stop slope sensing.
    pub fn on_disable(&mut self, ctx: &mut InteractionContext) {
        self.teardown(ctx);
        self.slope.stop();
        self.enabled = false;
    }

    pub fn on_enable(&mut self) {
        if self.destroyed || self.enabled {
            return;
        }
        self.enabled = true;
        if self.config.slope_enabled {
            self.slope.start();
        }
    }

    /// Final teardown; the controller ignores everything afterwards.
    pub fn on_destroy(&mut self, ctx: &mut InteractionContext) {
        self.teardown(ctx);
        self.slope.stop();
        self.enabled = false;
        self.destroyed = true;
    }

    /// Physics-step work: brake assist. Runs before the step integrates.
    pub fn fixed_update(&mut self, ctx: &mut InteractionContext, dt: f32) -> Option<BrakeEvent> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        let event = self.brake.tick(
            Step::Physics(dt),
            &self.anchors,
            ctx.effectors,
            ctx.world,
            self.wheel,
        )?;
        if self.config.reanchor_on_brake {
            self.reanchor(ctx, event.effector);
        }
        Some(event)
    }

    /// Frame-step work: deferred setup, distance, haptics and slope polling.
    pub fn frame_update(&mut self, ctx: &mut InteractionContext, dt: f32) -> FrameOutput {
        let mut output = FrameOutput::default();
        if self.destroyed {
            return output;
        }
        let step = Step::Frame(dt);

        // Hand-offs deferred by an earlier frame complete before a new engage
        // can schedule one, so a spawn never hands off in its own step.
        self.anchors.frame_update(ctx.selection, step);
        if self.phase == SessionPhase::Engaging && self.engage.as_mut().is_some_and(|t| t.due(step)) {
            self.engage = None;
            self.engage_session(ctx);
        }

        if let Some(effector) = self.distance.tick(
            step,
            &self.anchors,
            ctx.world,
            ctx.effectors,
            ctx.selection,
            self.wheel,
        ) {
            self.teardown(ctx);
            output.forced_release = Some(effector);
        }
        output.haptic = self
            .haptics
            .tick(step, &self.anchors, ctx.world, self.wheel, ctx.effectors);
        output.slope_changed = self.slope.tick(step, ctx.world, self.wheel);
        output
    }

    fn engage_session(&mut self, ctx: &mut InteractionContext) {
        let Some(effector) = self.current_effector else {
            return;
        };
        let Some(position) = ctx.effectors.position(effector) else {
            warn!("Effector {:?} vanished before its grip engaged", effector);
            self.teardown(ctx);
            return;
        };

        ctx.selection.cancel_selection(Interactable::Wheel(self.wheel));
        let spawned = self.anchors.spawn_anchor(
            ctx.world,
            ctx.selection,
            effector,
            position,
            self.radius,
            &self.config,
        );
        if spawned.is_none() {
            error!("Could not couple an anchor to wheel {:?}; grip dropped", self.wheel);
            self.teardown(ctx);
            return;
        }

        self.phase = SessionPhase::Active;
        self.brake.start(effector, ctx.effectors, self.session.clone());
        self.distance.start(effector, self.session.clone());
        if self.config.haptics_enabled {
            self.haptics
                .start(effector, ctx.world, self.wheel, ctx.effectors, self.session.clone());
        }
        info!("Grip session active on {:?} for {:?}", self.wheel, effector);
    }

    fn reanchor(&mut self, ctx: &mut InteractionContext, effector: EffectorId) {
        let Some(position) = ctx.effectors.position(effector) else {
            return;
        };
        let spawned = self.anchors.spawn_anchor(
            ctx.world,
            ctx.selection,
            effector,
            position,
            self.radius,
            &self.config,
        );
        if spawned.is_none() {
            warn!("Re-anchor failed on {:?}; ending session", self.wheel);
            self.teardown(ctx);
        }
    }

    /// Release the anchor, stop session monitors, forget the effector.
    /// A no-op when idle.
    fn teardown(&mut self, ctx: &mut InteractionContext) {
        if self.phase == SessionPhase::Idle && !self.anchors.has_active_anchor() {
            return;
        }
        self.session.cancel();
        self.engage = None;
        self.anchors.cleanup_anchor(ctx.world, ctx.selection);
        self.brake.stop();
        self.distance.stop();
        self.haptics.stop();
        if let Some(effector) = self.current_effector.take() {
            debug!("Grip session on {:?} ended for {:?}", self.wheel, effector);
        }
        self.phase = SessionPhase::Idle;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_effector(&self) -> Option<EffectorId> {
        self.current_effector
    }

    pub fn current_anchor(&self) -> Option<BodyId> {
        self.anchors.current_anchor()
    }

    pub fn on_slope(&self) -> bool {
        self.slope.on_slope()
    }

    /// One-shot slope query that leaves the sticky flag alone.
    pub fn probe_slope(&self, world: &dyn WheelWorld) -> Option<SlopeSample> {
        self.slope.probe(world, self.wheel)
    }

    pub fn wheel(&self) -> BodyId {
        self.wheel
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn config(&self) -> &WheelInteractionConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn brake_active(&self) -> bool {
        self.brake.is_active()
    }

    pub fn distance_active(&self) -> bool {
        self.distance.is_active()
    }

    pub fn haptics_active(&self) -> bool {
        self.haptics.is_active()
    }

    pub fn slope_active(&self) -> bool {
        self.slope.is_active()
    }

    /// Current release distance from the wheel center.
    pub fn release_threshold(&self) -> f32 {
        self.distance.current_threshold()
    }

    pub fn hand_distance(&self, world: &dyn WheelWorld, effectors: &Effectors) -> Option<f32> {
        self.distance.current_distance(world, effectors, self.wheel)
    }

    // Runtime tuning. Each setter clamps like `WheelInteractionConfig::validated`.

    pub fn set_stationary_threshold(&mut self, threshold: f32) {
        self.config.stationary_threshold = clamp_stationary_threshold(threshold);
        self.brake.set_stationary_threshold(threshold);
    }

    pub fn set_brake_force(&mut self, force: f32) {
        self.config.brake_force = clamp_brake_force(force);
        self.brake.set_brake_force(force);
    }

    pub fn set_deselection_threshold(&mut self, threshold: f32) {
        self.config.deselection_threshold = clamp_deselection_threshold(threshold);
        self.distance.set_deselection_threshold(threshold);
    }

    pub fn set_distance_check_interval(&mut self, interval: f32) {
        self.config.distance_check_interval = clamp_distance_interval(interval);
        self.distance.set_interval(interval);
    }

    pub fn set_haptic_interval(&mut self, interval: f32) {
        self.config.haptic_interval = clamp_haptic_interval(interval);
        self.haptics.set_interval(interval);
    }

    /// Returns false (and changes nothing) if the range would be empty.
    pub fn set_haptic_thresholds(&mut self, min_threshold: f32, max_value: f32) -> bool {
        if !self.haptics.set_thresholds(min_threshold, max_value) {
            return false;
        }
        let (min, max) = self.haptics.thresholds();
        self.config.haptic_min_threshold = min;
        self.config.haptic_max_value = max;
        true
    }

    pub fn set_haptics_enabled(&mut self, enabled: bool) {
        self.config.haptics_enabled = enabled;
    }

    pub fn set_slope_angle_threshold(&mut self, degrees: f32) {
        self.config.slope_angle_threshold = clamp_slope_threshold(degrees);
        self.slope.set_threshold(degrees);
    }

    pub fn set_slope_check_interval(&mut self, interval: f32) {
        self.config.slope_check_interval = clamp_slope_interval(interval);
        self.slope.set_interval(interval);
    }

    pub fn set_slope_ray_multiplier(&mut self, multiplier: f32) {
        self.config.slope_ray_multiplier = clamp_slope_multiplier(multiplier);
        self.slope.set_ray_multiplier(multiplier);
    }
}

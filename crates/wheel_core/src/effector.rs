//! Grip effectors: tracked hands that can hold a wheel.
//!
//! An effector exposes its pose directly and its optional capabilities
//! ([`VelocitySource`], [`HapticSink`]) as trait objects. A missing
//! capability is `None`, never a failed downcast.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bevy::math::{Quat, Vec3};
use bevy::prelude::Resource;

use crate::velocity::{TrackingSample, VelocitySource};

/// Stable key for a registered effector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectorId(pub u32);

/// A vibration request for a controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HapticImpulse {
    /// Strength in `[0, 1]`
    pub amplitude: f32,
    /// Seconds
    pub duration: f32,
    pub channel: u32,
}

/// Capability: the effector can vibrate.
pub trait HapticSink {
    fn send_impulse(&mut self, impulse: HapticImpulse);
}

/// Haptic sink that buffers impulses for the application to drain.
///
/// Clones share one buffer, so the application keeps a clone while the
/// effector owns the other.
#[derive(Debug, Clone, Default)]
pub struct HapticRecorder {
    queue: Arc<Mutex<Vec<HapticImpulse>>>,
}

impl HapticRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered impulse, oldest first.
    pub fn drain(&self) -> Vec<HapticImpulse> {
        match self.queue.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HapticSink for HapticRecorder {
    fn send_impulse(&mut self, impulse: HapticImpulse) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push(impulse);
        }
    }
}

type BoxedVelocity = Box<dyn VelocitySource + Send + Sync>;
type BoxedHaptics = Box<dyn HapticSink + Send + Sync>;

/// A tracked hand with optional capabilities.
pub struct GripEffector {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    velocity: Option<BoxedVelocity>,
    haptics: Option<BoxedHaptics>,
    ready_reported: bool,
}

impl GripEffector {
    pub fn new(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            rotation: Quat::IDENTITY,
            velocity: None,
            haptics: None,
            ready_reported: false,
        }
    }

    pub fn with_velocity(mut self, source: impl VelocitySource + Send + Sync + 'static) -> Self {
        self.velocity = Some(Box::new(source));
        self
    }

    pub fn with_haptics(mut self, sink: impl HapticSink + Send + Sync + 'static) -> Self {
        self.haptics = Some(Box::new(sink));
        self
    }

    /// Feed a tracking reading: updates the pose and the velocity source.
    pub fn track(&mut self, sample: TrackingSample) {
        if let Some(position) = sample.position {
            self.position = position;
        }
        if let Some(rotation) = sample.rotation {
            self.rotation = rotation;
        }
        if let Some(source) = self.velocity.as_mut() {
            source.sample(&sample);
        }
    }

    pub fn velocity_source(&self) -> Option<&(dyn VelocitySource + Send + Sync)> {
        self.velocity.as_deref()
    }

    pub fn haptic_sink(&mut self) -> Option<&mut (dyn HapticSink + Send + Sync + 'static)> {
        self.haptics.as_deref_mut()
    }

    pub fn has_velocity_source(&self) -> bool {
        self.velocity.is_some()
    }

    pub fn has_haptics(&self) -> bool {
        self.haptics.is_some()
    }

    /// Ready once its velocity source produced a valid reading.
    pub fn is_ready(&self) -> bool {
        self.velocity.as_ref().is_some_and(|v| v.is_ready())
    }
}

impl std::fmt::Debug for GripEffector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GripEffector")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("velocity", &self.velocity.is_some())
            .field("haptics", &self.haptics.is_some())
            .finish()
    }
}

/// Registry of every effector in the scene.
#[derive(Resource, Default, Debug)]
pub struct Effectors {
    effectors: HashMap<EffectorId, GripEffector>,
    next_id: u32,
}

impl Effectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, effector: GripEffector) -> EffectorId {
        let id = EffectorId(self.next_id);
        self.next_id += 1;
        self.effectors.insert(id, effector);
        id
    }

    pub fn remove(&mut self, id: EffectorId) -> Option<GripEffector> {
        self.effectors.remove(&id)
    }

    pub fn get(&self, id: EffectorId) -> Option<&GripEffector> {
        self.effectors.get(&id)
    }

    pub fn get_mut(&mut self, id: EffectorId) -> Option<&mut GripEffector> {
        self.effectors.get_mut(&id)
    }

    pub fn position(&self, id: EffectorId) -> Option<Vec3> {
        self.effectors.get(&id).map(|e| e.position)
    }

    /// Effectors that became ready since the last call, in id order.
    pub fn take_newly_ready(&mut self) -> Vec<EffectorId> {
        let mut ready: Vec<EffectorId> = self
            .effectors
            .iter_mut()
            .filter(|(_, e)| !e.ready_reported && e.is_ready())
            .map(|(id, e)| {
                e.ready_reported = true;
                *id
            })
            .collect();
        ready.sort();
        ready
    }

    pub fn len(&self) -> usize {
        self.effectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effectors.is_empty()
    }
}

//! Host simulation seam.
//!
//! The physics engine is an external collaborator. It only has to announce
//! body creation and collision pairs through the [`SimulationHost`]
//! registration points; the plugin subscribes to those instead of patching
//! the host's constructors.
//!
//! [`Simulation`] is a small in-memory host used by the demo and the tests.

use crate::sound::{SoundBody, SoundConfig};
use std::fmt;

/// Stable identifier of a body within one simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u64);

impl BodyId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// A body of the in-memory [`Simulation`].
#[derive(Debug, Clone)]
pub struct Body {
    id: BodyId,
    label: String,
    sound: Option<SoundConfig>,
}

impl Body {
    pub fn new(id: BodyId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            sound: None,
        }
    }

    pub fn with_sound(mut self, sound: SoundConfig) -> Self {
        self.sound = Some(sound);
        self
    }
}

impl SoundBody for Body {
    fn body_id(&self) -> BodyId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn sound(&self) -> Option<&SoundConfig> {
        self.sound.as_ref()
    }

    fn sound_mut(&mut self) -> &mut Option<SoundConfig> {
        &mut self.sound
    }
}

/// Two bodies that started, kept or stopped touching this step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CollisionPair {
    pub body_a: BodyId,
    pub body_b: BodyId,
}

impl CollisionPair {
    pub fn new(body_a: BodyId, body_b: BodyId) -> Self {
        Self { body_a, body_b }
    }
}

/// Mutable access to the bodies referenced by collision pairs.
pub trait BodySet<B> {
    /// Both bodies of a pair, or `None` when either is missing or the ids
    /// are the same.
    fn get_pair_mut(&mut self, a: BodyId, b: BodyId) -> Option<(&mut B, &mut B)>;
}

impl<B: SoundBody> BodySet<B> for Vec<B> {
    fn get_pair_mut(&mut self, a: BodyId, b: BodyId) -> Option<(&mut B, &mut B)> {
        if a == b {
            return None;
        }
        let ia = self.iter().position(|body| body.body_id() == a)?;
        let ib = self.iter().position(|body| body.body_id() == b)?;

        if ia < ib {
            let (head, tail) = self.split_at_mut(ib);
            Some((&mut head[ia], &mut tail[0]))
        } else {
            let (head, tail) = self.split_at_mut(ia);
            Some((&mut tail[0], &mut head[ib]))
        }
    }
}

/// One collision notification: every pair of the step plus access to the
/// bodies they name.
pub struct CollisionEvent<'a, B> {
    pub pairs: &'a [CollisionPair],
    pub bodies: &'a mut dyn BodySet<B>,
}

pub type BodyCreatedHook<B> = Box<dyn FnMut(&mut B)>;
pub type CollisionHook<B> = Box<dyn FnMut(&mut CollisionEvent<'_, B>)>;

/// Registration points a physics host exposes.
///
/// Hooks run synchronously, in registration order, on the thread that steps
/// the simulation.
pub trait SimulationHost {
    type Body: SoundBody;

    /// Called after a body is constructed, before it takes part in a step.
    fn on_body_created(&mut self, hook: BodyCreatedHook<Self::Body>);

    fn on_collision_start(&mut self, hook: CollisionHook<Self::Body>);

    fn on_collision_active(&mut self, hook: CollisionHook<Self::Body>);

    fn on_collision_end(&mut self, hook: CollisionHook<Self::Body>);
}

/// In-memory simulation: owns bodies and fans events out to hooks.
#[derive(Default)]
pub struct Simulation {
    bodies: Vec<Body>,
    next_id: u64,
    body_created: Vec<BodyCreatedHook<Body>>,
    collision_start: Vec<CollisionHook<Body>>,
    collision_active: Vec<CollisionHook<Body>>,
    collision_end: Vec<CollisionHook<Body>>,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a body, runs the body-created hooks on it and stores it.
    pub fn create_body(&mut self, label: impl Into<String>, sound: Option<SoundConfig>) -> BodyId {
        let id = BodyId::new(self.next_id);
        self.next_id += 1;

        let mut body = Body::new(id, label);
        body.sound = sound;
        for hook in self.body_created.iter_mut() {
            hook(&mut body);
        }

        log::trace!("Created {} '{}'", id, body.label);
        self.bodies.push(body);
        id
    }

    /// Removes a body together with its sound configuration.
    pub fn destroy_body(&mut self, id: BodyId) -> Option<Body> {
        let index = self.bodies.iter().position(|b| b.id == id)?;
        Some(self.bodies.remove(index))
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn emit_collision_start(&mut self, pairs: &[CollisionPair]) {
        fire(&mut self.collision_start, &mut self.bodies, pairs);
    }

    pub fn emit_collision_active(&mut self, pairs: &[CollisionPair]) {
        fire(&mut self.collision_active, &mut self.bodies, pairs);
    }

    pub fn emit_collision_end(&mut self, pairs: &[CollisionPair]) {
        fire(&mut self.collision_end, &mut self.bodies, pairs);
    }
}

fn fire(hooks: &mut [CollisionHook<Body>], bodies: &mut Vec<Body>, pairs: &[CollisionPair]) {
    if pairs.is_empty() {
        return;
    }
    let mut event = CollisionEvent { pairs, bodies };
    for hook in hooks.iter_mut() {
        hook(&mut event);
    }
}

impl SimulationHost for Simulation {
    type Body = Body;

    fn on_body_created(&mut self, hook: BodyCreatedHook<Body>) {
        self.body_created.push(hook);
    }

    fn on_collision_start(&mut self, hook: CollisionHook<Body>) {
        self.collision_start.push(hook);
    }

    fn on_collision_active(&mut self, hook: CollisionHook<Body>) {
        self.collision_active.push(hook);
    }

    fn on_collision_end(&mut self, hook: CollisionHook<Body>) {
        self.collision_end.push(hook);
    }
}

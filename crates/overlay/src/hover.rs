//! Turns per-frame hit lists into hover enter/leave callbacks.

use scene::EntitySet;
use scene::entity::EntityId;
use tracing::trace;

use crate::config::HoverComparison;

pub type MeshOverFn = Box<dyn FnMut(EntityId)>;
pub type MeshOutFn = Box<dyn FnMut()>;

/// User hooks fired by [`HoverDispatcher`]. Both are optional.
#[derive(Default)]
pub struct HoverCallbacks {
    mesh_over: Option<MeshOverFn>,
    mesh_out: Option<MeshOutFn>,
}

impl HoverCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_mesh_over(mut self, f: impl FnMut(EntityId) + 'static) -> Self {
        self.mesh_over = Some(Box::new(f));
        self
    }

    pub fn on_mesh_out(mut self, f: impl FnMut() + 'static) -> Self {
        self.mesh_out = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for HoverCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoverCallbacks")
            .field("mesh_over", &self.mesh_over.is_some())
            .field("mesh_out", &self.mesh_out.is_some())
            .finish()
    }
}

/// Callbacks fired by one [`HoverDispatcher::dispatch`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct HoverOutcome {
    pub over: usize,
    pub out: usize,
}

/// Tracks which meshes are under the pointer.
///
/// Until armed, dispatches only record the active list; no callbacks fire.
#[derive(Debug)]
pub struct HoverDispatcher {
    comparison: HoverComparison,
    armed: bool,
    active: Vec<EntityId>,
    callbacks: HoverCallbacks,
}

impl HoverDispatcher {
    pub fn new(comparison: HoverComparison, callbacks: HoverCallbacks) -> Self {
        Self {
            comparison,
            armed: false,
            active: Vec::new(),
            callbacks,
        }
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn comparison(&self) -> HoverComparison {
        self.comparison
    }

    pub fn set_comparison(&mut self, comparison: HoverComparison) {
        self.comparison = comparison;
    }

    pub fn set_callbacks(&mut self, callbacks: HoverCallbacks) {
        self.callbacks = callbacks;
    }

    /// Meshes hit in the last dispatched frame, nearest first.
    pub fn active(&self) -> &[EntityId] {
        &self.active
    }

    /// Forgets the active list without firing anything.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Compares `hits` with the previous frame's hits and fires callbacks.
    ///
    /// While disarmed the hits still become the active list, so the first
    /// armed frame compares against what the pointer was already over.
    pub fn dispatch(&mut self, hits: &[EntityId]) -> HoverOutcome {
        let mut outcome = HoverOutcome::default();
        if !self.armed {
            self.active.clear();
            self.active.extend_from_slice(hits);
            return outcome;
        }
        match self.comparison {
            HoverComparison::Count => {
                if hits.len() != self.active.len() {
                    if hits.is_empty() {
                        self.fire_out(&mut outcome);
                    } else {
                        for &entity in hits {
                            self.fire_over(entity, &mut outcome);
                        }
                    }
                }
            }
            HoverComparison::Identity => {
                let previous: EntitySet = self.active.iter().copied().collect();
                for &entity in hits {
                    if !previous.contains(entity) {
                        self.fire_over(entity, &mut outcome);
                    }
                }
                if hits.is_empty() && !self.active.is_empty() {
                    self.fire_out(&mut outcome);
                }
            }
        }
        self.active.clear();
        self.active.extend_from_slice(hits);
        outcome
    }

    fn fire_over(&mut self, entity: EntityId, outcome: &mut HoverOutcome) {
        trace!(%entity, "mesh over");
        outcome.over += 1;
        if let Some(f) = self.callbacks.mesh_over.as_mut() {
            f(entity);
        }
    }

    fn fire_out(&mut self, outcome: &mut HoverOutcome) {
        trace!("mesh out");
        outcome.out += 1;
        if let Some(f) = self.callbacks.mesh_out.as_mut() {
            f();
        }
    }
}

//! The choice-point stack and its per-point trail.
//!
//! Each [`ChoicePoint`] remembers the frame that was active when it was
//! created, the ancestry stamp at that moment, the arena length to cut
//! frames back to, the remaining alternatives and the trail of variables
//! bound since. Only bindings of frames at least as old as the point are
//! trailed; younger frames are discarded wholesale on backtrack.

use crate::code::Choice;
use crate::{Code, FrameId, Frames, PrologError, Query, VarRef};
use std::fmt;
use std::rc::Rc;

/// A source of alternative continuations for a choice point.
pub trait Alternatives {
    fn has_next(&self) -> bool;

    /// Produces the next continuation. Called with the query's current
    /// frame restored to the frame captured by the choice point.
    fn next(&mut self, query: &mut Query) -> Result<Code, PrologError>;
}

/// The remaining branches of a disjunction.
pub(crate) struct Branches {
    choice: Rc<Choice>,
    index: usize,
}

impl Branches {
    pub(crate) fn new(choice: Rc<Choice>) -> Self {
        Branches { choice, index: 1 }
    }
}

impl Alternatives for Branches {
    #[inline]
    fn has_next(&self) -> bool {
        self.index < self.choice.branches().len()
    }

    fn next(&mut self, _query: &mut Query) -> Result<Code, PrologError> {
        let code = self
            .choice
            .branches()
            .get(self.index)
            .cloned()
            .unwrap_or(Code::Fail);
        self.index += 1;
        Ok(code)
    }
}

/// A single deferred continuation, run when everything above it failed.
pub struct Once(Option<Box<dyn FnOnce(&mut Query) -> Result<Code, PrologError>>>);

impl Once {
    pub fn new(f: impl FnOnce(&mut Query) -> Result<Code, PrologError> + 'static) -> Self {
        Once(Some(Box::new(f)))
    }
}

impl Alternatives for Once {
    #[inline]
    fn has_next(&self) -> bool {
        self.0.is_some()
    }

    fn next(&mut self, query: &mut Query) -> Result<Code, PrologError> {
        match self.0.take() {
            Some(f) => f(query),
            None => Ok(Code::Fail),
        }
    }
}

/// Marks a position on the stack without offering any alternative.
pub struct Barrier;

impl Alternatives for Barrier {
    #[inline]
    fn has_next(&self) -> bool {
        false
    }

    fn next(&mut self, _query: &mut Query) -> Result<Code, PrologError> {
        Ok(Code::Fail)
    }
}

/// A saved resumption state.
pub struct ChoicePoint {
    id: u64,
    frame: FrameId,
    ancestry: u64,
    local: bool,
    scope: Option<u32>,
    mark: usize,
    alternatives: Option<Box<dyn Alternatives>>,
    trail: Vec<VarRef>,
}

impl ChoicePoint {
    /// Serial number, unique within the query.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    #[inline]
    pub fn ancestry(&self) -> u64 {
        self.ancestry
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        self.local
    }

    #[inline]
    pub(crate) fn mark(&self) -> usize {
        self.mark
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.alternatives.as_ref().is_some_and(|a| a.has_next())
    }

    #[inline]
    pub(crate) fn take_alternatives(&mut self) -> Option<Box<dyn Alternatives>> {
        self.alternatives.take()
    }

    #[inline]
    pub(crate) fn restore_alternatives(&mut self, alternatives: Box<dyn Alternatives>) {
        self.alternatives = Some(alternatives);
    }

    /// Trails `var` if its frame is at least as old as this point.
    #[inline]
    fn record(&mut self, frames: &Frames, var: VarRef) {
        if frames.ordinal(var.frame()) <= self.ancestry {
            self.trail.push(var);
        }
    }

    /// Clears every binding trailed on this point.
    pub(crate) fn undo(&mut self, frames: &mut Frames) {
        for var in self.trail.drain(..) {
            if let Some(slot) = frames.slot_mut(&var) {
                slot.value = None;
                slot.scratch = None;
            }
        }
    }
}

impl fmt::Debug for ChoicePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChoicePoint")
            .field("id", &self.id)
            .field("frame", &self.frame)
            .field("ancestry", &self.ancestry)
            .field("local", &self.local)
            .field("scope", &self.scope)
            .field("trail", &self.trail.len())
            .field("has_next", &self.has_next())
            .finish()
    }
}

/// The stack of choice points. An empty stack is the guard: failing
/// with nothing on it fails the query.
#[derive(Debug, Default)]
pub struct ChoiceStack {
    points: Vec<ChoicePoint>,
    serial: u64,
}

impl ChoiceStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn top(&self) -> Option<&ChoicePoint> {
        self.points.last()
    }

    #[inline]
    pub(crate) fn top_mut(&mut self) -> Option<&mut ChoicePoint> {
        self.points.last_mut()
    }

    /// Finds a point by id.
    pub(crate) fn get_mut(&mut self, id: u64) -> Option<&mut ChoicePoint> {
        self.points.iter_mut().rev().find(|cp| cp.id == id)
    }

    /// True if some point still has an untried alternative.
    pub fn can_backtrack(&self) -> bool {
        self.points.iter().any(ChoicePoint::has_next)
    }

    /// Pushes a new point and returns its id.
    pub(crate) fn push(
        &mut self,
        frame: FrameId,
        ancestry: u64,
        mark: usize,
        scope: Option<u32>,
        alternatives: Box<dyn Alternatives>,
    ) -> u64 {
        self.serial += 1;
        self.points.push(ChoicePoint {
            id: self.serial,
            frame,
            ancestry,
            local: scope.is_some(),
            scope,
            mark,
            alternatives: Some(alternatives),
            trail: Vec::new(),
        });
        self.serial
    }

    /// Trails a committed binding on the topmost point.
    #[inline]
    pub(crate) fn record(&mut self, frames: &Frames, var: VarRef) {
        if let Some(top) = self.points.last_mut() {
            top.record(frames, var);
        }
    }

    /// Pops the topmost point, moving its still-relevant trail entries
    /// onto the new top.
    pub(crate) fn pop_and_drain(&mut self, frames: &Frames) -> Option<ChoicePoint> {
        let mut cp = self.points.pop()?;
        let trail = std::mem::take(&mut cp.trail);
        self.drain(frames, trail);
        Some(cp)
    }

    /// Pops the topmost point without touching its trail. Used after
    /// the trail has been undone.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<ChoicePoint> {
        self.points.pop()
    }

    fn drain(&mut self, frames: &Frames, trail: Vec<VarRef>) {
        if let Some(top) = self.points.last_mut() {
            for var in trail {
                top.record(frames, var);
            }
        }
    }

    /// Removes every point created at or after `ancestry`. A local cut
    /// `(scope, frame)` stops right after removing the matching
    /// disjunction point, leaving older alternatives of the clause alone.
    /// Returns the number of points removed.
    pub(crate) fn cut(
        &mut self,
        frames: &Frames,
        ancestry: u64,
        local: Option<(u32, FrameId)>,
    ) -> usize {
        let mut trail = Vec::new();
        let mut removed = 0;
        while let Some(top) = self.points.last() {
            if top.ancestry < ancestry {
                break;
            }
            let stop = matches!(local, Some((scope, frame))
                if top.local && top.scope == Some(scope) && top.frame == frame);
            if let Some(mut cp) = self.points.pop() {
                trail.append(&mut cp.trail);
            }
            removed += 1;
            if stop {
                break;
            }
        }
        self.drain(frames, trail);
        removed
    }

    /// Undoes and removes every point down to and including the one
    /// with the given id, then cuts the arena back to its mark. Returns
    /// false if no such point is on the stack.
    pub(crate) fn unwind_to(&mut self, frames: &mut Frames, id: u64) -> bool {
        if !self.points.iter().any(|cp| cp.id == id) {
            return false;
        }
        while let Some(mut cp) = self.points.pop() {
            cp.undo(frames);
            if cp.id == id {
                frames.truncate(cp.mark);
                break;
            }
        }
        true
    }

    /// Drops every point. Used when the query is abandoned.
    #[inline]
    pub(crate) fn clear(&mut self) {
        self.points.clear();
    }
}

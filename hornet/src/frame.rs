//! Call frames and the per-query [`Frames`] arena that owns them.
//!
//! A frame holds the local variable slots of one procedure activation, the
//! link to its caller and the continuation to resume there. Frames live in
//! an index-addressed arena; references to variables carry a [`FrameId`]
//! rather than a pointer. On backtracking the arena is truncated back to
//! the length it had when the choice point was created, since every frame
//! pushed after that point is unreachable.

use crate::term::{compound_addr, CYCLE};
use crate::{Code, Procedure, PrologError, Term, Var, VarRef};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Index of a frame inside a [`Frames`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        FrameId(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A local variable cell: the committed value plus a scratch value used
/// for tentative bindings while unification is in progress.
#[derive(Debug, Clone, Default)]
pub(crate) struct Slot {
    pub(crate) value: Option<Term>,
    pub(crate) scratch: Option<Term>,
}

/// One procedure activation.
pub struct Frame {
    ancestry: u64,
    ordinal: u64,
    caller: Option<FrameId>,
    next: Code,
    procedure: Option<Rc<dyn Procedure>>,
    depth: usize,
    owner: FrameId,
    slots: Vec<Slot>,
}

impl Frame {
    /// Creation rank of the activation; drives the scope of cut.
    #[inline]
    pub fn ancestry(&self) -> u64 {
        self.ancestry
    }

    /// Age of the slots this frame resolves variables in. Frames spliced
    /// onto a base share its ordinal.
    #[inline]
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    #[inline]
    pub fn caller(&self) -> Option<FrameId> {
        self.caller
    }

    /// Continuation to resume in the caller once this frame succeeds.
    #[inline]
    pub fn next(&self) -> &Code {
        &self.next
    }

    #[inline]
    pub fn procedure(&self) -> Option<&Rc<dyn Procedure>> {
        self.procedure.as_ref()
    }

    /// Length of the caller chain below this frame.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The frame whose slot table this frame uses.
    #[inline]
    pub fn owner(&self) -> FrameId {
        self.owner
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("ancestry", &self.ancestry)
            .field("ordinal", &self.ordinal)
            .field("caller", &self.caller)
            .field("depth", &self.depth)
            .field("owner", &self.owner)
            .field("slots", &self.slots.len())
            .finish()
    }
}

/// Arena of frames for a single query.
#[derive(Default)]
pub struct Frames {
    frames: Vec<Frame>,
}

impl Frames {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the frame with the given id.
    ///
    /// # Panics
    /// Panics if `id` was discarded by backtracking.
    #[inline]
    pub fn get(&self, id: FrameId) -> &Frame {
        &self.frames[id.0]
    }

    /// Pushes a new frame. With a `base`, the new frame shares the base's
    /// slot table and ordinal instead of allocating `locals` slots.
    pub(crate) fn push(
        &mut self,
        ancestry: u64,
        caller: Option<FrameId>,
        next: Code,
        procedure: Option<Rc<dyn Procedure>>,
        locals: usize,
        base: Option<FrameId>,
    ) -> FrameId {
        let id = FrameId(self.frames.len());
        let depth = caller.map_or(0, |c| self.frames[c.0].depth + 1);
        let (owner, ordinal, slots) = match base {
            Some(base) => {
                let owner = self.frames[base.0].owner;
                (owner, self.frames[owner.0].ordinal, Vec::new())
            }
            None => (id, ancestry, vec![Slot::default(); locals]),
        };
        self.frames.push(Frame {
            ancestry,
            ordinal,
            caller,
            next,
            procedure,
            depth,
            owner,
            slots,
        });
        id
    }

    /// Drops every frame created at or after `mark`.
    #[inline]
    pub(crate) fn truncate(&mut self, mark: usize) {
        self.frames.truncate(mark.max(1));
    }

    #[inline]
    pub fn owner(&self, id: FrameId) -> FrameId {
        self.frames[id.0].owner
    }

    /// Ordinal of the frame owning `id`'s slots, or 0 for a discarded frame.
    #[inline]
    pub fn ordinal(&self, id: FrameId) -> u64 {
        self.frames.get(id.0).map_or(0, |f| f.ordinal)
    }

    /// Number of local slots available to `id`.
    #[inline]
    pub fn locals(&self, id: FrameId) -> usize {
        self.frames[self.owner(id).0].slots.len()
    }

    /// Grows the slot table used by `id` by `count` unbound slots and
    /// returns the index of the first new slot.
    pub fn expand_locals(&mut self, id: FrameId, count: usize) -> usize {
        let owner = self.owner(id);
        let slots = &mut self.frames[owner.0].slots;
        let first = slots.len();
        slots.resize(first + count, Slot::default());
        first
    }

    #[inline]
    pub(crate) fn slot(&self, var: &VarRef) -> Option<&Slot> {
        self.frames.get(var.frame().0)?.slots.get(var.var().slot())
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, var: &VarRef) -> Option<&mut Slot> {
        self.frames.get_mut(var.frame().0)?.slots.get_mut(var.var().slot())
    }

    /// Committed value of local slot `index` of `id`.
    pub fn value(&self, id: FrameId, index: usize) -> Option<&Term> {
        let owner = self.owner(id);
        self.frames[owner.0].slots.get(index)?.value.as_ref()
    }

    /// Writes a committed value into a local slot without trailing it.
    /// Only meant for slots of a frame that was just created.
    pub fn set_value(&mut self, id: FrameId, index: usize, value: Term) {
        let owner = self.owner(id);
        if let Some(slot) = self.frames[owner.0].slots.get_mut(index) {
            slot.value = Some(value);
            slot.scratch = None;
        }
    }

    /// Pairs `term` with frame `id`, producing an instance view.
    #[inline]
    pub fn bind(&self, term: &Term, id: FrameId) -> Term {
        term.bind_to(self.owner(id))
    }

    #[inline]
    pub(crate) fn bind_opt(&self, term: &Term, id: Option<FrameId>) -> Term {
        match id {
            Some(id) => self.bind(term, id),
            None => term.clone(),
        }
    }

    /// Follows committed bindings until an unbound reference or a
    /// non-variable value is reached.
    #[inline]
    pub fn resolve(&self, term: &Term) -> Term {
        self.deref(term, None, false)
    }

    /// Like [`Frames::resolve`], but also sees tentative bindings.
    #[inline]
    pub(crate) fn tentative(&self, term: &Term, frame: Option<FrameId>) -> Term {
        self.deref(term, frame, true)
    }

    fn deref(&self, term: &Term, frame: Option<FrameId>, scratch: bool) -> Term {
        let mut var = match term {
            Term::Var(v) if !v.is_wildcard() => match frame {
                Some(frame) => VarRef::new(v.clone(), self.owner(frame)),
                None => return term.clone(),
            },
            Term::Ref(r) => r.clone(),
            _ => return term.clone(),
        };
        loop {
            let next = self.slot(&var).and_then(|slot| match &slot.value {
                Some(value) => Some(value),
                None if scratch => slot.scratch.as_ref(),
                None => None,
            });
            match next {
                Some(Term::Ref(r)) => var = r.clone(),
                Some(value) => return value.clone(),
                None => return Term::Ref(var),
            }
        }
    }

    /// Resolves `term` and forces thunks until a concrete term appears.
    pub fn strip(&self, term: &Term) -> Result<Term, PrologError> {
        let mut term = self.resolve(term);
        while let Term::Thunk(thunk) = &term {
            term = self.resolve(&thunk.force()?);
        }
        Ok(term)
    }

    /// Reads a proper list into a vector of (unresolved) elements.
    pub fn list_items(&self, list: &Term) -> Result<Vec<Term>, PrologError> {
        let mut items = Vec::new();
        let mut rest = self.strip(list)?;
        loop {
            match &rest {
                Term::Atom(a) if a == crate::term::NIL => return Ok(items),
                Term::Var(_) | Term::Ref(_) => return Err(PrologError::instantiation_error()),
                t if t.has_functor(crate::term::DOT, 2) => {
                    let (head, tail) = t
                        .split(crate::term::DOT)
                        .ok_or_else(|| PrologError::type_error("list", list.clone()))?;
                    items.push(head);
                    rest = self.strip(&tail)?;
                }
                _ => return Err(PrologError::type_error("list", list.clone())),
            }
        }
    }

    /// Collects the distinct unbound variables of `term` in depth-first,
    /// left-to-right order.
    pub fn variables(&self, term: &Term) -> Vec<Term> {
        fn walk(frames: &Frames, term: &Term, seen: &mut Vec<Term>) {
            let term = frames.resolve(term);
            match &term {
                Term::Ref(_) | Term::Var(_) if !term.is_wildcard() => {
                    if !seen.contains(&term) {
                        seen.push(term);
                    }
                }
                Term::Compound(_) | Term::CompoundRef(_) => {
                    for arg in term.args() {
                        walk(frames, &arg, seen);
                    }
                }
                _ => {}
            }
        }
        let mut seen = Vec::new();
        walk(self, term, &mut seen);
        seen
    }

    /// Copies `term` out of its frames into a detached template whose fresh
    /// variables are numbered from zero.
    pub fn unbind(&self, term: &Term) -> Term {
        Copier::new(self, 0).copy(term)
    }

    /// Copies several terms, sharing fresh variables between them.
    pub fn unbind_all<'t>(&self, terms: impl IntoIterator<Item = &'t Term>) -> Vec<Term> {
        let mut copier = Copier::new(self, 0);
        terms.into_iter().map(|t| copier.copy(t)).collect()
    }

    /// Copies `term` into fresh variables allocated in frame `id`.
    pub fn rebind(&mut self, term: &Term, id: FrameId) -> Term {
        let owner = self.owner(id);
        let base = self.locals(owner);
        let (copy, used) = {
            let mut copier = Copier::new(self, base as u32);
            let copy = copier.copy(term);
            (copy, copier.counter as usize - base)
        };
        self.expand_locals(owner, used);
        copy.bind_to(owner)
    }
}

#[derive(PartialEq, Eq, Hash)]
enum CopyKey {
    Cell(VarRef),
    Template(u32),
    Named(crate::Atom),
    Compound(usize, Option<FrameId>),
}

/// Structure copier with a visited map. Compounds are entered into the
/// map before their arguments are visited, so a cyclic structure copies
/// to a finite term with [`CYCLE`] at the point of recurrence.
struct Copier<'f> {
    frames: &'f Frames,
    counter: u32,
    done: HashMap<CopyKey, Term>,
}

impl<'f> Copier<'f> {
    fn new(frames: &'f Frames, counter: u32) -> Self {
        Copier {
            frames,
            counter,
            done: HashMap::new(),
        }
    }

    fn fresh(&mut self, key: CopyKey) -> Term {
        let id = self.counter;
        self.counter += 1;
        let name = crate::Atom::new(format!("_G{}", id));
        let var = Term::Var(Var::indexed(id, name));
        self.done.insert(key, var.clone());
        var
    }

    fn copy(&mut self, term: &Term) -> Term {
        match term {
            Term::Ref(_) => match self.frames.resolve(term) {
                Term::Ref(r) => {
                    let key = CopyKey::Cell(r);
                    match self.done.get(&key) {
                        Some(copy) => copy.clone(),
                        None => self.fresh(key),
                    }
                }
                value => self.copy(&value),
            },
            Term::Var(v) if !v.is_wildcard() => {
                let key = if v.is_indexed() {
                    CopyKey::Template(v.id())
                } else {
                    CopyKey::Named(v.name().clone())
                };
                match self.done.get(&key) {
                    Some(copy) => copy.clone(),
                    None => self.fresh(key),
                }
            }
            Term::CompoundRef(r) => {
                let frame = r.frame();
                self.compound(r.template(), Some(frame))
            }
            Term::Compound(c) if !c.is_instance() => self.compound(c, None),
            _ => term.clone(),
        }
    }

    fn compound(&mut self, c: &Rc<crate::Compound>, frame: Option<FrameId>) -> Term {
        let key = CopyKey::Compound(compound_addr(c), frame);
        if let Some(copy) = self.done.get(&key) {
            return copy.clone();
        }
        self.done.insert(
            CopyKey::Compound(compound_addr(c), frame),
            Term::atom(CYCLE),
        );
        let args = c
            .args()
            .iter()
            .map(|arg| {
                let arg = match frame {
                    Some(frame) => arg.bind_to(frame),
                    None => arg.clone(),
                };
                self.copy(&arg)
            })
            .collect();
        let copy = Term::compound(c.name().as_str(), args);
        self.done.insert(key, copy.clone());
        copy
    }
}

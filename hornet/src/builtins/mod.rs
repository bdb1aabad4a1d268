//! The foreign library: built-in predicates implemented as [`Procedure`]s.
//!
//! Simple tests and unifications are [`Det`] procedures, which run without
//! a frame of their own and either continue or fail. Anything that needs
//! a frame, a choice point or control over the continuation is a
//! [`Foreign`] procedure or a dedicated type.

mod arith;
mod atoms;
mod control;
mod io;
mod store;
mod system;
mod terms;

use crate::procedure::CallSite;
use crate::{Alternatives, Code, Database, Predicate, Procedure, PrologError, Query, Term};
use std::fmt;
use std::rc::Rc;

/// Signature of a deterministic built-in. Arguments arrive bound to the
/// caller's frame but not dereferenced.
pub type DetFn = fn(&mut Query, &[Term]) -> Result<bool, PrologError>;

/// Signature of a built-in running in its own frame.
pub type ForeignFn = fn(&mut Query, &[Term]) -> Result<Code, PrologError>;

/// A frameless built-in that succeeds at most once.
pub struct Det {
    predicate: Predicate,
    f: DetFn,
}

impl Det {
    pub fn new(name: &str, arity: usize, f: DetFn) -> Self {
        Det {
            predicate: Predicate::new(name, arity),
            f,
        }
    }
}

impl Procedure for Det {
    fn predicate(&self) -> Option<Predicate> {
        Some(self.predicate.clone())
    }

    fn call(&self, query: &mut Query, site: &CallSite<'_>) -> Result<Code, PrologError> {
        let args = site.bound_args(query);
        if (self.f)(query, &args)? {
            Ok(site.next.clone())
        } else {
            Ok(Code::Fail)
        }
    }
}

impl fmt::Debug for Det {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Det({})", self.predicate)
    }
}

/// A built-in with an activation frame. It returns [`Code::Succeed`] to
/// exit, [`Code::Fail`] to fail, or any code to run inside its frame.
pub struct Foreign {
    predicate: Predicate,
    locals: usize,
    f: ForeignFn,
}

impl Foreign {
    pub fn new(name: &str, arity: usize, f: ForeignFn) -> Self {
        Foreign {
            predicate: Predicate::new(name, arity),
            locals: 0,
            f,
        }
    }
}

impl Procedure for Foreign {
    fn predicate(&self) -> Option<Predicate> {
        Some(self.predicate.clone())
    }

    #[inline]
    fn locals(&self) -> usize {
        self.locals
    }

    fn invoke(&self, query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
        (self.f)(query, args)
    }
}

impl fmt::Debug for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Foreign({})", self.predicate)
    }
}

/// `Succeed` or `Fail`.
#[inline]
pub(crate) fn outcome(ok: bool) -> Code {
    if ok {
        Code::Succeed
    } else {
        Code::Fail
    }
}

/// Precomputed answers, each unified with `target` in turn.
pub(crate) struct Candidates {
    items: std::vec::IntoIter<Term>,
    target: Term,
}

impl Candidates {
    pub(crate) fn new(items: Vec<Term>, target: Term) -> Self {
        Candidates {
            items: items.into_iter(),
            target,
        }
    }
}

impl Alternatives for Candidates {
    #[inline]
    fn has_next(&self) -> bool {
        !self.items.as_slice().is_empty()
    }

    fn next(&mut self, query: &mut Query) -> Result<Code, PrologError> {
        for item in self.items.by_ref() {
            if query.unify(&self.target, &item)? {
                return Ok(Code::Succeed);
            }
        }
        Ok(Code::Fail)
    }
}

/// Leaves a choice point over `items`, or fails if there are none.
pub(crate) fn enumerate(query: &mut Query, items: Vec<Term>, target: Term) -> Code {
    if !items.is_empty() {
        query.push_choice_point(Candidates::new(items, target));
    }
    Code::Fail
}

pub(crate) fn det(db: &Database, name: &str, arity: usize, f: DetFn) -> Result<(), PrologError> {
    db.register(Rc::new(Det::new(name, arity, f)))
}

pub(crate) fn foreign(db: &Database, name: &str, arity: usize, f: ForeignFn) -> Result<(), PrologError> {
    db.register(Rc::new(Foreign::new(name, arity, f)))
}

/// Registers the whole library.
pub(crate) fn install(db: &Rc<Database>) -> Result<(), PrologError> {
    control::install(db)?;
    terms::install(db)?;
    arith::install(db)?;
    store::install(db)?;
    atoms::install(db)?;
    system::install(db)?;
    io::install(db)?;
    control::install_library(db)
}

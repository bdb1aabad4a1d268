//! The [`Procedure`] contract shared by compiled clauses and foreign code.

use crate::{Clause, Code, FrameId, Predicate, PrologError, Query, Term};
use std::rc::Rc;

/// Everything a procedure needs to know about the call being made.
pub struct CallSite<'a> {
    /// The procedure being called, as stored in the table or goal.
    pub procedure: &'a Rc<dyn Procedure>,
    /// Argument templates, to be read in `caller`.
    pub args: &'a [Term],
    /// Ancestry stamp of the new activation.
    pub ancestry: u64,
    /// The frame the arguments belong to.
    pub caller: FrameId,
    /// Where to continue on success. After tail-call elision this is the
    /// continuation of a frame further down the chain.
    pub next: Code,
}

impl CallSite<'_> {
    /// Arguments paired with the caller frame.
    pub fn bound_args(&self, query: &Query) -> Vec<Term> {
        self.args
            .iter()
            .map(|arg| query.frames().bind(arg, self.caller))
            .collect()
    }
}

/// Something that can be called: a compiled clause or a foreign procedure.
///
/// The default [`call`](Procedure::call) enters a new frame with
/// [`locals`](Procedure::locals) slots and continues with
/// [`call_in`](Procedure::call_in), which by default reads the arguments
/// and runs [`invoke`](Procedure::invoke). Implementations override at
/// whichever level they need.
pub trait Procedure {
    /// The predicate this procedure is registered under, if any.
    fn predicate(&self) -> Option<Predicate> {
        None
    }

    /// Number of local slots the activation frame needs.
    fn locals(&self) -> usize {
        0
    }

    fn call(&self, query: &mut Query, site: &CallSite<'_>) -> Result<Code, PrologError> {
        query.enter(site, self.locals(), None);
        self.call_in(query, site)
    }

    /// Runs inside the freshly entered frame.
    fn call_in(&self, query: &mut Query, site: &CallSite<'_>) -> Result<Code, PrologError> {
        let args = site.bound_args(query);
        self.invoke(query, &args)
    }

    fn invoke(&self, _query: &mut Query, _args: &[Term]) -> Result<Code, PrologError> {
        match self.predicate() {
            Some(p) => crate::bail!("{} cannot be invoked directly", p),
            None => crate::bail!("procedure cannot be invoked directly"),
        }
    }

    /// Offered every program error raised while this procedure's frame
    /// is on the call chain. Returning a continuation resumes there.
    fn catches(&self, _query: &mut Query, _ball: &Term) -> Result<Option<Code>, PrologError> {
        Ok(None)
    }

    fn as_clause(&self) -> Option<&Clause> {
        None
    }
}

/// Identity of a procedure allocation, ignoring the vtable.
#[inline]
pub(crate) fn same_procedure(a: &Rc<dyn Procedure>, b: &Rc<dyn Procedure>) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

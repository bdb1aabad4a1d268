//! Defines [`Code`], the continuation tree produced by the clause compiler.
//!
//! A frame never holds a program counter. It holds the [`Code`] node to
//! resume once the callee succeeds, and nodes are shared immutably between
//! every activation of the clause they were compiled from.

use crate::{Procedure, Table, Term};
use std::fmt;
use std::rc::Rc;

/// A node of compiled code.
#[derive(Clone)]
pub enum Code {
    /// Terminal success: return to the caller frame.
    Succeed,
    /// Terminal failure: backtrack.
    Fail,
    /// Try each branch in order.
    Choice(Rc<Choice>),
    /// Discard choice points, then continue.
    Cut(Rc<Cut>),
    /// Call a procedure or a database table.
    Call(Rc<Goal>),
    /// Continue with the inner node. Keeps a call in front of it from
    /// being treated as a tail call.
    Noop(Rc<Code>),
}

/// A disjunction. A local choice carries the scope id of its
/// if-then-else, which a matching local cut stops at.
pub struct Choice {
    branches: Box<[Code]>,
    scope: Option<u32>,
}

impl Choice {
    #[inline]
    pub fn branches(&self) -> &[Code] {
        &self.branches
    }

    #[inline]
    pub fn scope(&self) -> Option<u32> {
        self.scope
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        self.scope.is_some()
    }
}

pub struct Cut {
    next: Code,
    scope: Option<u32>,
}

impl Cut {
    #[inline]
    pub fn next(&self) -> &Code {
        &self.next
    }

    /// The if-then-else this cut commits, or `None` for a clause-level cut.
    #[inline]
    pub fn scope(&self) -> Option<u32> {
        self.scope
    }
}

/// What a goal calls.
#[derive(Clone)]
pub enum Target {
    /// A procedure resolved at compile time.
    Procedure(Rc<dyn Procedure>),
    /// A predicate table, read when the goal runs.
    Table(Rc<Table>),
}

/// A call with argument templates and the continuation after it.
pub struct Goal {
    next: Code,
    args: Box<[Term]>,
    target: Target,
}

impl Goal {
    #[inline]
    pub fn next(&self) -> &Code {
        &self.next
    }

    #[inline]
    pub fn args(&self) -> &[Term] {
        &self.args
    }

    #[inline]
    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl Code {
    /// Calls `procedure` directly.
    pub fn call(next: Code, args: Vec<Term>, procedure: Rc<dyn Procedure>) -> Self {
        Code::Call(Rc::new(Goal {
            next,
            args: args.into_boxed_slice(),
            target: Target::Procedure(procedure),
        }))
    }

    /// Calls every row of `table`, in order.
    pub fn select(next: Code, args: Vec<Term>, table: Rc<Table>) -> Self {
        Code::Call(Rc::new(Goal {
            next,
            args: args.into_boxed_slice(),
            target: Target::Table(table),
        }))
    }

    #[inline]
    pub fn noop(next: Code) -> Self {
        Code::Noop(Rc::new(next))
    }

    #[inline]
    pub fn cut(next: Code, scope: Option<u32>) -> Self {
        Code::Cut(Rc::new(Cut { next, scope }))
    }

    pub fn choice(branches: Vec<Code>, scope: Option<u32>) -> Self {
        Code::Choice(Rc::new(Choice {
            branches: branches.into_boxed_slice(),
            scope,
        }))
    }

    #[inline]
    pub fn is_succeed(&self) -> bool {
        matches!(self, Code::Succeed)
    }

    #[inline]
    pub fn is_fail(&self) -> bool {
        matches!(self, Code::Fail)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Procedure(p) => match p.predicate() {
                Some(pred) => write!(f, "{}", pred),
                None => f.write_str("<procedure>"),
            },
            Target::Table(t) => write!(f, "{}", t.predicate()),
        }
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Succeed => f.write_str("Succeed"),
            Code::Fail => f.write_str("Fail"),
            Code::Choice(c) => f
                .debug_struct("Choice")
                .field("scope", &c.scope)
                .field("branches", &c.branches)
                .finish(),
            Code::Cut(c) => f
                .debug_struct("Cut")
                .field("scope", &c.scope)
                .field("next", &c.next)
                .finish(),
            Code::Call(g) => f
                .debug_struct("Call")
                .field("target", &g.target)
                .field("args", &g.args)
                .field("next", &g.next)
                .finish(),
            Code::Noop(next) => f.debug_tuple("Noop").field(next).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert!(Code::Succeed.is_succeed());
        assert!(Code::Fail.is_fail());
        assert!(!Code::noop(Code::Succeed).is_succeed());
        match Code::choice(vec![Code::Succeed, Code::Fail], Some(3)) {
            Code::Choice(c) => {
                assert!(c.is_local());
                assert_eq!(c.branches().len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        match Code::cut(Code::Succeed, None) {
            Code::Cut(c) => assert!(c.scope().is_none() && c.next().is_succeed()),
            other => panic!("unexpected {:?}", other),
        }
    }
}

//! Clause compilation.
//!
//! Variables of a clause are numbered by first appearance, head first, and
//! its body is translated into a [`Code`] tree: conjunctions chain their
//! continuations, disjunctions become [`Code::Choice`] nodes and
//! if-then-else commits through a local [`Code::Cut`] scoped to its own
//! choice.

use crate::procedure::CallSite;
use crate::{Atom, Code, Database, Predicate, Procedure, PrologError, Query, Term, Var};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(PartialEq, Eq, Hash)]
enum VarKey {
    Named(Atom),
    Indexed(u32),
}

/// Assigns slot indices to template variables in first-appearance order.
#[derive(Default)]
struct VariableIndexer {
    ids: HashMap<VarKey, u32>,
    names: Vec<Atom>,
}

impl VariableIndexer {
    fn index(&mut self, term: &Term) -> Term {
        match term {
            Term::Var(v) if !v.is_wildcard() => {
                let key = if v.is_indexed() {
                    VarKey::Indexed(v.id())
                } else {
                    VarKey::Named(v.name().clone())
                };
                let next = self.names.len() as u32;
                let id = *self.ids.entry(key).or_insert(next);
                if id == next {
                    self.names.push(v.name().clone());
                }
                Term::Var(Var::indexed(id, v.name().clone()))
            }
            Term::Compound(c) if !c.is_instance() => Term::compound(
                c.name().as_str(),
                c.args().iter().map(|arg| self.index(arg)).collect(),
            ),
            _ => term.clone(),
        }
    }
}

/// Translates clause bodies into code.
struct Compiler<'a> {
    db: &'a Database,
    scopes: u32,
    /// Scope a `!` cuts to while an if-then-else condition is compiled.
    condition: Option<u32>,
    local_cuts: u32,
}

impl<'a> Compiler<'a> {
    fn new(db: &'a Database) -> Self {
        Compiler {
            db,
            scopes: 0,
            condition: None,
            local_cuts: 0,
        }
    }

    #[inline]
    fn scope(&mut self) -> u32 {
        self.scopes += 1;
        self.scopes - 1
    }

    fn disj(&mut self, term: &Term, next: &Code) -> Result<Code, PrologError> {
        if let Some((left, right)) = term.split(";") {
            if let Some((cond, then)) = left.split("->") {
                return self.if_then(&cond, &then, Some(&right), next);
            }
            let mut branches = vec![self.disj(&left, next)?];
            let mut rest = right;
            loop {
                match rest.split(";") {
                    Some((l, r)) if l.split("->").is_none() => {
                        branches.push(self.disj(&l, next)?);
                        rest = r;
                    }
                    _ => {
                        branches.push(self.disj(&rest, next)?);
                        break;
                    }
                }
            }
            return Ok(Code::choice(branches, None));
        }
        if let Some((cond, then)) = term.split("->") {
            return self.if_then(&cond, &then, None, next);
        }
        self.conj(term, next)
    }

    fn if_then(
        &mut self,
        cond: &Term,
        then: &Term,
        otherwise: Option<&Term>,
        next: &Code,
    ) -> Result<Code, PrologError> {
        let scope = self.scope();
        let commit = Code::cut(self.disj(then, next)?, Some(scope));
        // A cut in the condition only removes the condition's own choices.
        let inner = self.scope();
        let outer = self.condition.replace(inner);
        let cuts = self.local_cuts;
        let cond = self.disj(cond, &commit);
        self.condition = outer;
        let mut cond = cond?;
        if self.local_cuts != cuts {
            cond = Code::choice(vec![cond], Some(inner));
        }
        let mut branches = vec![cond];
        if let Some(otherwise) = otherwise {
            branches.push(self.disj(otherwise, next)?);
        }
        Ok(Code::choice(branches, Some(scope)))
    }

    fn conj(&mut self, term: &Term, next: &Code) -> Result<Code, PrologError> {
        if let Some((first, rest)) = term.split(",") {
            let rest = self.disj(&rest, next)?;
            return self.disj(&first, &rest);
        }
        match term {
            Term::Var(_) | Term::Ref(_) | Term::Thunk(_) => {
                let call = self.db.table_or_insert(Predicate::new("call", 1));
                Ok(Code::select(next.clone(), vec![term.clone()], call))
            }
            Term::Atom(a) if a == "!" => {
                if self.condition.is_some() {
                    self.local_cuts += 1;
                }
                Ok(Code::cut(next.clone(), self.condition))
            }
            Term::Atom(a) if a == "true" => Ok(next.clone()),
            Term::Atom(_) | Term::Compound(_) | Term::CompoundRef(_) => {
                let predicate = Predicate::of(term)?;
                let table = self.db.table_or_insert(predicate);
                Ok(Code::select(next.clone(), term.args(), table))
            }
            _ => Err(PrologError::type_error("callable", term.clone())),
        }
    }
}

/// A compiled clause: a fact, a rule, or a goal run by a query or `call/1`.
pub struct Clause {
    predicate: Option<Predicate>,
    head: Term,
    body: Term,
    args: Box<[Term]>,
    code: Code,
    names: Rc<[Atom]>,
}

impl Clause {
    /// Compiles a program clause: `Head :- Body`, or a fact `Head`.
    /// `:- Body` and `?- Body` compile to headless goal clauses.
    pub fn compile(db: &Database, term: &Term) -> Result<Self, PrologError> {
        let mut indexer = VariableIndexer::default();
        let term = indexer.index(term);
        let (head, body) = if let Some((head, body)) = term.split(":-") {
            (Some(head), body)
        } else if term.has_functor(":-", 1) || term.has_functor("?-", 1) {
            (None, term.arg(0).unwrap_or_else(|| Term::atom("true")))
        } else {
            (Some(term.clone()), Term::atom("true"))
        };
        Self::build(db, head, body, indexer.names)
    }

    /// Compiles a goal. When `indexed` is set the goal is a template whose
    /// variables already index slots of the frame it will run in.
    pub fn goal(db: &Database, goal: &Term, indexed: bool) -> Result<Self, PrologError> {
        if indexed {
            return Self::build(db, None, goal.clone(), Vec::new());
        }
        let mut indexer = VariableIndexer::default();
        let goal = indexer.index(goal);
        Self::build(db, None, goal, indexer.names)
    }

    fn build(
        db: &Database,
        head: Option<Term>,
        body: Term,
        names: Vec<Atom>,
    ) -> Result<Self, PrologError> {
        let predicate = match &head {
            Some(head) => Some(Predicate::of(head)?),
            None => None,
        };
        let code = Compiler::new(db).disj(&body, &Code::Succeed)?;
        let head = head.unwrap_or_else(|| Term::atom("$goal"));
        Ok(Clause {
            predicate,
            args: head.args().into_boxed_slice(),
            head,
            body,
            code,
            names: names.into(),
        })
    }

    #[inline]
    pub fn head(&self) -> &Term {
        &self.head
    }

    #[inline]
    pub fn body(&self) -> &Term {
        &self.body
    }

    #[inline]
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// Names of the clause variables, by slot index.
    #[inline]
    pub fn names(&self) -> &Rc<[Atom]> {
        &self.names
    }

    /// The clause as a term: `Head :- Body`, or `Head` for a fact.
    pub fn to_term(&self) -> Term {
        if self.body.has_functor("true", 0) {
            self.head.clone()
        } else {
            crate::func!(":-"; self.head.clone(), self.body.clone())
        }
    }
}

impl Procedure for Clause {
    fn predicate(&self) -> Option<Predicate> {
        self.predicate.clone()
    }

    #[inline]
    fn locals(&self) -> usize {
        self.names.len()
    }

    fn call_in(&self, query: &mut Query, site: &CallSite<'_>) -> Result<Code, PrologError> {
        let callee = query.callee();
        if query.unify_args(site.args, site.caller, &self.args, callee)? {
            Ok(self.code.clone())
        } else {
            Ok(Code::Fail)
        }
    }

    fn as_clause(&self) -> Option<&Clause> {
        Some(self)
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clause")
            .field("head", &self.head)
            .field("body", &self.body)
            .field("locals", &self.names.len())
            .finish()
    }
}

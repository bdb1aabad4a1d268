//! Database built-ins: `assert/1` and friends, `retract/1`, `abolish/1`,
//! `clause/2` and `current_predicate/1`.
//!
//! `retract/1` and `clause/2` iterate over a snapshot of the table taken
//! when they are called, so clauses added or removed meanwhile do not
//! change what they see.

use super::{det, enumerate, foreign};
use crate::{
    func, Alternatives, Code, Database, Position, Predicate, Procedure, PrologError, Query, Term,
};
use log::debug;
use std::rc::Rc;

fn add(query: &mut Query, args: &[Term], position: Position) -> Result<bool, PrologError> {
    let term = query.strip(&args[0])?;
    if term.is_var() {
        return Err(PrologError::instantiation_error());
    }
    let clause = query.frames().unbind(&term);
    query.database().add_clause(&clause, position)?;
    Ok(true)
}

/// Splits a clause term into its head and body and checks the head.
fn head_and_body(query: &Query, term: &Term) -> Result<(Term, Term), PrologError> {
    let term = query.strip(term)?;
    let (head, body) = term
        .split(":-")
        .unwrap_or_else(|| (term.clone(), Term::atom("true")));
    let head = query.strip(&head)?;
    if head.is_var() {
        return Err(PrologError::instantiation_error());
    }
    if !head.is_callable() {
        return Err(PrologError::type_error("callable", head));
    }
    Ok((head, body))
}

/// Remaining rows of a `retract/1` or `clause/2` call.
struct Matching {
    predicate: Predicate,
    rows: Rc<Vec<Rc<dyn Procedure>>>,
    index: usize,
    pattern: Term,
    remove: bool,
}

impl Alternatives for Matching {
    #[inline]
    fn has_next(&self) -> bool {
        self.index < self.rows.len()
    }

    fn next(&mut self, query: &mut Query) -> Result<Code, PrologError> {
        while let Some(row) = self.rows.get(self.index) {
            self.index += 1;
            let Some(clause) = row.as_clause() else {
                continue;
            };
            let stored = query.rebind(&func!(":-"; clause.head().clone(), clause.body().clone()));
            if !query.unifiable(&self.pattern, &stored)? {
                continue;
            }
            if self.remove && !query.database().remove(&self.predicate, row) {
                // Already retracted elsewhere.
                debug!(target: "hornet::database", "skipping a removed row of {}", self.predicate);
                continue;
            }
            if query.unify(&self.pattern, &stored)? {
                return Ok(Code::Succeed);
            }
        }
        Ok(Code::Fail)
    }
}

fn matching(query: &mut Query, head: Term, body: Term, remove: bool) -> Result<Code, PrologError> {
    let predicate = Predicate::of(&head)?;
    let Some(table) = query.database().table(&predicate) else {
        return Ok(Code::Fail);
    };
    let rows = table.rows();
    if rows.is_empty() {
        return Ok(Code::Fail);
    }
    query.push_choice_point(Matching {
        predicate,
        rows,
        index: 0,
        pattern: func!(":-"; head, body),
        remove,
    });
    Ok(Code::Fail)
}

fn retract(query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
    let (head, body) = head_and_body(query, &args[0])?;
    matching(query, head, body, true)
}

fn clause(query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
    let (head, _) = head_and_body(query, &args[0])?;
    let body = query.strip(&args[1])?;
    if !body.is_var() && !body.is_callable() {
        return Err(PrologError::type_error("callable", body));
    }
    matching(query, head, body, false)
}

fn abolish(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let indicator = query.strip(&args[0])?;
    let predicate = Predicate::from_indicator(&indicator)?;
    query.database().abolish(&predicate);
    Ok(true)
}

/// Enumerates `Name/Arity` of every predicate defined by at least one
/// clause.
fn current_predicate(query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
    let indicator = query.strip(&args[0])?;
    if !indicator.is_var() {
        let Some((name, arity)) = indicator.split("/") else {
            return Err(PrologError::type_error("predicate_indicator", indicator));
        };
        let (name, arity) = (query.strip(&name)?, query.strip(&arity)?);
        if !(name.is_var() || name.is_atom()) || !(arity.is_var() || arity.as_int().is_ok()) {
            return Err(PrologError::type_error("predicate_indicator", indicator));
        }
    }
    let db = query.database().clone();
    let defined = db
        .predicates()
        .into_iter()
        .filter(|predicate| {
            db.table(predicate)
                .is_some_and(|table| table.rows().iter().any(|row| row.as_clause().is_some()))
        })
        .map(|predicate| predicate.to_term())
        .collect();
    Ok(enumerate(query, defined, indicator))
}

pub(super) fn install(db: &Rc<Database>) -> Result<(), PrologError> {
    det(db, "assert", 1, |q, a| add(q, a, Position::Back))?;
    det(db, "assertz", 1, |q, a| add(q, a, Position::Back))?;
    det(db, "asserta", 1, |q, a| add(q, a, Position::Front))?;
    foreign(db, "retract", 1, retract)?;
    foreign(db, "clause", 2, clause)?;
    det(db, "abolish", 1, abolish)?;
    foreign(db, "current_predicate", 1, current_predicate)
}

//! The execution engine.
//!
//! A [`Query`] walks compiled [`Code`] with a current continuation and a
//! current frame. Success pops to the caller frame, failure backtracks to
//! the most recent choice point, and program errors are offered to the
//! procedures on the frame chain before they escape from [`Query::ask`].

use crate::choice::Branches;
use crate::procedure::CallSite;
use crate::{
    Alternatives, Atom, ChoiceStack, Clause, Code, Database, FrameId, Frames, Procedure,
    PrologError, Table, Target, Term, Unifier, Var, VarRef,
};
use crate::code::Goal;
use log::{trace, warn};
use std::fmt;
use std::rc::Rc;

/// One answer: the values of the query variables, detached from frames.
/// Unbound variables have no value; variables shared between values are
/// renamed consistently.
#[derive(Debug, Clone)]
pub struct Solution {
    names: Rc<[Atom]>,
    values: Vec<Option<Term>>,
}

impl Solution {
    /// Value of the query variable `name`.
    pub fn get(&self, name: &str) -> Option<&Term> {
        let i = self.names.iter().position(|n| n == name)?;
        self.values.get(i)?.as_ref()
    }

    #[inline]
    pub fn names(&self) -> &[Atom] {
        &self.names
    }

    #[inline]
    pub fn values(&self) -> &[Option<Term>] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Atom, Option<&Term>)> {
        self.names
            .iter()
            .zip(self.values.iter().map(Option::as_ref))
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            let Some(value) = value else { continue };
            if name.as_str().starts_with('_') {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{} = {}", name, value)?;
        }
        if first {
            f.write_str("true")?;
        }
        Ok(())
    }
}

/// Remaining clauses of a multi-row call.
struct Clauses {
    rows: Rc<Vec<Rc<dyn Procedure>>>,
    index: usize,
    goal: Rc<Goal>,
    caller: FrameId,
    revision: u64,
}

impl Alternatives for Clauses {
    #[inline]
    fn has_next(&self) -> bool {
        self.index < self.rows.len()
    }

    fn next(&mut self, query: &mut Query) -> Result<Code, PrologError> {
        let Some(row) = self.rows.get(self.index).cloned() else {
            return Ok(Code::Fail);
        };
        self.index += 1;
        trace!(target: "hornet::query", "redo {:?} #{}", self.goal.target(), self.index);
        query.call(
            &row,
            self.goal.args(),
            self.caller,
            self.goal.next().clone(),
            self.revision,
        )
    }
}

/// A running query against a [`Database`].
pub struct Query {
    db: Rc<Database>,
    entry: Rc<Clause>,
    frames: Frames,
    choices: ChoiceStack,
    unifier: Unifier,
    root: FrameId,
    callee: FrameId,
    next: Code,
    ancestry: u64,
    done: bool,
}

impl Query {
    /// Prepares `entry` for execution. The entry clause's variables are
    /// the query variables reported in each [`Solution`].
    pub fn new(db: Rc<Database>, entry: Rc<Clause>) -> Self {
        let mut frames = Frames::new();
        let procedure: Rc<dyn Procedure> = entry.clone();
        let root = frames.push(1, None, Code::Succeed, Some(procedure), entry.locals(), None);
        Query {
            next: entry.code().clone(),
            db,
            entry,
            frames,
            choices: ChoiceStack::new(),
            unifier: Unifier::new(),
            root,
            callee: root,
            ancestry: 1,
            done: false,
        }
    }

    #[inline]
    pub fn database(&self) -> &Rc<Database> {
        &self.db
    }

    #[inline]
    pub fn frames(&self) -> &Frames {
        &self.frames
    }

    #[inline]
    pub fn frames_mut(&mut self) -> &mut Frames {
        &mut self.frames
    }

    /// The frame currently executing.
    #[inline]
    pub fn callee(&self) -> FrameId {
        self.callee
    }

    #[inline]
    pub fn ancestry(&self) -> u64 {
        self.ancestry
    }

    /// Length of the current frame chain.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.get(self.callee).depth()
    }

    /// True if a later [`ask`](Self::ask) may produce another solution.
    pub fn can_backtrack(&self) -> bool {
        !self.done && self.choices.can_backtrack()
    }

    /// Resolves `term` and forces thunks.
    #[inline]
    pub fn strip(&self, term: &Term) -> Result<Term, PrologError> {
        self.frames.strip(term)
    }

    /// Finds the next solution. `Ok(None)` means there are no more; after
    /// an error the query is dead and only returns `Ok(None)`.
    pub fn ask(&mut self) -> Result<Option<Solution>, PrologError> {
        if self.done {
            return Ok(None);
        }
        loop {
            match self.run() {
                Ok(Some(solution)) => return Ok(Some(solution)),
                Ok(None) => {
                    self.done = true;
                    return Ok(None);
                }
                Err(PrologError::Thrown(ball)) => {
                    let ball = self.frames.unbind(&ball);
                    trace!(target: "hornet::query", "thrown {}", ball);
                    match self.catch(&ball) {
                        Ok(Some(code)) => self.next = code,
                        Ok(None) => {
                            self.abandon();
                            return Err(PrologError::Thrown(ball));
                        }
                        Err(e) => {
                            self.abandon();
                            return Err(e);
                        }
                    }
                }
                Err(e) => {
                    self.abandon();
                    return Err(e);
                }
            }
        }
    }

    /// Collects every remaining solution.
    pub fn solutions(&mut self) -> Result<Vec<Solution>, PrologError> {
        self.by_ref().collect()
    }

    fn abandon(&mut self) {
        self.choices.clear();
        self.next = Code::Fail;
        self.done = true;
    }

    /// Offers `ball` to each frame on the chain, innermost first.
    fn catch(&mut self, ball: &Term) -> Result<Option<Code>, PrologError> {
        let mut frame = Some(self.callee);
        while let Some(id) = frame {
            let (procedure, caller) = {
                let f = self.frames.get(id);
                (f.procedure().cloned(), f.caller())
            };
            self.callee = id;
            if let Some(procedure) = procedure {
                if let Some(code) = procedure.catches(self, ball)? {
                    return Ok(Some(code));
                }
            }
            frame = caller;
        }
        Ok(None)
    }

    fn run(&mut self) -> Result<Option<Solution>, PrologError> {
        loop {
            match std::mem::replace(&mut self.next, Code::Fail) {
                Code::Fail => {
                    if !self.backtrack()? {
                        return Ok(None);
                    }
                }
                Code::Succeed => {
                    let frame = self.frames.get(self.callee);
                    match frame.caller() {
                        Some(caller) => {
                            self.next = frame.next().clone();
                            self.callee = caller;
                        }
                        None => return self.solution().map(Some),
                    }
                }
                code => self.next = self.exec(&code)?,
            }
        }
    }

    /// Detaches the query variables. Top-level thunks are forced.
    fn solution(&self) -> Result<Solution, PrologError> {
        let names = self.entry.names().clone();
        let bound = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let var = Term::Var(Var::indexed(i as u32, name.clone()));
                self.frames.strip(&self.frames.bind(&var, self.root))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let values = self
            .frames
            .unbind_all(&bound)
            .into_iter()
            .zip(&bound)
            .map(|(copy, value)| (!value.is_var()).then_some(copy))
            .collect();
        trace!(target: "hornet::query", "solution with {} bindings", names.len());
        Ok(Solution { names, values })
    }

    /// Resumes the most recent choice point with an alternative left.
    /// Returns false when the stack is exhausted.
    fn backtrack(&mut self) -> Result<bool, PrologError> {
        loop {
            let Some(top) = self.choices.top_mut() else {
                return Ok(false);
            };
            top.undo(&mut self.frames);
            let Some(mut alternatives) = top.take_alternatives().filter(|a| a.has_next()) else {
                self.choices.pop();
                continue;
            };
            let (id, frame, mark, ancestry) = (top.id(), top.frame(), top.mark(), top.ancestry());
            trace!(target: "hornet::query", "backtrack to #{} in frame {}", id, frame);
            self.frames.truncate(mark);
            self.callee = frame;
            self.ancestry = ancestry;
            let result = alternatives.next(self);
            let exhausted = !alternatives.has_next();
            if let Some(cp) = self.choices.get_mut(id) {
                cp.restore_alternatives(alternatives);
            }
            if exhausted && self.choices.top().is_some_and(|cp| cp.id() == id) {
                self.choices.pop_and_drain(&self.frames);
            }
            self.next = result?;
            return Ok(true);
        }
    }

    fn exec(&mut self, code: &Code) -> Result<Code, PrologError> {
        match code {
            Code::Succeed | Code::Fail => Ok(code.clone()),
            Code::Noop(next) => Ok(next.as_ref().clone()),
            Code::Choice(choice) => {
                let branches = choice.branches();
                let Some(first) = branches.first() else {
                    return Ok(Code::Fail);
                };
                if branches.len() > 1 || choice.is_local() {
                    self.choices.push(
                        self.callee,
                        self.ancestry,
                        self.frames.len(),
                        choice.scope(),
                        Box::new(Branches::new(choice.clone())),
                    );
                }
                Ok(first.clone())
            }
            Code::Cut(cut) => {
                let ancestry = self.frames.get(self.callee).ancestry();
                let removed = self.choices.cut(
                    &self.frames,
                    ancestry,
                    cut.scope().map(|scope| (scope, self.callee)),
                );
                trace!(target: "hornet::query", "cut {} choice points", removed);
                Ok(cut.next().clone())
            }
            Code::Call(goal) => match goal.target() {
                Target::Procedure(procedure) => {
                    let procedure = procedure.clone();
                    self.call(
                        &procedure,
                        goal.args(),
                        self.callee,
                        goal.next().clone(),
                        self.ancestry,
                    )
                }
                Target::Table(table) => self.select(goal, table),
            },
        }
    }

    /// Calling a predicate without rows raises an existence error unless
    /// the `unknown` flag says to fail.
    fn undefined(&self, table: &Table) -> Result<Code, PrologError> {
        match self.db.flag("unknown") {
            Some(Term::Atom(a)) if a == "fail" => Ok(Code::Fail),
            Some(Term::Atom(a)) if a == "warning" => {
                warn!(target: "hornet::query", "unknown procedure {}", table.predicate());
                Ok(Code::Fail)
            }
            _ => Err(PrologError::existence_error(
                "procedure",
                table.predicate().to_term(),
            )),
        }
    }

    /// Calls each row of `table` in turn, leaving a choice point over the
    /// rest when there is more than one.
    fn select(&mut self, goal: &Rc<Goal>, table: &Rc<Table>) -> Result<Code, PrologError> {
        let rows = table.rows();
        let caller = self.callee;
        let revision = self.ancestry;
        let first = match rows.first() {
            Some(first) => first.clone(),
            None => return self.undefined(table),
        };
        if rows.len() > 1 {
            let mark = self.frames.len();
            self.choices.push(
                caller,
                revision + 1,
                mark,
                None,
                Box::new(Clauses {
                    rows,
                    index: 1,
                    goal: goal.clone(),
                    caller,
                    revision,
                }),
            );
        }
        self.call(&first, goal.args(), caller, goal.next().clone(), revision)
    }

    /// Calls `procedure` with `args` read in `caller`. A call whose
    /// continuation is plain success runs on behalf of the current frame's
    /// caller, so tail recursion does not grow the frame chain.
    pub(crate) fn call(
        &mut self,
        procedure: &Rc<dyn Procedure>,
        args: &[Term],
        caller: FrameId,
        next: Code,
        revision: u64,
    ) -> Result<Code, PrologError> {
        self.ancestry = revision + 1;
        let mut next = next;
        if next.is_succeed() {
            let frame = self.frames.get(self.callee);
            if let Some(parent) = frame.caller() {
                next = frame.next().clone();
                self.callee = parent;
            }
        }
        if log::log_enabled!(target: "hornet::query", log::Level::Trace) {
            if let Some(predicate) = procedure.predicate() {
                trace!(target: "hornet::query", "call {} at depth {}", predicate, self.depth());
            }
        }
        let site = CallSite {
            procedure,
            args,
            ancestry: self.ancestry,
            caller,
            next,
        };
        procedure.call(self, &site)
    }

    /// Pushes the activation frame for `site` and makes it current. With
    /// a `base`, the frame resolves its variables in the base's slots.
    pub fn enter(&mut self, site: &CallSite<'_>, locals: usize, base: Option<FrameId>) -> FrameId {
        let id = self.frames.push(
            site.ancestry,
            Some(self.callee),
            site.next.clone(),
            Some(site.procedure.clone()),
            locals,
            base,
        );
        self.callee = id;
        id
    }

    /// Unifies two terms that are already bound to their frames and
    /// commits on success.
    #[inline]
    pub fn unify(&mut self, x: &Term, y: &Term) -> Result<bool, PrologError> {
        self.unify_in(x, None, y, None)
    }

    /// Unifies `x` read in `fx` with `y` read in `fy` and commits on success.
    pub fn unify_in(
        &mut self,
        x: &Term,
        fx: Option<FrameId>,
        y: &Term,
        fy: Option<FrameId>,
    ) -> Result<bool, PrologError> {
        if self.unifier.unify(&mut self.frames, x, fx, y, fy)? {
            self.unifier.commit(&mut self.frames, &mut self.choices);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Tests whether two bound terms unify, leaving no bindings behind.
    pub fn unifiable(&mut self, x: &Term, y: &Term) -> Result<bool, PrologError> {
        let ok = self.unifier.unify(&mut self.frames, x, None, y, None)?;
        self.unifier.rollback(&mut self.frames);
        Ok(ok)
    }

    /// Unifies argument lists pairwise as one unit.
    pub fn unify_args(
        &mut self,
        xs: &[Term],
        fx: FrameId,
        ys: &[Term],
        fy: FrameId,
    ) -> Result<bool, PrologError> {
        if xs.len() != ys.len() {
            return Ok(false);
        }
        for (x, y) in xs.iter().zip(ys) {
            if !self.unifier.unify(&mut self.frames, x, Some(fx), y, Some(fy))? {
                self.unifier.rollback(&mut self.frames);
                return Ok(false);
            }
        }
        self.unifier.commit(&mut self.frames, &mut self.choices);
        Ok(true)
    }

    /// Allocates `count` fresh unbound variables in the current frame.
    pub fn fresh_vars(&mut self, count: usize) -> Vec<Term> {
        let owner = self.frames.owner(self.callee);
        let first = self.frames.expand_locals(owner, count);
        (first..first + count)
            .map(|i| {
                let var = Var::indexed(i as u32, Atom::new(format!("_G{}", i)));
                Term::Ref(VarRef::new(var, owner))
            })
            .collect()
    }

    /// Copies `term` into fresh variables of the current frame.
    pub fn rebind(&mut self, term: &Term) -> Term {
        let callee = self.callee;
        self.frames.rebind(term, callee)
    }

    /// Pushes a choice point whose alternatives resume in the current frame.
    /// Returns its id.
    pub fn push_choice_point(&mut self, alternatives: impl Alternatives + 'static) -> u64 {
        self.choices.push(
            self.callee,
            self.ancestry,
            self.frames.len(),
            None,
            Box::new(alternatives),
        )
    }

    /// Undoes and removes choice points down to and including `id`.
    /// Returns false if it is no longer on the stack.
    pub fn unwind_to(&mut self, id: u64) -> bool {
        self.choices.unwind_to(&mut self.frames, id)
    }
}

impl Iterator for Query {
    type Item = Result<Solution, PrologError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.ask().transpose()
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("entry", &self.entry)
            .field("frames", &self.frames.len())
            .field("choices", &self.choices.len())
            .field("callee", &self.callee)
            .field("done", &self.done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{atom, func, list, var, Predicate, SharedBuffer};
    use std::cell::Cell;

    fn member_db() -> Rc<Database> {
        let db = Database::new().unwrap();
        db.consult([
            func!("member"; var!("X"), list![var!("X"); var!("_")]),
            func!(":-";
                func!("member"; var!("X"), list![var!("_"); var!("T")]),
                func!("member"; var!("X"), var!("T"))),
        ])
        .unwrap();
        db
    }

    fn answers(db: &Rc<Database>, goal: &Term, name: &str) -> Vec<Term> {
        db.query(goal)
            .unwrap()
            .solutions()
            .unwrap()
            .iter()
            .map(|s| s.get(name).cloned().unwrap_or_else(|| atom!("_")))
            .collect()
    }

    fn capture(db: &Rc<Database>) -> SharedBuffer {
        let buffer = SharedBuffer::new();
        db.set_output(Box::new(buffer.clone()));
        buffer
    }

    #[test]
    fn member_enumerates_in_order() {
        let db = member_db();
        let mut query = db.query(&func!("member"; var!("X"), list![1, 2, 3])).unwrap();
        for expected in 1..=3 {
            let solution = query.ask().unwrap().unwrap();
            assert_eq!(solution.get("X"), Some(&Term::int(expected)));
        }
        assert!(query.ask().unwrap().is_none());
        assert!(query.ask().unwrap().is_none());
        assert!(!query.can_backtrack());
    }

    #[test]
    fn unification_binds_query_variables() {
        let db = Database::new().unwrap();
        let goal = func!("="; func!("f"; var!("X"), 1), func!("f"; 2, var!("Y")));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("X"), Some(&Term::int(2)));
        assert_eq!(solution.get("Y"), Some(&Term::int(1)));
        let goal = func!("="; func!("f"; var!("X"), 1), func!("g"; var!("X"), 1));
        assert!(db.query(&goal).unwrap().ask().unwrap().is_none());
    }

    #[test]
    fn if_then_else_commits() {
        let db = Database::new().unwrap();
        let out = capture(&db);
        let goal = func!(";"; func!("->"; "true", func!("write"; "a")), func!("write"; "b"));
        let mut query = db.query(&goal).unwrap();
        assert!(query.ask().unwrap().is_some());
        assert!(query.ask().unwrap().is_none());
        assert_eq!(out.contents(), "a");
    }

    #[test]
    fn if_then_else_takes_else_branch() {
        let db = Database::new().unwrap();
        let goal = func!(";"; func!("->"; "fail", func!("="; var!("X"), 1)), func!("="; var!("X"), 2));
        assert_eq!(answers(&db, &goal, "X"), vec![Term::int(2)]);
    }

    #[test]
    fn local_cut_keeps_outer_alternatives() {
        let db = member_db();
        // member(X, [1,2,3]), (X > 1 -> true ; fail)
        let goal = func!(",";
            func!("member"; var!("X"), list![1, 2, 3]),
            func!(";"; func!("->"; func!(">"; var!("X"), 1), "true"), "fail"));
        assert_eq!(answers(&db, &goal, "X"), vec![Term::int(2), Term::int(3)]);
    }

    #[test]
    fn cut_in_condition_is_local_to_it() {
        let db = member_db();
        // (!, fail -> X = a ; X = b)
        let goal = func!(";";
            func!("->"; func!(","; "!", "fail"), func!("="; var!("X"), "a")),
            func!("="; var!("X"), "b"));
        assert_eq!(answers(&db, &goal, "X"), vec![atom!("b")]);
        // (member(X, [1,2,3]), !, X > 1 -> Y = X ; Y = none)
        let goal = func!(";";
            func!("->";
                func!(","; func!("member"; var!("X"), list![1, 2, 3]), func!(","; "!", func!(">"; var!("X"), 1))),
                func!("="; var!("Y"), var!("X"))),
            func!("="; var!("Y"), "none"));
        assert_eq!(answers(&db, &goal, "Y"), vec![atom!("none")]);
        db.consult([
            func!(":-"; func!("s"; var!("X")),
                func!(","; func!(";"; func!("->"; func!(","; "!", "fail"), "true"), "true"), func!("="; var!("X"), 1))),
            func!("s"; 2),
        ])
        .unwrap();
        assert_eq!(answers(&db, &func!("s"; var!("X")), "X"), vec![Term::int(1), Term::int(2)]);
    }

    #[test]
    fn clause_cut_discards_remaining_clauses() {
        let db = member_db();
        db.consult([
            func!(":-"; func!("first"; var!("X"), var!("L")),
                func!(","; func!("member"; var!("X"), var!("L")), "!")),
            func!("p"; 1),
            func!("p"; 2),
            func!(":-"; func!("q"; var!("X")), func!(","; func!("p"; var!("X")), "!")),
            func!("q"; 3),
        ])
        .unwrap();
        let goal = func!("first"; var!("X"), list![7, 8, 9]);
        assert_eq!(answers(&db, &goal, "X"), vec![Term::int(7)]);
        assert_eq!(answers(&db, &func!("q"; var!("X")), "X"), vec![Term::int(1)]);
        // The cut inside first/2 does not reach the caller's choice points.
        let goal = func!(","; func!("member"; var!("Y"), list!["a", "b"]), func!("first"; var!("X"), list![1, 2]));
        assert_eq!(answers(&db, &goal, "Y"), vec![atom!("a"), atom!("b")]);
    }

    /// Records the deepest frame chain it is called from.
    struct DepthGauge(Rc<Cell<usize>>);

    impl Procedure for DepthGauge {
        fn predicate(&self) -> Option<Predicate> {
            Some(Predicate::new("gauge", 0))
        }

        fn call(&self, query: &mut Query, site: &CallSite<'_>) -> Result<Code, PrologError> {
            self.0.set(self.0.get().max(query.depth()));
            Ok(site.next.clone())
        }
    }

    #[test]
    fn tail_recursion_keeps_depth_bounded() {
        let db = Database::new().unwrap();
        let deepest = Rc::new(Cell::new(0));
        db.register(Rc::new(DepthGauge(deepest.clone()))).unwrap();
        db.consult([
            func!(":-"; func!("count"; var!("N"), var!("N")), "!"),
            func!(":-"; func!("count"; var!("I"), var!("N")),
                func!(",";
                    "gauge",
                    func!(",";
                        func!("is"; var!("J"), func!("+"; var!("I"), 1)),
                        func!("count"; var!("J"), var!("N"))))),
        ])
        .unwrap();
        let mut query = db.query(&func!("count"; 0, 20000)).unwrap();
        assert!(query.ask().unwrap().is_some());
        assert!(deepest.get() > 0);
        assert!(deepest.get() <= 2, "depth grew to {}", deepest.get());
    }

    #[test]
    fn retract_during_iteration_uses_snapshot() {
        let db = Database::new().unwrap();
        db.consult([func!("r"; 1), func!("r"; 2), func!("r"; 3)]).unwrap();
        let goal = func!(","; func!("r"; var!("X")), func!("retract"; func!("r"; var!("X"))));
        assert_eq!(
            answers(&db, &goal, "X"),
            vec![Term::int(1), Term::int(2), Term::int(3)]
        );
        let table = db.table(&"r/1".parse().unwrap()).unwrap();
        assert!(table.is_empty());
        let err = db.query(&func!("r"; var!("X"))).unwrap().ask().unwrap_err();
        assert_eq!(
            err.ball(),
            Some(&func!("existence_error"; "procedure", func!("/"; "r", 1)))
        );
    }

    #[test]
    fn catch_recovers_ball() {
        let db = Database::new().unwrap();
        let goal = func!("catch"; func!("throw"; func!("foo"; 1)), func!("foo"; var!("X")), "true");
        assert_eq!(answers(&db, &goal, "X"), vec![Term::int(1)]);
        let goal = func!("catch"; func!("throw"; "bar"), func!("foo"; var!("X")), "true");
        let err = db.query(&goal).unwrap().ask().unwrap_err();
        assert_eq!(err.ball(), Some(&atom!("bar")));
    }

    #[test]
    fn catch_restores_bindings() {
        let db = Database::new().unwrap();
        // catch((X = 1, throw(e)), e, true)
        let goal = func!("catch";
            func!(","; func!("="; var!("X"), 1), func!("throw"; "e")),
            "e",
            "true");
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("X"), None);
    }

    #[test]
    fn catch_is_transparent_to_backtracking() {
        let db = member_db();
        let goal = func!("catch"; func!("member"; var!("X"), list![1, 2]), "_", "true");
        assert_eq!(answers(&db, &goal, "X"), vec![Term::int(1), Term::int(2)]);
    }

    #[test]
    fn uncaught_error_kills_query() {
        let db = member_db();
        let goal = func!(";"; func!("is"; var!("X"), func!("/"; 1, 0)), func!("="; var!("X"), 1));
        let mut query = db.query(&goal).unwrap();
        let err = query.ask().unwrap_err();
        assert_eq!(err.ball(), Some(&func!("evaluation_error"; "zero_divisor")));
        assert!(query.ask().unwrap().is_none());
    }

    #[test]
    fn findall_collects_or_yields_empty() {
        let db = member_db();
        let goal = func!("findall"; var!("X"), func!("member"; var!("X"), list![1, 2, 3]), var!("L"));
        assert_eq!(answers(&db, &goal, "L"), vec![list![1, 2, 3]]);
        let goal = func!("findall"; var!("X"), "fail", var!("L"));
        assert_eq!(answers(&db, &goal, "L"), vec![list![]]);
    }

    #[test]
    fn findall_copies_fresh_variables() {
        let db = member_db();
        let goal = func!("findall";
            func!("p"; var!("X"), var!("Y")),
            func!("member"; var!("X"), list![1, 2]),
            var!("L"));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        let items = Frames::new().list_items(solution.get("L").unwrap()).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].arg(1).is_some_and(|y| y.is_var()));
        assert_ne!(items[0].arg(1), items[1].arg(1));
    }

    #[test]
    fn call_n_appends_arguments() {
        let db = member_db();
        let goal = func!("call"; func!("member"; var!("X")), list!["a", "b"]);
        assert_eq!(answers(&db, &goal, "X"), vec![atom!("a"), atom!("b")]);
        let goal = func!(","; func!("="; var!("G"), func!("="; var!("Y"))), func!("call"; var!("G"), 5));
        assert_eq!(answers(&db, &goal, "Y"), vec![Term::int(5)]);
    }

    #[test]
    fn call_is_opaque_to_cut() {
        let db = member_db();
        // member(X, [1,2]), call(!)
        let goal = func!(","; func!("member"; var!("X"), list![1, 2]), func!("call"; "!"));
        assert_eq!(answers(&db, &goal, "X"), vec![Term::int(1), Term::int(2)]);
        let err = db.query(&func!("call"; var!("G"))).unwrap().ask().unwrap_err();
        assert_eq!(err.ball(), Some(&atom!("instantiation_error")));
        let err = db.query(&func!("call"; 1)).unwrap().ask().unwrap_err();
        assert_eq!(err.ball(), Some(&func!("type_error"; "callable", 1)));
    }

    #[test]
    fn between_enumerates_range() {
        let db = Database::new().unwrap();
        let goal = func!("between"; 1, 4, var!("X"));
        assert_eq!(
            answers(&db, &goal, "X"),
            (1..=4).map(Term::int).collect::<Vec<_>>()
        );
        let goal = func!("between"; 3, 2, var!("X"));
        assert!(answers(&db, &goal, "X").is_empty());
        let goal = func!("between"; 1, 3, 2);
        assert_eq!(answers(&db, &goal, "X").len(), 1);
    }

    #[test]
    fn arithmetic_errors_are_thrown() {
        let db = Database::new().unwrap();
        let cases = [
            (func!("is"; var!("X"), func!("+"; var!("Y"), 1)), atom!("instantiation_error")),
            (
                func!("is"; var!("X"), func!("foo"; 1)),
                func!("type_error"; "evaluable", func!("/"; "foo", 1)),
            ),
            (
                func!("is"; var!("X"), func!("mod"; 1, 0)),
                func!("evaluation_error"; "zero_divisor"),
            ),
        ];
        for (goal, ball) in cases {
            let err = db.query(&goal).unwrap().ask().unwrap_err();
            assert_eq!(err.ball(), Some(&ball));
        }
    }

    #[test]
    fn negation_and_once() {
        let db = member_db();
        assert!(db
            .query(&func!("\\+"; func!("member"; 4, list![1, 2])))
            .unwrap()
            .ask()
            .unwrap()
            .is_some());
        let goal = func!("once"; func!("member"; var!("X"), list![1, 2]));
        assert_eq!(answers(&db, &goal, "X"), vec![Term::int(1)]);
        let goal = func!("forall"; func!("member"; var!("X"), list![1, 2]), func!("integer"; var!("X")));
        assert_eq!(db.query(&goal).unwrap().solutions().unwrap().len(), 1);
    }

    #[test]
    fn unbound_variables_have_no_value() {
        let db = Database::new().unwrap();
        let goal = func!("="; var!("X"), func!("f"; var!("Y"), var!("Y")));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("Y"), None);
        let x = solution.get("X").unwrap();
        assert_eq!(x.arg(0), x.arg(1));
        assert!(x.arg(0).is_some_and(|t| t.is_var()));
    }
}

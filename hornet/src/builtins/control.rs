//! Control built-ins: `call/N`, `catch/3`, `throw/1`, `findall/3`,
//! `between/3`, `thunk/3` and the small library written as clauses.

use super::{det, foreign, outcome};
use crate::procedure::CallSite;
use crate::{
    func, var, Alternatives, Barrier, Code, Database, Once, Predicate, Procedure, PrologError,
    Query, Term,
};
use log::trace;
use std::cell::RefCell;
use std::rc::Rc;

/// Compiles `goal` and runs it in a new frame, which makes the goal
/// opaque to cut.
fn run_goal(query: &mut Query, site: &CallSite<'_>, goal: &Term) -> Result<Code, PrologError> {
    let goal = query.strip(goal)?;
    match &goal {
        Term::Var(_) | Term::Ref(_) => Err(PrologError::instantiation_error()),
        Term::CompoundRef(r) => {
            // The template's variables already index the slots of its frame.
            let template = Term::Compound(r.template().clone());
            let clause = query.database().compile_goal(&template, true)?;
            query.enter(site, 0, Some(r.frame()));
            Ok(clause.code().clone())
        }
        Term::Atom(_) | Term::Compound(_) => {
            let clause = query.database().compile_goal(&goal, false)?;
            query.enter(site, clause.locals(), None);
            Ok(clause.code().clone())
        }
        _ => Err(PrologError::type_error("callable", goal.clone())),
    }
}

/// `call/1`.
struct Call;

impl Procedure for Call {
    fn predicate(&self) -> Option<Predicate> {
        Some(Predicate::new("call", 1))
    }

    fn call(&self, query: &mut Query, site: &CallSite<'_>) -> Result<Code, PrologError> {
        let Some(goal) = site.args.first() else {
            crate::bail!("call/1 without a goal");
        };
        let goal = query.frames().bind(goal, site.caller);
        run_goal(query, site, &goal)
    }
}

/// `call/2` to `call/8`: the extra arguments are appended to the goal.
struct CallN {
    arity: usize,
}

impl Procedure for CallN {
    fn predicate(&self) -> Option<Predicate> {
        Some(Predicate::new("call", self.arity))
    }

    fn call(&self, query: &mut Query, site: &CallSite<'_>) -> Result<Code, PrologError> {
        let args = site.bound_args(query);
        let Some((goal, extra)) = args.split_first() else {
            crate::bail!("call/{} without a goal", self.arity);
        };
        let goal = query.strip(goal)?;
        let goal = match &goal {
            Term::Var(_) | Term::Ref(_) => return Err(PrologError::instantiation_error()),
            Term::Atom(name) => Term::compound(name.as_str(), extra.to_vec()),
            Term::Compound(_) | Term::CompoundRef(_) => {
                let name = goal.as_callable()?.0.clone();
                let mut all = goal.args();
                all.extend_from_slice(extra);
                Term::compound(name.as_str(), all)
            }
            _ => return Err(PrologError::type_error("callable", goal.clone())),
        };
        run_goal(query, site, &goal)
    }
}

const CATCHER: usize = 0;
const HANDLER: usize = 1;
const BARRIER: usize = 2;

/// `catch(Goal, Catcher, Handler)`.
///
/// The frame keeps the catcher, the handler and the id of a barrier choice
/// point pushed before the goal runs. Catching unwinds to the barrier,
/// which undoes every binding and choice point the goal made.
struct Catch {
    call: Rc<dyn Procedure>,
}

impl Procedure for Catch {
    fn predicate(&self) -> Option<Predicate> {
        Some(Predicate::new("catch", 3))
    }

    #[inline]
    fn locals(&self) -> usize {
        3
    }

    fn invoke(&self, query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
        let [goal, catcher, handler] = args else {
            crate::bail!("catch/3 called with {} arguments", args.len());
        };
        let frame = query.callee();
        query.frames_mut().set_value(frame, CATCHER, catcher.clone());
        query.frames_mut().set_value(frame, HANDLER, handler.clone());
        let barrier = query.push_choice_point(Barrier);
        query
            .frames_mut()
            .set_value(frame, BARRIER, Term::int(barrier as i64));
        // Noop keeps the goal from being a tail call, so this frame stays
        // on the chain while the goal runs.
        Ok(Code::call(
            Code::noop(Code::Succeed),
            vec![goal.clone()],
            self.call.clone(),
        ))
    }

    fn catches(&self, query: &mut Query, ball: &Term) -> Result<Option<Code>, PrologError> {
        let frame = query.callee();
        let Some(barrier) = query
            .frames()
            .value(frame, BARRIER)
            .and_then(|id| id.as_int().ok())
        else {
            return Ok(None);
        };
        if !query.unwind_to(barrier as u64) {
            return Ok(None);
        }
        let (Some(catcher), Some(handler)) = (
            query.frames().value(frame, CATCHER).cloned(),
            query.frames().value(frame, HANDLER).cloned(),
        ) else {
            return Ok(None);
        };
        let ball = query.rebind(ball);
        if !query.unify(&catcher, &ball)? {
            return Ok(None);
        }
        trace!(target: "hornet::query", "caught in frame {}", frame);
        Ok(Some(Code::call(
            Code::Succeed,
            vec![handler],
            self.call.clone(),
        )))
    }
}

fn throw(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let ball = query.strip(&args[0])?;
    if ball.is_var() {
        return Err(PrologError::instantiation_error());
    }
    Err(PrologError::throw(query.frames().unbind(&ball)))
}

/// `findall(Template, Goal, List)`.
///
/// Runs the goal followed by a collector that copies the template and
/// fails. A deferred choice point underneath builds the list once the
/// goal is exhausted.
struct Findall {
    call: Rc<dyn Procedure>,
}

impl Procedure for Findall {
    fn predicate(&self) -> Option<Predicate> {
        Some(Predicate::new("findall", 3))
    }

    fn invoke(&self, query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
        let [template, goal, target] = args else {
            crate::bail!("findall/3 called with {} arguments", args.len());
        };
        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = results.clone();
        let target = target.clone();
        query.push_choice_point(Once::new(move |query| {
            let found = std::mem::take(&mut *sink.borrow_mut());
            let items: Vec<Term> = found.iter().map(|item| query.rebind(item)).collect();
            Ok(outcome(query.unify(&Term::list(items), &target)?))
        }));
        let collect: Rc<dyn Procedure> = Rc::new(Collect {
            template: template.clone(),
            results,
        });
        Ok(Code::call(
            Code::call(Code::Fail, Vec::new(), collect),
            vec![goal.clone()],
            self.call.clone(),
        ))
    }
}

struct Collect {
    template: Term,
    results: Rc<RefCell<Vec<Term>>>,
}

impl Procedure for Collect {
    fn call(&self, query: &mut Query, _site: &CallSite<'_>) -> Result<Code, PrologError> {
        let copy = query.frames().unbind(&self.template);
        self.results.borrow_mut().push(copy);
        Ok(Code::Fail)
    }
}

/// Remaining values of `between/3`.
struct Range {
    next: Option<i64>,
    high: i64,
    target: Term,
}

impl Alternatives for Range {
    #[inline]
    fn has_next(&self) -> bool {
        self.next.is_some_and(|n| n <= self.high)
    }

    fn next(&mut self, query: &mut Query) -> Result<Code, PrologError> {
        let Some(n) = self.next.filter(|n| *n <= self.high) else {
            return Ok(Code::Fail);
        };
        self.next = n.checked_add(1);
        Ok(outcome(query.unify(&self.target, &Term::int(n))?))
    }
}

fn between(query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
    let low = query.strip(&args[0])?.as_int()?;
    let high = match query.strip(&args[1])? {
        Term::Atom(a) if a == "inf" || a == "infinite" => i64::MAX,
        t => t.as_int()?,
    };
    let x = query.strip(&args[2])?;
    if !x.is_var() {
        let v = x.as_int()?;
        return Ok(outcome(low <= v && v <= high));
    }
    query.push_choice_point(Range {
        next: Some(low),
        high,
        target: x,
    });
    Ok(Code::Fail)
}

const RESULT: &str = "$Result";

/// `thunk(T, Template, Goal)`: binds `T` to a lazy term that runs a copy
/// of `Goal` in a fresh query when first forced and yields `Template`, or
/// `[]` if the goal fails.
fn thunk(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let copies = query.frames().unbind_all([&args[1], &args[2]]);
    let [template, goal] = <[Term; 2]>::try_from(copies)
        .map_err(|_| PrologError::Fatal("thunk/3: copy arity mismatch".to_owned()))?;
    let goal = func!(","; goal, func!("="; var!(RESULT), template));
    let db = Rc::downgrade(query.database());
    let value = Term::thunk(move || {
        let Some(db) = db.upgrade() else {
            crate::bail!("thunk forced after its database was dropped");
        };
        let mut inner = db.query(&goal)?;
        Ok(match inner.ask()? {
            Some(solution) => solution
                .get(RESULT)
                .map_or_else(|| var!("_"), Term::anonymize),
            None => Term::nil(),
        })
    });
    query.unify(&args[0], &value)
}

pub(super) fn install(db: &Rc<Database>) -> Result<(), PrologError> {
    det(db, "true", 0, |_, _| Ok(true))?;
    det(db, "fail", 0, |_, _| Ok(false))?;
    det(db, "false", 0, |_, _| Ok(false))?;
    det(db, "throw", 1, throw)?;
    let call: Rc<dyn Procedure> = Rc::new(Call);
    db.register(call.clone())?;
    for arity in 2..=8 {
        db.register(Rc::new(CallN { arity }))?;
    }
    db.register(Rc::new(Catch { call: call.clone() }))?;
    db.register(Rc::new(Findall { call }))?;
    foreign(db, "between", 3, between)?;
    det(db, "thunk", 3, thunk)
}

/// Predicates defined as ordinary clauses.
pub(super) fn install_library(db: &Rc<Database>) -> Result<(), PrologError> {
    let g = || var!("G");
    db.consult([
        func!(":-"; func!("\\+"; g()), func!(";"; func!("->"; g(), "fail"), "true")),
        func!(":-"; func!("not"; g()), func!("\\+"; g())),
        func!(":-"; func!("once"; g()), func!("->"; g(), "true")),
        func!(":-"; func!("ignore"; g()), func!(";"; func!("->"; g(), "true"), "true")),
        func!(":-";
            func!("forall"; var!("C"), var!("A")),
            func!("\\+"; func!(","; var!("C"), func!("\\+"; var!("A"))))),
    ])
}

#[cfg(test)]
mod tests {
    use crate::{atom, func, list, var, Database, Term};

    #[test]
    fn nested_catch_picks_innermost_match() {
        let db = Database::new().unwrap();
        let inner = func!("catch"; func!("throw"; func!("e"; 1)), func!("e"; var!("X")), func!("="; var!("R"), "inner"));
        let goal = func!("catch"; inner, "_", func!("="; var!("R"), "outer"));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("R"), Some(&atom!("inner")));
        assert_eq!(solution.get("X"), Some(&Term::int(1)));
    }

    #[test]
    fn handler_errors_escape_their_own_catch() {
        let db = Database::new().unwrap();
        let inner = func!("catch"; func!("throw"; "a"), "a", func!("throw"; "b"));
        let goal = func!("catch"; inner, var!("E"), "true");
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("E"), Some(&atom!("b")));
    }

    #[test]
    fn errors_from_builtins_are_catchable() {
        let db = Database::new().unwrap();
        let goal = func!("catch"; func!("undefined"; 1, var!("L")), var!("E"), "true");
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(
            solution.get("E"),
            Some(&func!("existence_error"; "procedure", func!("/"; "undefined", 2)))
        );
        let goal = func!("catch"; func!("functor"; var!("T"), var!("N"), 2), var!("E"), "true");
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("E"), Some(&atom!("instantiation_error")));
    }

    #[test]
    fn nested_findall() {
        let db = Database::new().unwrap();
        // findall(L, (between(1, 3, N), findall(M, between(1, N, M), L)), Ls)
        let goal = func!("findall";
            var!("L"),
            func!(",";
                func!("between"; 1, 3, var!("N")),
                func!("findall"; var!("M"), func!("between"; 1, var!("N"), var!("M")), var!("L"))),
            var!("Ls"));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(
            solution.get("Ls"),
            Some(&list![list![1], list![1, 2], list![1, 2, 3]])
        );
    }

    #[test]
    fn call_with_atom_goal() {
        let db = Database::new().unwrap();
        db.consult([func!("p"; "x", "y")]).unwrap();
        let goal = func!("call"; "p", var!("A"), var!("B"));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("A"), Some(&atom!("x")));
        assert_eq!(solution.get("B"), Some(&atom!("y")));
    }

    #[test]
    fn thunk_runs_goal_when_forced() {
        let db = Database::new().unwrap();
        let goal = func!(",";
            func!("thunk"; var!("T"), var!("X"), func!("between"; 5, 9, var!("X"))),
            func!("="; var!("T"), var!("V")));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("V"), Some(&Term::int(5)));

        let goal = func!(",";
            func!("thunk"; var!("T"), var!("X"), "fail"),
            func!("="; var!("T"), var!("V")));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("V"), Some(&Term::nil()));
    }

    #[test]
    fn ignore_and_not() {
        let db = Database::new().unwrap();
        assert_eq!(db.query(&func!("ignore"; "fail")).unwrap().solutions().unwrap().len(), 1);
        assert!(db.query(&func!("not"; "true")).unwrap().ask().unwrap().is_none());
    }
}

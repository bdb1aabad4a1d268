//! Prolog flags and the operator table: `set_prolog_flag/2`,
//! `current_prolog_flag/2`, `op/3` and `current_op/3`.

use super::{det, enumerate, foreign};
use crate::ops::{OpType, MAX_PRIORITY, MIN_PRIORITY};
use crate::{func, Code, Database, PrologError, Query, Term};
use std::rc::Rc;

/// Checks an argument that must be an atom when bound.
fn atom_or_var(query: &Query, term: &Term) -> Result<Term, PrologError> {
    let term = query.strip(term)?;
    if !term.is_var() {
        term.as_atom()?;
    }
    Ok(term)
}

fn set_prolog_flag(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let name = query.strip(&args[0])?.as_atom()?.clone();
    let value = query.strip(&args[1])?;
    if value.is_var() {
        return Err(PrologError::instantiation_error());
    }
    if name == "unknown"
        && !matches!(&value, Term::Atom(a) if ["error", "fail", "warning"].contains(&a.as_str()))
    {
        return Err(PrologError::domain_error(
            "flag_value",
            func!("+"; name, value),
        ));
    }
    let value = query.frames().unbind(&value);
    query.database().set_flag(name, value)?;
    Ok(true)
}

fn current_prolog_flag(query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
    atom_or_var(query, &args[0])?;
    let flags = query
        .database()
        .flags()
        .into_iter()
        .map(|(name, value)| func!("flag"; name, value))
        .collect();
    let target = func!("flag"; args[0].clone(), args[1].clone());
    Ok(enumerate(query, flags, target))
}

fn specifier(term: &Term) -> Result<OpType, PrologError> {
    term.as_atom()?.as_str().parse()
}

fn op(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let priority = query.strip(&args[0])?.as_int()?;
    let kind = specifier(&query.strip(&args[1])?)?;
    let names = query.strip(&args[2])?;
    let names = if names.is_atom() && names != Term::nil() {
        vec![names]
    } else {
        query.frames().list_items(&names)?
    };
    for name in &names {
        let name = query.strip(name)?.as_atom()?.clone();
        query.database().define_op(priority, kind, name)?;
    }
    Ok(true)
}

fn current_op(query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
    let priority = query.strip(&args[0])?;
    if !priority.is_var() {
        let p = priority.as_int()?;
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&p) {
            return Err(PrologError::domain_error("operator_priority", priority));
        }
    }
    let kind = atom_or_var(query, &args[1])?;
    if !kind.is_var() {
        specifier(&kind)?;
    }
    atom_or_var(query, &args[2])?;
    let ops = query
        .database()
        .ops()
        .into_iter()
        .map(|def| func!("op"; Term::int(def.priority), def.kind.as_str(), def.name))
        .collect();
    let target = func!("op"; args[0].clone(), args[1].clone(), args[2].clone());
    Ok(enumerate(query, ops, target))
}

pub(super) fn install(db: &Rc<Database>) -> Result<(), PrologError> {
    det(db, "set_prolog_flag", 2, set_prolog_flag)?;
    foreign(db, "current_prolog_flag", 2, current_prolog_flag)?;
    det(db, "op", 3, op)?;
    foreign(db, "current_op", 3, current_op)
}

#[cfg(test)]
mod tests {
    use crate::{atom, func, list, var, Database, Term};
    use std::rc::Rc;

    fn succeeds(db: &Rc<Database>, goal: Term) -> bool {
        db.query(&goal).unwrap().ask().unwrap().is_some()
    }

    #[test]
    fn flags_round_trip() {
        let db = Database::new().unwrap();
        assert!(succeeds(&db, func!("set_prolog_flag"; "double_quotes", "atom")));
        let goal = func!("current_prolog_flag"; "double_quotes", var!("V"));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("V"), Some(&atom!("atom")));
        let all = db.query(&func!("current_prolog_flag"; var!("F"), var!("V"))).unwrap();
        assert_eq!(all.count(), 5);
        let err = db
            .query(&func!("set_prolog_flag"; "bounded", "false"))
            .unwrap()
            .ask()
            .unwrap_err();
        assert_eq!(
            err.ball(),
            Some(&func!("permission_error"; "modify", "flag", "bounded"))
        );
    }

    #[test]
    fn unknown_flag_controls_undefined_calls() {
        let db = Database::new().unwrap();
        let goal = func!(","; func!("set_prolog_flag"; "unknown", "fail"), "nowhere");
        assert!(db.query(&goal).unwrap().ask().unwrap().is_none());
        let err = db
            .query(&func!("set_prolog_flag"; "unknown", "maybe"))
            .unwrap()
            .ask()
            .unwrap_err();
        assert_eq!(
            err.ball(),
            Some(&func!("domain_error"; "flag_value", func!("+"; "unknown", "maybe")))
        );
    }

    #[test]
    fn op_defines_and_current_op_reads() {
        let db = Database::new().unwrap();
        assert!(succeeds(&db, func!("op"; 700, "xfx", list!["===", "=/="])));
        let goal = func!("current_op"; var!("P"), var!("T"), "=/=");
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("P"), Some(&Term::int(700)));
        assert_eq!(solution.get("T"), Some(&atom!("xfx")));
        let goal = func!("current_op"; var!("P"), var!("T"), "-");
        assert_eq!(db.query(&goal).unwrap().count(), 2);
        assert!(succeeds(&db, func!("op"; 0, "xfx", "===")));
        assert!(!succeeds(&db, func!("current_op"; var!("P"), var!("T"), "===")));
        let err = db.query(&func!("op"; 1300, "xfx", "foo")).unwrap().ask().unwrap_err();
        assert_eq!(err.ball(), Some(&func!("domain_error"; "operator_priority", 1300)));
        let err = db.query(&func!("current_op"; var!("P"), "abc", var!("N"))).unwrap().ask().unwrap_err();
        assert_eq!(err.ball(), Some(&func!("domain_error"; "operator_specifier", "abc")));
    }
}

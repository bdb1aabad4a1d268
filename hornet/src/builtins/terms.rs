//! Term inspection, construction, comparison and unification built-ins.

use super::det;
use crate::{Database, Number, PrologError, Query, Term};
use std::cmp::Ordering;
use std::rc::Rc;

fn unify(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    query.unify(&args[0], &args[1])
}

fn not_unifiable(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    Ok(!query.unifiable(&args[0], &args[1])?)
}

fn compare_args(query: &Query, args: &[Term]) -> Result<Ordering, PrologError> {
    query.frames().compare(&args[0], &args[1])
}

fn compare(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let ord = query.frames().compare(&args[1], &args[2])?;
    let order = query.strip(&args[0])?;
    if !order.is_var() {
        let name = order.as_atom()?;
        if !matches!(name.as_str(), "<" | "=" | ">") {
            return Err(PrologError::domain_error("order", order.clone()));
        }
    }
    let symbol = match ord {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    query.unify(&args[0], &Term::atom(symbol))
}

fn functor(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let term = query.strip(&args[0])?;
    if !term.is_var() {
        let (name, arity) = match term.functor() {
            Some((name, arity)) => (Term::Atom(name.clone()), arity),
            None => (term.clone(), 0),
        };
        return Ok(query.unify(&args[1], &name)?
            && query.unify(&args[2], &Term::int(arity as i64))?);
    }
    let name = query.strip(&args[1])?;
    let arity = query.strip(&args[2])?;
    if name.is_var() || arity.is_var() {
        return Err(PrologError::instantiation_error());
    }
    let n = arity.as_int()?;
    if n < 0 {
        return Err(PrologError::domain_error("not_less_than_zero", arity));
    }
    if name.is_compound() {
        return Err(PrologError::type_error("atomic", name));
    }
    if n == 0 {
        return query.unify(&args[0], &name);
    }
    let name = name.as_atom()?.clone();
    let vars = query.fresh_vars(n as usize);
    query.unify(&args[0], &Term::compound(name.as_str(), vars))
}

fn arg(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let n = query.strip(&args[0])?.as_int()?;
    let term = query.strip(&args[1])?;
    if term.is_var() {
        return Err(PrologError::instantiation_error());
    }
    if !term.is_compound() {
        return Err(PrologError::type_error("compound", term));
    }
    if n < 0 {
        return Err(PrologError::domain_error("not_less_than_zero", Term::int(n)));
    }
    match (n as usize).checked_sub(1).and_then(|i| term.arg(i)) {
        Some(value) => query.unify(&args[2], &value),
        None => Ok(false),
    }
}

fn univ(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let term = query.strip(&args[0])?;
    if !term.is_var() {
        let list = match term.functor() {
            Some((name, arity)) if arity > 0 => {
                Term::list(std::iter::once(Term::Atom(name.clone())).chain(term.args()))
            }
            _ => Term::list([term.clone()]),
        };
        return query.unify(&args[1], &list);
    }
    let items = query.frames().list_items(&args[1])?;
    let Some((head, rest)) = items.split_first() else {
        return Err(PrologError::domain_error("non_empty_list", Term::nil()));
    };
    let head = query.strip(head)?;
    if head.is_var() {
        return Err(PrologError::instantiation_error());
    }
    if rest.is_empty() {
        if !head.is_atomic() {
            return Err(PrologError::type_error("atomic", head));
        }
        return query.unify(&args[0], &head);
    }
    let name = head.as_atom()?.clone();
    query.unify(&args[0], &Term::compound(name.as_str(), rest.to_vec()))
}

fn copy_term(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let copy = query.rebind(&args[0]);
    query.unify(&args[1], &copy)
}

fn term_variables(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let vars = query.frames().variables(&args[0]);
    query.unify(&args[1], &Term::list(vars))
}

pub(super) fn install(db: &Rc<Database>) -> Result<(), PrologError> {
    det(db, "=", 2, unify)?;
    det(db, "\\=", 2, not_unifiable)?;
    det(db, "==", 2, |q, a| Ok(compare_args(q, a)? == Ordering::Equal))?;
    det(db, "\\==", 2, |q, a| Ok(compare_args(q, a)? != Ordering::Equal))?;
    det(db, "@<", 2, |q, a| Ok(compare_args(q, a)? == Ordering::Less))?;
    det(db, "@>", 2, |q, a| Ok(compare_args(q, a)? == Ordering::Greater))?;
    det(db, "@=<", 2, |q, a| Ok(compare_args(q, a)? != Ordering::Greater))?;
    det(db, "@>=", 2, |q, a| Ok(compare_args(q, a)? != Ordering::Less))?;
    det(db, "compare", 3, compare)?;
    det(db, "var", 1, |q, a| Ok(q.strip(&a[0])?.is_var()))?;
    det(db, "nonvar", 1, |q, a| Ok(!q.strip(&a[0])?.is_var()))?;
    det(db, "atom", 1, |q, a| Ok(q.strip(&a[0])?.is_atom()))?;
    det(db, "number", 1, |q, a| Ok(q.strip(&a[0])?.is_number()))?;
    det(db, "integer", 1, |q, a| {
        Ok(matches!(q.strip(&a[0])?, Term::Number(Number::Int(_))))
    })?;
    det(db, "float", 1, |q, a| {
        Ok(matches!(q.strip(&a[0])?, Term::Number(Number::Float(_))))
    })?;
    det(db, "atomic", 1, |q, a| Ok(q.strip(&a[0])?.is_atomic()))?;
    det(db, "compound", 1, |q, a| Ok(q.strip(&a[0])?.is_compound()))?;
    det(db, "callable", 1, |q, a| Ok(q.strip(&a[0])?.is_callable()))?;
    det(db, "is_list", 1, |q, a| Ok(q.frames().list_items(&a[0]).is_ok()))?;
    det(db, "functor", 3, functor)?;
    det(db, "arg", 3, arg)?;
    det(db, "=..", 2, univ)?;
    det(db, "copy_term", 2, copy_term)?;
    det(db, "term_variables", 2, term_variables)
}

#[cfg(test)]
mod tests {
    use crate::{atom, func, list, var, Database, Term};

    fn first(db: &std::rc::Rc<Database>, goal: Term, name: &str) -> Option<Term> {
        let solution = db.query(&goal).unwrap().ask().unwrap()?;
        solution.get(name).cloned()
    }

    fn succeeds(db: &std::rc::Rc<Database>, goal: Term) -> bool {
        db.query(&goal).unwrap().ask().unwrap().is_some()
    }

    #[test]
    fn comparisons() {
        let db = Database::new().unwrap();
        assert!(succeeds(&db, func!("=="; func!("f"; 1), func!("f"; 1))));
        assert!(!succeeds(&db, func!("=="; var!("X"), var!("Y"))));
        assert!(succeeds(&db, func!("\\=="; var!("X"), var!("Y"))));
        assert!(succeeds(&db, func!("@<"; 1, "a")));
        assert!(succeeds(&db, func!("@>="; func!("f"; 2), func!("f"; 1))));
        assert_eq!(first(&db, func!("compare"; var!("O"), 1, 2), "O"), Some(atom!("<")));
        assert!(succeeds(&db, func!("\\="; "a", "b")));
        assert!(!succeeds(&db, func!("\\="; var!("X"), "b")));
    }

    #[test]
    fn not_unifiable_leaves_no_bindings() {
        let db = Database::new().unwrap();
        let goal = func!(","; func!("\\="; func!("f"; var!("X"), 1), func!("f"; 2, 2)), func!("var"; var!("X")));
        assert!(succeeds(&db, goal));
    }

    #[test]
    fn type_tests() {
        let db = Database::new().unwrap();
        assert!(succeeds(&db, func!("var"; var!("X"))));
        assert!(succeeds(&db, func!("integer"; 3)));
        assert!(!succeeds(&db, func!("integer"; 3.0)));
        assert!(succeeds(&db, func!("float"; 3.0)));
        assert!(succeeds(&db, func!("atomic"; "a")));
        assert!(succeeds(&db, func!("compound"; func!("f"; 1))));
        assert!(succeeds(&db, func!("callable"; "a")));
        assert!(succeeds(&db, func!("is_list"; list![1, 2])));
        assert!(!succeeds(&db, func!("is_list"; list![1; var!("T")])));
    }

    #[test]
    fn functor_both_ways() {
        let db = Database::new().unwrap();
        let goal = func!("functor"; func!("f"; 1, 2), var!("N"), var!("A"));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("N"), Some(&atom!("f")));
        assert_eq!(solution.get("A"), Some(&Term::int(2)));

        let t = first(&db, func!("functor"; var!("T"), "g", 3), "T").unwrap();
        assert!(t.has_functor("g", 3));
        assert!(t.args().iter().all(Term::is_var));
        assert_eq!(first(&db, func!("functor"; var!("T"), 7, 0), "T"), Some(Term::int(7)));
    }

    #[test]
    fn arg_and_univ() {
        let db = Database::new().unwrap();
        assert_eq!(first(&db, func!("arg"; 2, func!("f"; "a", "b"), var!("X")), "X"), Some(atom!("b")));
        assert!(!succeeds(&db, func!("arg"; 3, func!("f"; "a", "b"), var!("X"))));
        assert_eq!(
            first(&db, func!("=.."; func!("f"; 1, 2), var!("L")), "L"),
            Some(list!["f", 1, 2])
        );
        assert_eq!(
            first(&db, func!("=.."; var!("T"), list!["g", "a"]), "T"),
            Some(func!("g"; "a"))
        );
        assert_eq!(first(&db, func!("=.."; var!("T"), list![5]), "T"), Some(Term::int(5)));
    }

    #[test]
    fn copy_term_renames_variables() {
        let db = Database::new().unwrap();
        let goal = func!(",";
            func!("copy_term"; func!("f"; var!("X"), var!("X"), var!("Y")), var!("C")),
            func!("="; var!("X"), 1));
        let c = first(&db, goal, "C").unwrap();
        let args = c.args();
        assert!(args[0].is_var());
        assert_eq!(args[0], args[1]);
        assert_ne!(args[0], args[2]);
    }

    #[test]
    fn term_variables_in_order() {
        let db = Database::new().unwrap();
        let goal = func!(",";
            func!("term_variables"; func!("f"; var!("B"), func!("g"; var!("A"), var!("B"))), var!("Vs")),
            func!("="; var!("Vs"), list![1, 2]));
        let solution = db.query(&goal).unwrap().ask().unwrap().unwrap();
        assert_eq!(solution.get("B"), Some(&Term::int(1)));
        assert_eq!(solution.get("A"), Some(&Term::int(2)));
    }
}

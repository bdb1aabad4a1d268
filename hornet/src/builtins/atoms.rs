//! Atom built-ins: `atom_length/2`, `atom_concat/3`, `sub_atom/5`,
//! `atom_chars/2`, `atom_codes/2` and `char_code/2`.
//!
//! Lengths and offsets count characters, not bytes.

use super::{det, enumerate, foreign, outcome};
use crate::{func, Alternatives, Code, Database, PrologError, Query, Term};
use std::rc::Rc;

/// Reads an integer argument that may be unbound.
fn optional_length(query: &Query, term: &Term) -> Result<Option<i64>, PrologError> {
    let term = query.strip(term)?;
    if term.is_var() {
        return Ok(None);
    }
    let n = term.as_int()?;
    if n < 0 {
        return Err(PrologError::domain_error("not_less_than_zero", term));
    }
    Ok(Some(n))
}

fn atom_text(query: &Query, term: &Term) -> Result<String, PrologError> {
    Ok(query.strip(term)?.as_atom()?.as_str().to_owned())
}

fn atom_length(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let text = atom_text(query, &args[0])?;
    let length = text.chars().count() as i64;
    if let Some(n) = optional_length(query, &args[1])? {
        return Ok(n == length);
    }
    query.unify(&args[1], &Term::int(length))
}

fn atom_concat(query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
    let whole = query.strip(&args[2])?;
    if whole.is_var() {
        let joined = atom_text(query, &args[0])? + atom_text(query, &args[1])?.as_str();
        return Ok(outcome(query.unify(&whole, &Term::atom(joined))?));
    }
    let text = whole.as_atom()?.as_str().to_owned();
    let splits = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .map(|i| func!("+"; &text[..i], &text[i..]))
        .collect();
    let target = func!("+"; args[0].clone(), args[1].clone());
    Ok(enumerate(query, splits, target))
}

/// Remaining substrings of a `sub_atom/5` call, by start then length.
struct Substrings {
    chars: Vec<char>,
    start: usize,
    end: usize,
    /// Set when the substring or its length is known.
    length: Option<usize>,
    target: Term,
}

impl Substrings {
    fn advance(&mut self) {
        match self.length {
            Some(length) => {
                self.start += 1;
                self.end = self.start + length;
            }
            None if self.end < self.chars.len() => self.end += 1,
            None => {
                self.start += 1;
                self.end = self.start;
            }
        }
    }
}

impl Alternatives for Substrings {
    #[inline]
    fn has_next(&self) -> bool {
        self.end <= self.chars.len()
    }

    fn next(&mut self, query: &mut Query) -> Result<Code, PrologError> {
        let n = self.chars.len();
        while self.end <= n {
            let (start, end) = (self.start, self.end);
            self.advance();
            let sub: String = self.chars[start..end].iter().collect();
            let candidate = func!("sub";
                Term::int(start as i64),
                Term::int((end - start) as i64),
                Term::int((n - end) as i64),
                Term::atom(sub));
            if query.unify(&self.target, &candidate)? {
                return Ok(Code::Succeed);
            }
        }
        Ok(Code::Fail)
    }
}

fn sub_atom(query: &mut Query, args: &[Term]) -> Result<Code, PrologError> {
    let chars: Vec<char> = atom_text(query, &args[0])?.chars().collect();
    optional_length(query, &args[1])?;
    optional_length(query, &args[3])?;
    let mut length = optional_length(query, &args[2])?.map(|n| n as usize);
    let sub = query.strip(&args[4])?;
    if !sub.is_var() {
        length = Some(sub.as_atom()?.as_str().chars().count());
    }
    query.push_choice_point(Substrings {
        chars,
        start: 0,
        end: length.unwrap_or(0),
        length,
        target: func!("sub"; args[1].clone(), args[2].clone(), args[3].clone(), sub),
    });
    Ok(Code::Fail)
}

fn char_of(query: &Query, item: &Term) -> Result<char, PrologError> {
    let item = query.strip(item)?;
    let mut chars = item.as_atom()?.as_str().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(PrologError::type_error("character", item)),
    }
}

fn code_of(query: &Query, item: &Term) -> Result<char, PrologError> {
    let code = query.strip(item)?.as_int()?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| PrologError::representation_error("character_code"))
}

#[inline]
fn char_term(c: char) -> Term {
    Term::atom(c.to_string())
}

#[inline]
fn code_term(c: char) -> Term {
    Term::int(c as u32)
}

/// Converts between an atom and a list of its characters or codes.
fn text_list(
    query: &mut Query,
    args: &[Term],
    item: fn(char) -> Term,
    read: fn(&Query, &Term) -> Result<char, PrologError>,
) -> Result<bool, PrologError> {
    let atom = query.strip(&args[0])?;
    if !atom.is_var() {
        let items = atom.as_atom()?.as_str().chars().map(item).collect::<Vec<_>>();
        return query.unify(&args[1], &Term::list(items));
    }
    let text = query
        .frames()
        .list_items(&args[1])?
        .iter()
        .map(|c| read(query, c))
        .collect::<Result<String, _>>()?;
    query.unify(&atom, &Term::atom(text))
}

fn char_code(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let c = query.strip(&args[0])?;
    if !c.is_var() {
        let c = char_of(query, &c)?;
        return query.unify(&args[1], &code_term(c));
    }
    let c = code_of(query, &args[1])?;
    query.unify(&args[0], &char_term(c))
}

pub(super) fn install(db: &Rc<Database>) -> Result<(), PrologError> {
    det(db, "atom_length", 2, atom_length)?;
    foreign(db, "atom_concat", 3, atom_concat)?;
    foreign(db, "sub_atom", 5, sub_atom)?;
    det(db, "atom_chars", 2, |q, a| text_list(q, a, char_term, char_of))?;
    det(db, "atom_codes", 2, |q, a| text_list(q, a, code_term, code_of))?;
    det(db, "char_code", 2, char_code)
}

#[cfg(test)]
mod tests {
    use crate::{atom, func, list, var, Database, Term};
    use std::rc::Rc;

    fn db() -> Rc<Database> {
        Database::new().unwrap()
    }

    fn values(db: &Rc<Database>, goal: &Term, name: &str) -> Vec<Term> {
        db.query(goal)
            .unwrap()
            .map(|s| s.unwrap().get(name).cloned().unwrap())
            .collect()
    }

    #[test]
    fn atom_length_counts_characters() {
        let db = db();
        assert_eq!(values(&db, &func!("atom_length"; "héllo", var!("N")), "N"), vec![Term::int(5)]);
        assert!(db.query(&func!("atom_length"; "ab", 3)).unwrap().ask().unwrap().is_none());
        let err = db.query(&func!("atom_length"; var!("A"), var!("N"))).unwrap().ask().unwrap_err();
        assert_eq!(err.ball(), Some(&atom!("instantiation_error")));
        let err = db.query(&func!("atom_length"; 12, var!("N"))).unwrap().ask().unwrap_err();
        assert_eq!(err.ball(), Some(&func!("type_error"; "atom", 12)));
    }

    #[test]
    fn atom_concat_joins_and_splits() {
        let db = db();
        let goal = func!("atom_concat"; "ab", "cd", var!("X"));
        assert_eq!(values(&db, &goal, "X"), vec![atom!("abcd")]);
        let goal = func!("atom_concat"; var!("X"), var!("Y"), "ab");
        let pairs: Vec<Term> = db
            .query(&goal)
            .unwrap()
            .map(|s| {
                let s = s.unwrap();
                func!("+"; s.get("X").cloned().unwrap(), s.get("Y").cloned().unwrap())
            })
            .collect();
        assert_eq!(
            pairs,
            vec![func!("+"; "", "ab"), func!("+"; "a", "b"), func!("+"; "ab", "")]
        );
        let goal = func!("atom_concat"; var!("X"), "b", "ab");
        assert_eq!(values(&db, &goal, "X"), vec![atom!("a")]);
    }

    #[test]
    fn sub_atom_enumerates_substrings() {
        let db = db();
        let goal = func!("sub_atom"; "abc", var!("B"), 2, var!("A"), var!("S"));
        assert_eq!(values(&db, &goal, "S"), vec![atom!("ab"), atom!("bc")]);
        let goal = func!("sub_atom"; "abc", var!("B"), var!("L"), var!("A"), var!("S"));
        assert_eq!(db.query(&goal).unwrap().count(), 10);
        let goal = func!("sub_atom"; "abab", var!("B"), var!("L"), var!("A"), "ab");
        assert_eq!(values(&db, &goal, "B"), vec![Term::int(0), Term::int(2)]);
        let goal = func!("sub_atom"; "abc", var!("B"), var!("L"), 0, var!("S"));
        assert_eq!(
            values(&db, &goal, "S"),
            vec![atom!("abc"), atom!("bc"), atom!("c"), atom!("")]
        );
    }

    #[test]
    fn atom_chars_and_codes() {
        let db = db();
        let goal = func!("atom_chars"; "hi", var!("L"));
        assert_eq!(values(&db, &goal, "L"), vec![list!["h", "i"]]);
        let goal = func!("atom_chars"; var!("A"), list!["o", "k"]);
        assert_eq!(values(&db, &goal, "A"), vec![atom!("ok")]);
        let goal = func!("atom_codes"; "AB", var!("L"));
        assert_eq!(values(&db, &goal, "L"), vec![list![65, 66]]);
        let goal = func!("atom_codes"; var!("A"), list![104, 105]);
        assert_eq!(values(&db, &goal, "A"), vec![atom!("hi")]);
        let err = db
            .query(&func!("atom_chars"; var!("A"), list!["ab"]))
            .unwrap()
            .ask()
            .unwrap_err();
        assert_eq!(err.ball(), Some(&func!("type_error"; "character", "ab")));
    }

    #[test]
    fn char_code_both_ways() {
        let db = db();
        assert_eq!(values(&db, &func!("char_code"; "a", var!("C")), "C"), vec![Term::int(97)]);
        assert_eq!(values(&db, &func!("char_code"; var!("A"), 98), "A"), vec![atom!("b")]);
        let err = db.query(&func!("char_code"; var!("A"), -1)).unwrap().ask().unwrap_err();
        assert_eq!(err.ball(), Some(&func!("representation_error"; "character_code")));
    }
}

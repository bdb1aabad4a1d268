//! Defines [`TermDisplay`], a formatter for rendering [`Term`] values.
//!
//! Terms are written in canonical functional notation, except lists which
//! use the bracket syntax. Given the [`Frames`] of a query, variables are
//! dereferenced first so bound variables show their values.

use crate::term::{DOT, NIL};
use crate::{Frames, Term, View};
use std::fmt;

/// Nesting below this depth is elided, which keeps cyclic bindings printable.
const MAX_DEPTH: usize = 1000;

/// A term paired with the frames to resolve it in.
///
/// Construct instances via [`Term::display`] or [`Term::display_detached`].
///
/// ### Example
/// ```rust
/// use hornet::{func, list, Term};
/// let term = func!("point"; 1, 2.0, list!["a", "B c"]);
/// assert_eq!(term.display_detached().to_string(), "point(1, 2.0, [a, 'B c'])");
/// assert_eq!(term.display_detached().unquoted().to_string(), "point(1, 2.0, [a, B c])");
/// ```
pub struct TermDisplay<'a> {
    term: &'a Term,
    frames: Option<&'a Frames>,
    quoted: bool,
}

impl Term {
    /// Return a [`TermDisplay`] that resolves variables through `frames`.
    #[inline]
    pub fn display<'a>(&'a self, frames: &'a Frames) -> TermDisplay<'a> {
        TermDisplay {
            term: self,
            frames: Some(frames),
            quoted: true,
        }
    }

    /// Return a [`TermDisplay`] for a term that does not depend on any
    /// frame, such as a solution value or an error ball.
    #[inline]
    pub fn display_detached(&self) -> TermDisplay<'_> {
        TermDisplay {
            term: self,
            frames: None,
            quoted: true,
        }
    }
}

impl<'a> TermDisplay<'a> {
    /// Write atoms without quotes, as `write/1` does.
    #[inline]
    pub fn unquoted(mut self) -> Self {
        self.quoted = false;
        self
    }

    fn resolve(&self, term: &Term) -> Term {
        match self.frames {
            Some(frames) => frames.resolve(term),
            None => term.clone(),
        }
    }

    fn write_term(&self, f: &mut fmt::Formatter<'_>, term: &Term, depth: usize) -> fmt::Result {
        if depth > MAX_DEPTH {
            return f.write_str("...");
        }
        let term = self.resolve(term);
        if term.has_functor(DOT, 2) {
            return self.write_list(f, &term, depth);
        }
        match term.view() {
            View::Int(i) => write!(f, "{i}"),
            View::Float(r) => {
                if r.fract() == 0.0 && r.is_finite() {
                    write!(f, "{:.1}", r)
                } else {
                    write!(f, "{}", r)
                }
            }
            View::Atom(a) => self.write_atom(f, a.as_str()),
            View::Var(v) => match &term {
                Term::Ref(r) => write!(f, "_G{}_{}", r.frame(), r.id()),
                _ if v.is_wildcard() => f.write_str("_"),
                _ => write!(f, "{}", v.name()),
            },
            View::Opaque(o) => write!(f, "<opaque:{:#x}>", o.addr()),
            View::Thunk(t) => match t.is_forced().then(|| t.force()) {
                Some(Ok(value)) => self.write_term(f, &value, depth + 1),
                _ => f.write_str("<thunk>"),
            },
            View::Func(name, args) => {
                self.write_atom(f, name.as_str())?;
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.write_term(f, &arg, depth + 1)?;
                }
                f.write_str(")")
            }
        }
    }

    fn write_list(&self, f: &mut fmt::Formatter<'_>, list: &Term, depth: usize) -> fmt::Result {
        f.write_str("[")?;
        let mut rest = list.clone();
        let mut first = true;
        loop {
            let Some((head, tail)) = rest.split(DOT) else {
                break;
            };
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            self.write_term(f, &head, depth + 1)?;
            rest = self.resolve(&tail);
        }
        if !rest.has_functor(NIL, 0) {
            f.write_str(" | ")?;
            self.write_term(f, &rest, depth + 1)?;
        }
        f.write_str("]")
    }

    fn write_atom(&self, f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
        if !self.quoted || !needs_quotes(s) {
            return f.write_str(s);
        }
        f.write_str("'")?;
        for ch in s.chars() {
            match ch {
                '\\' => f.write_str("\\\\")?,
                '\'' => f.write_str("\\'")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                c => write!(f, "{}", c)?,
            }
        }
        f.write_str("'")
    }
}

fn needs_quotes(s: &str) -> bool {
    const SYMBOLS: &str = "+-*/\\^<>=~:.?@#&$";
    if matches!(s, "[]" | "!" | ";" | "{}") {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {
            !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        Some(c) if SYMBOLS.contains(c) => !chars.all(|c| SYMBOLS.contains(c)),
        _ => true,
    }
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_term(f, self.term, 0)
    }
}

/// Writes the term quoted, without resolving variables.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display_detached().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{atom, func, list, var, Code, Var};

    #[test]
    fn atoms_are_quoted_when_needed() {
        assert_eq!(atom!("abc").to_string(), "abc");
        assert_eq!(atom!("Abc").to_string(), "'Abc'");
        assert_eq!(atom!("a b").to_string(), "'a b'");
        assert_eq!(atom!("").to_string(), "''");
        assert_eq!(atom!("it's").to_string(), "'it\\'s'");
        assert_eq!(atom!("[]").to_string(), "[]");
        assert_eq!(atom!("=..").to_string(), "=..");
        assert_eq!(atom!(",").to_string(), "','");
        assert_eq!(atom!("Abc").display_detached().unquoted().to_string(), "Abc");
    }

    #[test]
    fn numbers() {
        assert_eq!(Term::int(-3).to_string(), "-3");
        assert_eq!(Term::float(2.0).to_string(), "2.0");
        assert_eq!(Term::float(0.25).to_string(), "0.25");
    }

    #[test]
    fn lists_and_compounds() {
        assert_eq!(list![1, 2, 3].to_string(), "[1, 2, 3]");
        assert_eq!(list![1; var!("T")].to_string(), "[1 | T]");
        assert_eq!(Term::nil().to_string(), "[]");
        assert_eq!(
            func!("f"; "a", func!("g"; var!("X")), var!("_")).to_string(),
            "f(a, g(X), _)"
        );
        assert_eq!(func!("-"; 1, 2).to_string(), "-(1, 2)");
    }

    #[test]
    fn variables_resolve_through_frames() {
        let mut frames = Frames::new();
        let root = frames.push(1, None, Code::Succeed, None, 2, None);
        let x = Term::Var(Var::indexed(0, crate::Atom::new("X")));
        let y = Term::Var(Var::indexed(1, crate::Atom::new("Y")));
        let t = frames.bind(&func!("f"; x.clone(), y.clone()), root);
        frames.set_value(root, 0, list!["a"]);
        assert_eq!(t.display(&frames).to_string(), "f([a], _G0_1)");
    }

    #[test]
    fn cyclic_binding_is_elided() {
        let mut frames = Frames::new();
        let root = frames.push(1, None, Code::Succeed, None, 1, None);
        let x = Term::Var(Var::indexed(0, crate::Atom::new("X")));
        let cyclic = frames.bind(&func!("f"; x), root);
        frames.set_value(root, 0, cyclic.clone());
        let text = cyclic.display(&frames).to_string();
        assert!(text.starts_with("f(f(f("));
        assert!(text.contains("..."));
        assert!(text.len() < 10_000);
    }
}

//! Defines [`View`], a borrowed read-only representation of a [`Term`],
//! typed accessors used by foreign procedures, and the standard order of
//! terms.

use crate::{Atom, FrameId, Frames, Number, Opaque, PrologError, Term, Thunk, Var};
use std::cmp::Ordering;
use std::fmt;

/// A borrowed view of a term.
///
/// Compound references and plain compounds look the same through a view;
/// the argument accessor takes care of pairing template arguments with
/// their frame.
#[derive(Clone, Copy)]
pub enum View<'a> {
    /// An unbound variable or reference.
    Var(&'a Var),
    Int(i64),
    Float(f64),
    Atom(&'a Atom),
    Opaque(&'a Opaque),
    /// A compound: functor name and arguments.
    Func(&'a Atom, Args<'a>),
    /// An unforced lazy term.
    Thunk(&'a Thunk),
}

/// Arguments of a compound, bound to their frame on access.
#[derive(Clone, Copy)]
pub struct Args<'a> {
    args: &'a [Term],
    frame: Option<FrameId>,
}

impl<'a> Args<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<Term> {
        let arg = self.args.get(i)?;
        Some(match self.frame {
            Some(frame) => arg.bind_to(frame),
            None => arg.clone(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Term> + 'a {
        let frame = self.frame;
        self.args.iter().map(move |arg| match frame {
            Some(frame) => arg.bind_to(frame),
            None => arg.clone(),
        })
    }
}

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Var(v) => f.debug_tuple("Var").field(v.name()).finish(),
            View::Int(i) => f.debug_tuple("Int").field(i).finish(),
            View::Float(x) => f.debug_tuple("Float").field(x).finish(),
            View::Atom(a) => f.debug_tuple("Atom").field(a).finish(),
            View::Opaque(o) => o.fmt(f),
            View::Func(name, args) => f
                .debug_tuple("Func")
                .field(name)
                .field(&args.iter().collect::<Vec<_>>())
                .finish(),
            View::Thunk(t) => t.fmt(f),
        }
    }
}

impl Term {
    /// Produce a [`View`] of this term. The term should already be
    /// dereferenced; a bound reference still shows as a variable.
    pub fn view(&self) -> View<'_> {
        match self {
            Term::Atom(a) => View::Atom(a),
            Term::Number(Number::Int(i)) => View::Int(*i),
            Term::Number(Number::Float(x)) => View::Float(*x),
            Term::Opaque(o) => View::Opaque(o),
            Term::Compound(c) => View::Func(
                c.name(),
                Args {
                    args: c.args(),
                    frame: None,
                },
            ),
            Term::CompoundRef(r) => View::Func(
                r.template().name(),
                Args {
                    args: r.template().args(),
                    frame: Some(r.frame()),
                },
            ),
            Term::Var(v) => View::Var(v),
            Term::Ref(r) => View::Var(r.var()),
            Term::Thunk(t) => View::Thunk(t),
        }
    }

    #[inline]
    fn expect_bound(&self) -> Result<&Self, PrologError> {
        if self.is_var() {
            Err(PrologError::instantiation_error())
        } else {
            Ok(self)
        }
    }

    /// Reads an atom, raising `instantiation_error` or `type_error(atom, T)`.
    pub fn as_atom(&self) -> Result<&Atom, PrologError> {
        match self.expect_bound()? {
            Term::Atom(a) => Ok(a),
            other => Err(PrologError::type_error("atom", other.clone())),
        }
    }

    pub fn as_int(&self) -> Result<i64, PrologError> {
        match self.expect_bound()? {
            Term::Number(Number::Int(i)) => Ok(*i),
            other => Err(PrologError::type_error("integer", other.clone())),
        }
    }

    pub fn as_number(&self) -> Result<Number, PrologError> {
        match self.expect_bound()? {
            Term::Number(n) => Ok(*n),
            other => Err(PrologError::type_error("number", other.clone())),
        }
    }

    /// Reads the name and arity of a callable term.
    pub fn as_callable(&self) -> Result<(&Atom, usize), PrologError> {
        match self.expect_bound()? {
            t @ (Term::Atom(_) | Term::Compound(_) | Term::CompoundRef(_)) => t
                .functor()
                .ok_or_else(|| PrologError::type_error("callable", t.clone())),
            other => Err(PrologError::type_error("callable", other.clone())),
        }
    }
}

/// Position of a term's kind in the standard order.
fn kind_order(t: &Term) -> usize {
    match t {
        Term::Var(_) | Term::Ref(_) => 0,
        Term::Number(_) => 1,
        Term::Atom(_) => 2,
        Term::Opaque(_) => 3,
        Term::Thunk(_) => 4,
        Term::Compound(c) => 5 + c.arity(),
        Term::CompoundRef(r) => 5 + r.template().arity(),
    }
}

impl Frames {
    /// Rank of an unbound variable: older frames first, then slot index.
    fn var_rank(&self, t: &Term) -> (u64, u32) {
        match t {
            Term::Ref(r) => (self.ordinal(r.frame()), r.id()),
            Term::Var(v) => (0, v.id()),
            _ => (0, 0),
        }
    }

    /// Compares two terms in the standard order: variables, numbers,
    /// atoms, opaque values, then compounds by arity, name and arguments.
    /// Thunks are forced first.
    pub fn compare(&self, a: &Term, b: &Term) -> Result<Ordering, PrologError> {
        let mut a = a.clone();
        let mut b = b.clone();
        loop {
            let x = self.strip(&a)?;
            let y = self.strip(&b)?;
            let ord = kind_order(&x).cmp(&kind_order(&y));
            if ord != Ordering::Equal {
                return Ok(ord);
            }
            match (x.view(), y.view()) {
                (View::Var(_), View::Var(_)) => {
                    return Ok(self.var_rank(&x).cmp(&self.var_rank(&y)));
                }
                (View::Int(_) | View::Float(_), View::Int(_) | View::Float(_)) => {
                    return Ok(x.as_number()?.compare(&y.as_number()?));
                }
                (View::Atom(p), View::Atom(q)) => return Ok(p.as_str().cmp(q.as_str())),
                (View::Opaque(p), View::Opaque(q)) => return Ok(p.addr().cmp(&q.addr())),
                (View::Func(fx, ax), View::Func(fy, ay)) => {
                    let ord = fx.as_str().cmp(fy.as_str());
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                    let Some(last) = ax.len().checked_sub(1) else {
                        return Ok(Ordering::Equal);
                    };
                    for i in 0..last {
                        if let (Some(p), Some(q)) = (ax.get(i), ay.get(i)) {
                            let ord = self.compare(&p, &q)?;
                            if ord != Ordering::Equal {
                                return Ok(ord);
                            }
                        }
                    }
                    match (ax.get(last), ay.get(last)) {
                        (Some(p), Some(q)) => {
                            a = p;
                            b = q;
                        }
                        _ => return Ok(Ordering::Equal),
                    }
                }
                _ => return Ok(Ordering::Equal),
            }
        }
    }

    /// Structural identity after dereferencing (`==/2`).
    #[inline]
    pub fn identical(&self, a: &Term, b: &Term) -> Result<bool, PrologError> {
        Ok(self.compare(a, b)? == Ordering::Equal)
    }
}

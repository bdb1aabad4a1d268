//! Defines [`Term`], the tagged value type manipulated by the engine.
//!
//! Terms come in two flavours. *Instance* terms do not depend on any call
//! frame and can be shared, compared and cached freely. *Template* terms
//! mention clause variables by slot index; they only make sense once paired
//! with a frame, which turns a template variable into a [`Term::Ref`] and a
//! template compound into a [`Term::CompoundRef`].

use crate::{FrameId, PrologError};
use smartstring::alias::String;
use std::any::Any;
use std::cell::OnceCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Functor name used for list cells.
pub const DOT: &str = ".";
/// The empty list atom.
pub const NIL: &str = "[]";
/// Placeholder emitted when copying a cyclic structure.
pub const CYCLE: &str = "**";

/// An atom name. Short names are stored inline.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Atom(String);

impl Atom {
    #[inline]
    pub fn new(name: impl AsRef<str>) -> Self {
        Atom(String::from(name.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Atom {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Atom {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl From<&str> for Atom {
    #[inline]
    fn from(name: &str) -> Self {
        Atom::new(name)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric value.
///
/// Equality is structural: `Int(1)` and `Float(1.0)` are different terms,
/// and floats compare by bit pattern so that every number equals itself.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Compares by numeric value, then orders a float before an integer
    /// of the same value (standard order of terms).
    pub fn compare(&self, other: &Number) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(b),
            (Number::Float(a), Number::Float(b)) => a.total_cmp(b),
            (Number::Int(a), Number::Float(b)) => match (*a as f64).total_cmp(b) {
                Ordering::Equal => Ordering::Greater,
                ord => ord,
            },
            (Number::Float(a), Number::Int(b)) => match a.total_cmp(&(*b as f64)) {
                Ordering::Equal => Ordering::Less,
                ord => ord,
            },
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Number::Int(i) => (0u8, *i).hash(state),
            Number::Float(f) => (1u8, f.to_bits()).hash(state),
        }
    }
}

/// An opaque host value. Two opaque terms are equal only if they share
/// the same allocation.
#[derive(Clone)]
pub struct Opaque(Rc<dyn Any>);

impl Opaque {
    pub fn new<T: Any>(value: T) -> Self {
        Opaque(Rc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    #[inline]
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({:#x})", self.addr())
    }
}

/// A deferred term. Forcing runs the producer once and caches its value.
#[derive(Clone)]
pub struct Thunk(Rc<ThunkCell>);

struct ThunkCell {
    value: OnceCell<Term>,
    producer: Box<dyn Fn() -> Result<Term, PrologError>>,
}

impl Thunk {
    pub fn new(producer: impl Fn() -> Result<Term, PrologError> + 'static) -> Self {
        Thunk(Rc::new(ThunkCell {
            value: OnceCell::new(),
            producer: Box::new(producer),
        }))
    }

    /// Returns the value of this thunk, computing it on first use.
    pub fn force(&self) -> Result<Term, PrologError> {
        if let Some(value) = self.0.value.get() {
            return Ok(value.clone());
        }
        let value = (self.0.producer)()?;
        Ok(self.0.value.get_or_init(|| value).clone())
    }

    #[inline]
    pub fn is_forced(&self) -> bool {
        self.0.value.get().is_some()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Thunk) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.value.get() {
            Some(value) => f.debug_tuple("Thunk").field(value).finish(),
            None => f.write_str("Thunk(<pending>)"),
        }
    }
}

/// A clause variable: a slot index plus a display name.
///
/// Variables fresh from the term-construction interface are *unindexed*;
/// the clause compiler assigns slot indices by first appearance. The name
/// `_` denotes the wildcard, which unifies with anything and never binds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    id: u32,
    name: Atom,
}

impl Var {
    pub const WILDCARD: u32 = u32::MAX;
    pub const UNINDEXED: u32 = u32::MAX - 1;

    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let id = if name == "_" {
            Var::WILDCARD
        } else {
            Var::UNINDEXED
        };
        Var {
            id,
            name: Atom::new(name),
        }
    }

    #[inline]
    pub(crate) fn indexed(id: u32, name: Atom) -> Self {
        Var { id, name }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &Atom {
        &self.name
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.id == Var::WILDCARD
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.id < Var::UNINDEXED
    }

    #[inline]
    pub(crate) fn slot(&self) -> usize {
        self.id as usize
    }
}

/// A template variable paired with the frame that owns its slot.
///
/// Identity is the slot cell: (slot index, owning frame).
#[derive(Debug, Clone)]
pub struct VarRef {
    var: Var,
    frame: FrameId,
}

impl VarRef {
    #[inline]
    pub(crate) fn new(var: Var, frame: FrameId) -> Self {
        VarRef { var, frame }
    }

    #[inline]
    pub fn var(&self) -> &Var {
        &self.var
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.var.id
    }

    #[inline]
    pub fn frame(&self) -> FrameId {
        self.frame
    }
}

impl PartialEq for VarRef {
    fn eq(&self, other: &Self) -> bool {
        self.var.id == other.var.id && self.frame == other.frame
    }
}

impl Eq for VarRef {}

impl Hash for VarRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.var.id.hash(state);
        self.frame.hash(state);
    }
}

/// A compound term `name(args...)`.
#[derive(Debug)]
pub struct Compound {
    name: Atom,
    args: Box<[Term]>,
    instance: bool,
}

impl Compound {
    pub fn new(name: impl Into<Atom>, args: Vec<Term>) -> Self {
        let instance = args.iter().all(Term::is_instance);
        Compound {
            name: name.into(),
            args: args.into_boxed_slice(),
            instance,
        }
    }

    #[inline]
    pub fn name(&self) -> &Atom {
        &self.name
    }

    #[inline]
    pub fn args(&self) -> &[Term] {
        &self.args
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// True if no argument depends on a frame.
    #[inline]
    pub fn is_instance(&self) -> bool {
        self.instance
    }

    #[inline]
    fn addr(self: &Rc<Self>) -> usize {
        Rc::as_ptr(self) as usize
    }
}

/// Unlinks the right spine of nested compounds (typically long lists)
/// iteratively, so that dropping them does not recurse once per cell.
impl Drop for Compound {
    fn drop(&mut self) {
        let mut spine = Vec::new();
        take_tail(&mut self.args, &mut spine);
        while let Some(c) = spine.pop() {
            if let Ok(mut c) = Rc::try_unwrap(c) {
                take_tail(&mut c.args, &mut spine);
            }
        }
    }
}

fn take_tail(args: &mut [Term], spine: &mut Vec<Rc<Compound>>) {
    if let Some(last) = args.last_mut() {
        if matches!(last, Term::Compound(_)) {
            if let Term::Compound(c) = std::mem::replace(last, Term::Number(Number::Int(0))) {
                spine.push(c);
            }
        }
    }
}

impl From<String> for Atom {
    fn from(name: String) -> Self {
        Atom(name)
    }
}

/// A template compound paired with the frame its variables live in.
#[derive(Debug, Clone)]
pub struct CompoundRef {
    template: Rc<Compound>,
    frame: FrameId,
}

impl CompoundRef {
    #[inline]
    pub fn template(&self) -> &Rc<Compound> {
        &self.template
    }

    #[inline]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Returns argument `i` bound to this reference's frame.
    #[inline]
    pub fn arg(&self, i: usize) -> Option<Term> {
        self.template.args.get(i).map(|t| t.bind_to(self.frame))
    }
}

/// A term.
#[derive(Clone)]
pub enum Term {
    Atom(Atom),
    Number(Number),
    Opaque(Opaque),
    Compound(Rc<Compound>),
    CompoundRef(CompoundRef),
    Var(Var),
    Ref(VarRef),
    Thunk(Thunk),
}

/// Conversion into a [`Term`], used by the construction macros.
pub trait IntoTerm {
    fn into_term(self) -> Term;
}

macro_rules! impl_intoterm_for_integers {
    ($($t:ty),* $(,)?) => { $(
        impl IntoTerm for $t {
            #[inline]
            fn into_term(self) -> Term { Term::int(self as i64) }
        }
    )* };
}
impl_intoterm_for_integers!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_intoterm_for_floats {
    ($($t:ty),* $(,)?) => { $(
        impl IntoTerm for $t {
            #[inline]
            fn into_term(self) -> Term { Term::float(self as f64) }
        }
    )* };
}
impl_intoterm_for_floats!(f32, f64);

impl IntoTerm for &str {
    #[inline]
    fn into_term(self) -> Term {
        Term::atom(self)
    }
}

impl IntoTerm for Atom {
    #[inline]
    fn into_term(self) -> Term {
        Term::Atom(self)
    }
}

impl IntoTerm for Term {
    #[inline]
    fn into_term(self) -> Term {
        self
    }
}

impl IntoTerm for &Term {
    #[inline]
    fn into_term(self) -> Term {
        self.clone()
    }
}

impl Term {
    #[inline]
    pub fn atom(name: impl AsRef<str>) -> Self {
        Term::Atom(Atom::new(name))
    }

    #[inline]
    pub fn int(i: impl Into<i64>) -> Self {
        Term::Number(Number::Int(i.into()))
    }

    #[inline]
    pub fn float(f: impl Into<f64>) -> Self {
        Term::Number(Number::Float(f.into()))
    }

    #[inline]
    pub fn number(n: Number) -> Self {
        Term::Number(n)
    }

    /// Creates a variable. The name `_` yields the wildcard.
    #[inline]
    pub fn var(name: impl AsRef<str>) -> Self {
        Term::Var(Var::new(name))
    }

    #[inline]
    pub fn opaque<T: Any>(value: T) -> Self {
        Term::Opaque(Opaque::new(value))
    }

    #[inline]
    pub fn thunk(producer: impl Fn() -> Result<Term, PrologError> + 'static) -> Self {
        Term::Thunk(Thunk::new(producer))
    }

    /// Creates `name(args...)`, or the atom `name` when `args` is empty.
    pub fn compound(name: impl AsRef<str>, args: Vec<Term>) -> Self {
        if args.is_empty() {
            Term::atom(name)
        } else {
            Term::Compound(Rc::new(Compound::new(Atom::new(name), args)))
        }
    }

    #[inline]
    pub fn nil() -> Self {
        Term::atom(NIL)
    }

    /// Builds a proper list.
    #[inline]
    pub fn list(items: impl IntoIterator<Item = Term>) -> Self {
        Term::list_with_tail(items, Term::nil())
    }

    /// Builds a list of `items` ending in `tail`.
    pub fn list_with_tail(items: impl IntoIterator<Item = Term>, tail: Term) -> Self {
        let items: Vec<Term> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(tail, |tail, head| Term::compound(DOT, vec![head, tail]))
    }

    /// True if the term does not depend on any frame.
    pub fn is_instance(&self) -> bool {
        match self {
            Term::Atom(_) | Term::Number(_) | Term::Opaque(_) | Term::Thunk(_) => true,
            Term::Var(v) => v.is_wildcard(),
            Term::Ref(_) | Term::CompoundRef(_) => false,
            Term::Compound(c) => c.is_instance(),
        }
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Term::Var(v) if v.is_wildcard())
    }

    /// True for unbound template variables and references. Callers must
    /// dereference first.
    #[inline]
    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_) | Term::Ref(_))
    }

    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self, Term::Atom(_))
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Term::Number(_))
    }

    #[inline]
    pub fn is_compound(&self) -> bool {
        matches!(self, Term::Compound(_) | Term::CompoundRef(_))
    }

    #[inline]
    pub fn is_atomic(&self) -> bool {
        matches!(self, Term::Atom(_) | Term::Number(_) | Term::Opaque(_))
    }

    #[inline]
    pub fn is_callable(&self) -> bool {
        self.is_atom() || self.is_compound()
    }

    /// Returns the name and arity of an atom or compound.
    pub fn functor(&self) -> Option<(&Atom, usize)> {
        match self {
            Term::Atom(a) => Some((a, 0)),
            Term::Compound(c) => Some((&c.name, c.arity())),
            Term::CompoundRef(r) => Some((&r.template.name, r.template.arity())),
            _ => None,
        }
    }

    /// True if the term is an atom or compound with this name and arity.
    #[inline]
    pub fn has_functor(&self, name: &str, arity: usize) -> bool {
        matches!(self.functor(), Some((n, a)) if n == name && a == arity)
    }

    /// Returns argument `i`, bound to its frame when the term is a
    /// compound reference.
    pub fn arg(&self, i: usize) -> Option<Term> {
        match self {
            Term::Compound(c) => c.args.get(i).cloned(),
            Term::CompoundRef(r) => r.arg(i),
            _ => None,
        }
    }

    /// Returns all arguments, bound to their frame.
    pub fn args(&self) -> Vec<Term> {
        match self {
            Term::Compound(c) => c.args.to_vec(),
            Term::CompoundRef(r) => r.template.args.iter().map(|a| a.bind_to(r.frame)).collect(),
            _ => Vec::new(),
        }
    }

    /// Splits `name(left, right)` into its two arguments.
    pub fn split(&self, name: &str) -> Option<(Term, Term)> {
        if self.has_functor(name, 2) {
            Some((self.arg(0)?, self.arg(1)?))
        } else {
            None
        }
    }

    /// Returns the compound part and the frame its arguments must be read in.
    #[inline]
    pub(crate) fn compound_in(&self, frame: Option<FrameId>) -> Option<(&Rc<Compound>, Option<FrameId>)> {
        match self {
            Term::Compound(c) => Some((c, frame)),
            Term::CompoundRef(r) => Some((&r.template, Some(r.frame))),
            _ => None,
        }
    }

    /// Pairs a template with the frame owning its slots. Instance terms and
    /// references are returned unchanged.
    pub(crate) fn bind_to(&self, owner: FrameId) -> Term {
        match self {
            Term::Var(v) if !v.is_wildcard() => Term::Ref(VarRef::new(v.clone(), owner)),
            Term::Compound(c) if !c.is_instance() => Term::CompoundRef(CompoundRef {
                template: c.clone(),
                frame: owner,
            }),
            _ => self.clone(),
        }
    }

    /// Shallow identity used by the unifier: values for atomic terms,
    /// allocation (and frame) for compounds, cell for references.
    pub(crate) fn same(&self, other: &Term) -> bool {
        match (self, other) {
            (Term::Atom(a), Term::Atom(b)) => a == b,
            (Term::Number(a), Term::Number(b)) => a == b,
            (Term::Opaque(a), Term::Opaque(b)) => a.ptr_eq(b),
            (Term::Thunk(a), Term::Thunk(b)) => a.ptr_eq(b),
            (Term::Ref(a), Term::Ref(b)) => a == b,
            (Term::Compound(a), Term::Compound(b)) => a.is_instance() && Rc::ptr_eq(a, b),
            (Term::CompoundRef(a), Term::CompoundRef(b)) => {
                a.frame == b.frame && Rc::ptr_eq(&a.template, &b.template)
            }
            _ => false,
        }
    }

    /// Replaces every template variable with the wildcard.
    pub fn anonymize(&self) -> Term {
        match self {
            Term::Var(v) if !v.is_wildcard() => Term::var("_"),
            Term::Compound(c) if !c.is_instance() => Term::Compound(Rc::new(Compound::new(
                c.name.clone(),
                c.args.iter().map(Term::anonymize).collect(),
            ))),
            _ => self.clone(),
        }
    }

    /// A short name for the kind of term, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Term::Atom(_) => "atom",
            Term::Number(Number::Int(_)) => "integer",
            Term::Number(Number::Float(_)) => "float",
            Term::Opaque(_) => "opaque",
            Term::Compound(_) | Term::CompoundRef(_) => "compound",
            Term::Var(_) | Term::Ref(_) => "variable",
            Term::Thunk(_) => "thunk",
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(a) => f.debug_tuple("Atom").field(a).finish(),
            Term::Number(Number::Int(i)) => f.debug_tuple("Int").field(i).finish(),
            Term::Number(Number::Float(x)) => f.debug_tuple("Float").field(x).finish(),
            Term::Opaque(o) => o.fmt(f),
            Term::Compound(c) => f
                .debug_tuple("Compound")
                .field(&c.name)
                .field(&c.args)
                .finish(),
            Term::CompoundRef(r) => f
                .debug_tuple("CompoundRef")
                .field(&r.template.name)
                .field(&r.template.args)
                .field(&r.frame)
                .finish(),
            Term::Var(v) => f.debug_tuple("Var").field(&v.name).field(&v.id).finish(),
            Term::Ref(r) => f
                .debug_tuple("Ref")
                .field(&r.var.name)
                .field(&r.var.id)
                .field(&r.frame)
                .finish(),
            Term::Thunk(t) => t.fmt(f),
        }
    }
}

/// Syntactic equality: no dereferencing happens. Compounds are equal when
/// they share an allocation or have equal names and arguments.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::Atom(a), Term::Atom(b)) => a == b,
            (Term::Number(a), Term::Number(b)) => a == b,
            (Term::Opaque(a), Term::Opaque(b)) => a.ptr_eq(b),
            (Term::Thunk(a), Term::Thunk(b)) => a.ptr_eq(b),
            (Term::Var(a), Term::Var(b)) => a == b,
            (Term::Ref(a), Term::Ref(b)) => a == b,
            (Term::Compound(a), Term::Compound(b)) => {
                Rc::ptr_eq(a, b) || (a.name == b.name && a.args == b.args)
            }
            (Term::CompoundRef(a), Term::CompoundRef(b)) => {
                a.frame == b.frame
                    && (Rc::ptr_eq(&a.template, &b.template)
                        || (a.template.name == b.template.name
                            && a.template.args == b.template.args))
            }
            _ => false,
        }
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Term::Atom(a) => a.hash(state),
            Term::Number(n) => n.hash(state),
            Term::Opaque(o) => o.addr().hash(state),
            Term::Thunk(t) => (Rc::as_ptr(&t.0) as usize).hash(state),
            Term::Var(v) => v.hash(state),
            Term::Ref(r) => r.hash(state),
            Term::Compound(c) => {
                c.name.hash(state);
                c.args.hash(state);
            }
            Term::CompoundRef(r) => {
                r.frame.hash(state);
                r.template.name.hash(state);
                r.template.args.hash(state);
            }
        }
    }
}

impl From<Number> for Term {
    fn from(n: Number) -> Self {
        Term::Number(n)
    }
}

/// Address of a compound allocation, for cycle detection.
#[inline]
pub(crate) fn compound_addr(c: &Rc<Compound>) -> usize {
    c.addr()
}

/// Convenience macros to construct atoms, variables, compounds and lists.
#[macro_export]
macro_rules! atom {
    ($name:expr) => {
        $crate::Term::atom($name)
    };
}

#[macro_export]
macro_rules! var {
    ($name:expr) => {
        $crate::Term::var($name)
    };
}

#[macro_export]
macro_rules! func {
    ($functor:expr; $($arg:expr),+ $(,)?) => {
        $crate::Term::compound($functor, vec![$($crate::IntoTerm::into_term($arg)),+])
    };
}

#[macro_export]
macro_rules! list {
    // with tail
    ($($arg:expr),* $(,)?; $tail:expr) => {
        $crate::Term::list_with_tail(
            vec![$($crate::IntoTerm::into_term($arg)),*],
            $crate::IntoTerm::into_term($tail),
        )
    };
    // proper list
    ($($arg:expr),* $(,)?) => {
        $crate::Term::list(vec![$($crate::IntoTerm::into_term($arg)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_is_instance() {
        assert!(Term::var("_").is_instance());
        assert!(Term::var("_").is_wildcard());
        assert!(!Term::var("X").is_instance());
    }

    #[test]
    fn compound_instance_flag() {
        let ground = func!("f"; 1, "a", list![2, 3]);
        assert!(ground.is_instance());
        let open = func!("f"; 1, var!("X"));
        assert!(!open.is_instance());
        let nested = func!("g"; open.clone());
        assert!(!nested.is_instance());
        let with_wildcard = func!("h"; var!("_"));
        assert!(with_wildcard.is_instance());
    }

    #[test]
    fn empty_compound_is_atom() {
        assert_eq!(Term::compound("foo", vec![]), atom!("foo"));
    }

    #[test]
    fn list_construction() {
        let l = list![1, 2; var!("T")];
        assert!(l.has_functor(DOT, 2));
        assert_eq!(l.arg(0), Some(Term::int(1)));
        let tail = l.arg(1).unwrap();
        assert_eq!(tail.arg(0), Some(Term::int(2)));
        assert_eq!(tail.arg(1), Some(var!("T")));
        assert_eq!(list![], Term::nil());
    }

    #[test]
    fn number_equality_is_structural() {
        assert_eq!(Term::int(1), Term::int(1));
        assert_ne!(Term::int(1), Term::float(1.0));
        assert_eq!(Term::float(f64::NAN), Term::float(f64::NAN));
    }

    #[test]
    fn number_standard_order() {
        use std::cmp::Ordering::*;
        assert_eq!(Number::Int(1).compare(&Number::Int(2)), Less);
        assert_eq!(Number::Float(1.0).compare(&Number::Int(1)), Less);
        assert_eq!(Number::Int(1).compare(&Number::Float(1.0)), Greater);
        assert_eq!(Number::Float(2.5).compare(&Number::Int(2)), Greater);
    }

    #[test]
    fn bind_to_frame() {
        let frame = FrameId::new(3);
        let x = var!("X");
        assert!(matches!(x.bind_to(frame), Term::Ref(r) if r.frame() == frame));
        assert!(matches!(var!("_").bind_to(frame), Term::Var(_)));
        let t = func!("f"; var!("X"));
        assert!(matches!(t.bind_to(frame), Term::CompoundRef(_)));
        let g = func!("f"; 1);
        assert!(matches!(g.bind_to(frame), Term::Compound(_)));
    }

    #[test]
    fn thunk_is_forced_once() {
        use std::cell::Cell;
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let t = Thunk::new(move || {
            counter.set(counter.get() + 1);
            Ok(Term::int(42))
        });
        assert!(!t.is_forced());
        assert_eq!(t.force().unwrap(), Term::int(42));
        assert_eq!(t.force().unwrap(), Term::int(42));
        assert_eq!(calls.get(), 1);
        assert!(t.is_forced());
    }

    #[test]
    fn opaque_identity() {
        let a = Opaque::new(5u32);
        let b = a.clone();
        let c = Opaque::new(5u32);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
        assert_eq!(a.downcast_ref::<i64>(), None);
    }

    #[test]
    fn anonymize_replaces_variables() {
        let t = func!("f"; var!("X"), 1, func!("g"; var!("Y")));
        let a = t.anonymize();
        assert!(a.is_instance());
    }

    #[test]
    fn split_binary() {
        let t = func!(","; "a", "b");
        let (l, r) = t.split(",").unwrap();
        assert_eq!(l, atom!("a"));
        assert_eq!(r, atom!("b"));
        assert!(t.split(";").is_none());
    }
}

//! # Hornet
//!
//! The execution core of a Prolog-style logic programming runtime.
//!
//! Programs are built from [`Term`] values and stored in a [`Database`] as
//! compiled [`Clause`]s and foreign [`Procedure`]s. A [`Query`] evaluates a
//! goal against the database with depth-first search: unification binds
//! variables held in activation [`Frames`], every binding that must be
//! undone on backtracking is recorded on the trail of the innermost
//! [`ChoicePoint`], and cut, tail calls and `catch/3` are resolved on the
//! frame chain. Solutions are returned as detached terms that outlive the
//! query.
//!
//! Clause bodies are compiled into continuation trees ([`Code`]):
//! conjunction threads continuations, disjunction becomes a choice, and
//! if-then-else commits through a cut scoped to its own choice.
//!
//! ## Example
//! ```rust
//! # use hornet::{func, list, var, Database, Term};
//! let db = Database::new().unwrap();
//! db.consult([
//!     func!("member"; var!("X"), list![var!("X"); var!("_")]),
//!     func!(":-";
//!         func!("member"; var!("X"), list![var!("_"); var!("T")]),
//!         func!("member"; var!("X"), var!("T"))),
//! ])
//! .unwrap();
//!
//! let query = db.query(&func!("member"; var!("X"), list![1, 2, 3])).unwrap();
//! let xs: Vec<Term> = query
//!     .map(|solution| solution.unwrap().get("X").cloned().unwrap())
//!     .collect();
//! assert_eq!(xs, vec![Term::int(1), Term::int(2), Term::int(3)]);
//! ```
//!
//! ## License
//!
//! Copyright (c) 2005–2025 IKH Software, Inc.
//!
//! Released under the terms of the GNU Lesser General Public License, version 3.0 or
//! (at your option) any later version (LGPL-3.0-or-later).

mod builtins;
mod choice;
mod code;
mod compile;
mod database;
mod display;
mod error;
mod frame;
mod ops;
mod procedure;
mod query;
mod term;
mod unify;
mod view;

pub use builtins::{Det, DetFn, Foreign, ForeignFn};
pub use choice::{Alternatives, Barrier, ChoicePoint, ChoiceStack, Once};
pub use code::{Choice, Code, Cut, Goal, Target};
pub use compile::Clause;
pub use database::{
    Config, Database, DatabaseListener, Position, Predicate, SharedBuffer, Table,
};
pub use display::TermDisplay;
pub use error::PrologError;
pub use frame::{Frame, FrameId, Frames};
pub use ops::{Fixity, OpDef, OpType, Operators};
pub use procedure::{CallSite, Procedure};
pub use query::{Query, Solution};
pub use term::{Atom, Compound, CompoundRef, IntoTerm, Number, Opaque, Term, Thunk, Var, VarRef};
pub use unify::Unifier;
pub use view::{Args, View};

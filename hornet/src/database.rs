//! The procedure database: predicate tables, the compiled-goal cache, change
//! listeners, Prolog flags, the operator table and the output sink used by
//! the output built-ins.

use crate::ops::{OpDef, OpType, Operators};
use crate::procedure::same_procedure;
use crate::{builtins, Atom, Clause, Procedure, PrologError, Query, Term};
use indexmap::IndexMap;
use log::{debug, error, warn};
use lru::LruCache;
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::str::FromStr;

/// A predicate key: name and arity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Predicate {
    pub name: Atom,
    pub arity: usize,
}

impl Predicate {
    pub fn new(name: impl AsRef<str>, arity: usize) -> Self {
        Predicate {
            name: Atom::new(name),
            arity,
        }
    }

    /// The predicate a callable term would call.
    pub fn of(term: &Term) -> Result<Self, PrologError> {
        let (name, arity) = term.as_callable()?;
        Ok(Predicate {
            name: name.clone(),
            arity,
        })
    }

    /// Reads a `Name/Arity` predicate indicator.
    pub fn from_indicator(term: &Term) -> Result<Self, PrologError> {
        let (name, arity) = term
            .split("/")
            .ok_or_else(|| PrologError::type_error("predicate_indicator", term.clone()))?;
        let name = name.as_atom()?.clone();
        let arity = arity.as_int()?;
        let arity = usize::try_from(arity)
            .map_err(|_| PrologError::domain_error("not_less_than_zero", Term::int(arity)))?;
        Ok(Predicate { name, arity })
    }

    /// The `Name/Arity` term.
    pub fn to_term(&self) -> Term {
        crate::func!("/"; self.name.clone(), Term::int(self.arity as i64))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Predicate {
    type Err = PrologError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PrologError::domain_error("predicate_indicator", Term::atom(s));
        let (name, arity) = s.rsplit_once('/').ok_or_else(invalid)?;
        let arity = arity.parse::<usize>().map_err(|_| invalid())?;
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(Predicate::new(name, arity))
    }
}

/// Where to insert a new row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Front,
    Back,
}

/// The ordered procedures of one predicate.
///
/// Readers take a snapshot with [`Table::rows`]; mutation copies the row
/// vector if a snapshot is still alive, so a running query keeps seeing
/// the rows as they were when its call started.
pub struct Table {
    predicate: Predicate,
    rows: RefCell<Rc<Vec<Rc<dyn Procedure>>>>,
}

impl Table {
    pub fn new(predicate: Predicate) -> Self {
        Table {
            predicate,
            rows: RefCell::new(Rc::new(Vec::new())),
        }
    }

    #[inline]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// An immutable snapshot of the rows.
    #[inline]
    pub fn rows(&self) -> Rc<Vec<Rc<dyn Procedure>>> {
        self.rows.borrow().clone()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    pub(crate) fn insert(&self, position: Position, procedure: Rc<dyn Procedure>) {
        let mut rows = self.rows.borrow_mut();
        let rows = Rc::make_mut(&mut rows);
        match position {
            Position::Front => rows.insert(0, procedure),
            Position::Back => rows.push(procedure),
        }
    }

    /// Removes `procedure` by identity.
    pub(crate) fn remove(&self, procedure: &Rc<dyn Procedure>) -> bool {
        let mut rows = self.rows.borrow_mut();
        match rows.iter().position(|row| same_procedure(row, procedure)) {
            Some(i) => {
                Rc::make_mut(&mut rows).remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&self) -> usize {
        let mut rows = self.rows.borrow_mut();
        let count = rows.len();
        *rows = Rc::new(Vec::new());
        count
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("predicate", &self.predicate)
            .field("rows", &self.len())
            .finish()
    }
}

/// Notified after each database mutation.
pub trait DatabaseListener {
    fn table_created(&self, _predicate: &Predicate) {}
    fn clause_added(&self, _predicate: &Predicate, _position: Position) {}
    fn clause_removed(&self, _predicate: &Predicate) {}
    fn table_cleared(&self, _predicate: &Predicate) {}
}

/// Database settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of compiled goals kept for `call/1`.
    pub code_cache_capacity: NonZeroUsize,
    /// Load the built-in predicates.
    pub builtins: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            code_cache_capacity: NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN),
            builtins: true,
        }
    }
}

/// A cloneable in-memory sink for captured output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Predicate tables plus the state shared by every query run against them.
///
/// The database is single-threaded and shared through `Rc`; queries keep
/// it alive while they run.
pub struct Database {
    config: Config,
    tables: RefCell<IndexMap<Predicate, Rc<Table>>>,
    listeners: RefCell<Vec<Rc<dyn DatabaseListener>>>,
    cache: RefCell<LruCache<Term, Rc<Clause>>>,
    flags: RefCell<IndexMap<Atom, Term>>,
    ops: RefCell<Operators>,
    output: RefCell<Box<dyn Write>>,
}

/// Flags that `set_prolog_flag/2` may not change.
const READ_ONLY_FLAGS: &[&str] = &["bounded", "max_integer", "min_integer"];

fn default_flags() -> IndexMap<Atom, Term> {
    IndexMap::from([
        (Atom::new("bounded"), Term::atom("true")),
        (Atom::new("max_integer"), Term::int(i64::MAX)),
        (Atom::new("min_integer"), Term::int(i64::MIN)),
        (Atom::new("unknown"), Term::atom("error")),
    ])
}

impl Database {
    /// A database with the built-in predicates and default settings.
    pub fn new() -> Result<Rc<Self>, PrologError> {
        Self::with_config(Config::default())
    }

    /// A database without any predicates.
    pub fn empty() -> Rc<Self> {
        Self::bare(Config {
            builtins: false,
            ..Config::default()
        })
    }

    /// Fails if the built-in library cannot be loaded.
    pub fn with_config(config: Config) -> Result<Rc<Self>, PrologError> {
        let db = Self::bare(config);
        if db.config.builtins {
            builtins::install(&db).inspect_err(|e| {
                error!(target: "hornet::database", "failed to load the built-in library: {}", e);
            })?;
        }
        Ok(db)
    }

    fn bare(config: Config) -> Rc<Self> {
        Rc::new(Database {
            cache: RefCell::new(LruCache::new(config.code_cache_capacity)),
            config,
            tables: RefCell::new(IndexMap::new()),
            listeners: RefCell::new(Vec::new()),
            flags: RefCell::new(default_flags()),
            ops: RefCell::new(Operators::standard()),
            output: RefCell::new(Box::new(io::stdout())),
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn table(&self, predicate: &Predicate) -> Option<Rc<Table>> {
        self.tables.borrow().get(predicate).cloned()
    }

    /// Returns the table of `predicate`, creating an empty one if needed.
    pub fn table_or_insert(&self, predicate: Predicate) -> Rc<Table> {
        if let Some(table) = self.table(&predicate) {
            return table;
        }
        let table = Rc::new(Table::new(predicate.clone()));
        self.tables
            .borrow_mut()
            .insert(predicate.clone(), table.clone());
        self.notify(|l| l.table_created(&predicate));
        table
    }

    /// Every known predicate, in creation order.
    pub fn predicates(&self) -> Vec<Predicate> {
        self.tables.borrow().keys().cloned().collect()
    }

    pub fn add_listener(&self, listener: Rc<dyn DatabaseListener>) {
        self.listeners.borrow_mut().push(listener);
    }

    fn notify(&self, f: impl Fn(&dyn DatabaseListener)) {
        let listeners = self.listeners.borrow().clone();
        for listener in &listeners {
            f(listener.as_ref());
        }
    }

    /// Adds a procedure under its own predicate, after existing rows.
    pub fn register(&self, procedure: Rc<dyn Procedure>) -> Result<(), PrologError> {
        self.insert(procedure, Position::Back)
    }

    pub fn insert(&self, procedure: Rc<dyn Procedure>, position: Position) -> Result<(), PrologError> {
        let Some(predicate) = procedure.predicate() else {
            crate::bail!("cannot insert a procedure without a predicate");
        };
        self.table_or_insert(predicate.clone())
            .insert(position, procedure);
        debug!(target: "hornet::database", "added {} ({:?})", predicate, position);
        self.notify(|l| l.clause_added(&predicate, position));
        Ok(())
    }

    /// Compiles `term` as a clause and inserts it.
    pub fn add_clause(&self, term: &Term, position: Position) -> Result<Rc<Clause>, PrologError> {
        let clause = Rc::new(Clause::compile(self, term)?);
        if clause.predicate().is_none() {
            return Err(PrologError::type_error("callable", term.clone()));
        }
        self.insert(clause.clone(), position)?;
        Ok(clause)
    }

    #[inline]
    pub fn assertz(&self, term: &Term) -> Result<Rc<Clause>, PrologError> {
        self.add_clause(term, Position::Back)
    }

    #[inline]
    pub fn asserta(&self, term: &Term) -> Result<Rc<Clause>, PrologError> {
        self.add_clause(term, Position::Front)
    }

    /// Removes one row by identity.
    pub fn remove(&self, predicate: &Predicate, procedure: &Rc<dyn Procedure>) -> bool {
        let removed = self
            .table(predicate)
            .is_some_and(|table| table.remove(procedure));
        if removed {
            debug!(target: "hornet::database", "removed a row of {}", predicate);
            self.notify(|l| l.clause_removed(predicate));
        }
        removed
    }

    /// Drops every row of `predicate`. The table itself stays, so code
    /// compiled against it sees the predicate as undefined.
    pub fn abolish(&self, predicate: &Predicate) -> bool {
        let Some(table) = self.table(predicate) else {
            return false;
        };
        let count = table.clear();
        self.cache.borrow_mut().clear();
        debug!(target: "hornet::database", "abolished {} ({} rows)", predicate, count);
        self.notify(|l| l.table_cleared(predicate));
        true
    }

    /// Loads a program. Clauses are added in order; `:- Goal` directives
    /// run once when reached. A failing directive is logged and skipped.
    pub fn consult(self: &Rc<Self>, program: impl IntoIterator<Item = Term>) -> Result<(), PrologError> {
        for term in program {
            if term.has_functor(":-", 1) {
                let goal = term.arg(0).unwrap_or_else(|| Term::atom("true"));
                let mut query = self.query(&goal)?;
                if query.ask()?.is_none() {
                    warn!(target: "hornet::database", "directive failed: {}", goal);
                }
            } else {
                self.add_clause(&term, Position::Back)?;
            }
        }
        Ok(())
    }

    /// Starts a query for `goal`.
    pub fn query(self: &Rc<Self>, goal: &Term) -> Result<Query, PrologError> {
        let entry = Rc::new(Clause::goal(self, goal, false)?);
        Ok(Query::new(self.clone(), entry))
    }

    /// Compiled code for a goal run by `call/1`, from the cache when possible.
    /// Goals mentioning frame references cannot be shared and are compiled
    /// each time.
    pub fn compile_goal(&self, goal: &Term, indexed: bool) -> Result<Rc<Clause>, PrologError> {
        let cacheable = indexed || goal.is_instance();
        if cacheable {
            if let Some(clause) = self.cache.borrow_mut().get(goal) {
                return Ok(clause.clone());
            }
            debug!(target: "hornet::database", "code cache miss: {}", goal);
        }
        let clause = Rc::new(Clause::goal(self, goal, indexed)?);
        if cacheable {
            self.cache.borrow_mut().put(goal.clone(), clause.clone());
        }
        Ok(clause)
    }

    pub fn flag(&self, name: &str) -> Option<Term> {
        self.flags.borrow().get(&Atom::new(name)).cloned()
    }

    /// Sets a flag to a detached value.
    pub fn set_flag(&self, name: Atom, value: Term) -> Result<(), PrologError> {
        if READ_ONLY_FLAGS.contains(&name.as_str()) {
            return Err(PrologError::permission_error("modify", "flag", Term::Atom(name)));
        }
        debug!(target: "hornet::database", "flag {} = {}", name, value);
        self.flags.borrow_mut().insert(name, value);
        Ok(())
    }

    /// Every flag with its value, in definition order.
    pub fn flags(&self) -> Vec<(Atom, Term)> {
        self.flags
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn define_op(&self, priority: i64, kind: OpType, name: Atom) -> Result<(), PrologError> {
        self.ops.borrow_mut().define(priority, kind, name)
    }

    /// A snapshot of the operator table.
    pub fn ops(&self) -> Vec<OpDef> {
        self.ops.borrow().defs()
    }

    /// Replaces the output sink.
    pub fn set_output(&self, output: Box<dyn Write>) {
        *self.output.borrow_mut() = output;
    }

    pub fn write_str(&self, s: &str) -> io::Result<()> {
        let mut output = self.output.borrow_mut();
        output.write_all(s.as_bytes())?;
        output.flush()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Compiled clauses refer to tables, and tables hold clauses.
        for table in self.tables.get_mut().values() {
            table.clear();
        }
        self.cache.get_mut().clear();
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("tables", &self.tables.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{func, var};
    use std::cell::Cell;

    #[test]
    fn predicate_notation() {
        let p: Predicate = "append/3".parse().unwrap();
        assert_eq!(p, Predicate::new("append", 3));
        assert_eq!(p.to_string(), "append/3");
        assert_eq!(p.to_term(), func!("/"; "append", 3));
        assert_eq!(Predicate::from_indicator(&p.to_term()).unwrap(), p);
        assert!("append".parse::<Predicate>().is_err());
        assert!("/3".parse::<Predicate>().is_err());
        assert!("a/b".parse::<Predicate>().is_err());
    }

    #[test]
    fn snapshots_survive_mutation() {
        let db = Database::empty();
        db.assertz(&func!("p"; 1)).unwrap();
        db.assertz(&func!("p"; 2)).unwrap();
        let table = db.table(&Predicate::new("p", 1)).unwrap();
        let before = table.rows();
        db.asserta(&func!("p"; 0)).unwrap();
        assert_eq!(before.len(), 2);
        assert_eq!(table.len(), 3);
        let first = table.rows()[0].clone();
        assert_eq!(first.as_clause().map(Clause::to_term), Some(func!("p"; 0)));
        assert!(db.remove(&Predicate::new("p", 1), &first));
        assert!(!db.remove(&Predicate::new("p", 1), &first));
        assert_eq!(table.len(), 2);
    }

    #[derive(Default)]
    struct Counter {
        created: Cell<usize>,
        added: Cell<usize>,
        removed: Cell<usize>,
        cleared: Cell<usize>,
    }

    impl DatabaseListener for Counter {
        fn table_created(&self, _: &Predicate) {
            self.created.set(self.created.get() + 1);
        }
        fn clause_added(&self, _: &Predicate, _: Position) {
            self.added.set(self.added.get() + 1);
        }
        fn clause_removed(&self, _: &Predicate) {
            self.removed.set(self.removed.get() + 1);
        }
        fn table_cleared(&self, _: &Predicate) {
            self.cleared.set(self.cleared.get() + 1);
        }
    }

    #[test]
    fn listeners_are_notified() {
        let db = Database::empty();
        let counter = Rc::new(Counter::default());
        db.add_listener(counter.clone());
        let clause = db
            .assertz(&func!(":-"; func!("q"; var!("X")), func!("r"; var!("X"))))
            .unwrap();
        let row: Rc<dyn Procedure> = clause;
        assert_eq!(counter.created.get(), 2);
        assert_eq!(counter.added.get(), 1);
        assert!(db.remove(&Predicate::new("q", 1), &row));
        assert_eq!(counter.removed.get(), 1);
        assert!(db.abolish(&Predicate::new("r", 1)));
        assert_eq!(counter.cleared.get(), 1);
        // The body is compiled before the head's table is looked up.
        assert_eq!(db.predicates(), vec![Predicate::new("r", 1), Predicate::new("q", 1)]);
    }

    #[test]
    fn goal_cache_reuses_code() {
        let db = Database::empty();
        let goal = func!("p"; 1);
        let a = db.compile_goal(&goal, false).unwrap();
        let b = db.compile_goal(&goal, false).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        let open = func!("p"; var!("X"));
        let c = db.compile_goal(&open, false).unwrap();
        let d = db.compile_goal(&open, false).unwrap();
        assert!(!Rc::ptr_eq(&c, &d));
    }

    #[test]
    fn constructors_install_the_library_on_request() {
        let db = Database::with_config(Config::default()).unwrap();
        assert!(db.table(&Predicate::new("atom_length", 2)).is_some_and(|t| !t.is_empty()));
        let bare = Database::with_config(Config {
            builtins: false,
            ..Config::default()
        })
        .unwrap();
        assert!(bare.predicates().is_empty());
        assert!(Database::empty().predicates().is_empty());
    }

    #[test]
    fn flags_have_defaults_and_guard_read_only_ones() {
        let db = Database::empty();
        assert_eq!(db.flag("bounded"), Some(Term::atom("true")));
        db.set_flag(Atom::new("unknown"), Term::atom("fail")).unwrap();
        assert_eq!(db.flag("unknown"), Some(Term::atom("fail")));
        let err = db.set_flag(Atom::new("max_integer"), Term::int(1)).unwrap_err();
        assert_eq!(
            err.ball(),
            Some(&func!("permission_error"; "modify", "flag", "max_integer"))
        );
        assert_eq!(db.flags().len(), 4);
    }

    #[test]
    fn shared_buffer_captures_output() {
        let db = Database::empty();
        let buffer = SharedBuffer::new();
        db.set_output(Box::new(buffer.clone()));
        db.write_str("hello").unwrap();
        assert_eq!(buffer.contents(), "hello");
    }
}

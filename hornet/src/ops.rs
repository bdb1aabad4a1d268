//! Operator definitions maintained by `op/3` and read by `current_op/3`.
//!
//! An atom may be defined as an operator once per [`Fixity`]. A prefix
//! and an infix definition can coexist; an infix and a postfix one
//! cannot.

use crate::{Atom, PrologError, Term};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Lowest and highest operator priority.
pub const MIN_PRIORITY: i64 = 0;
pub const MAX_PRIORITY: i64 = 1200;

/// Syntactic position of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Fixity {
    Prefix = 0,
    Infix = 1,
    Postfix = 2,
}

impl Fixity {
    pub const COUNT: usize = 3;
}

/// Operator type specifier: fixity plus associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    Xfx,
    Xfy,
    Yfx,
    Fy,
    Fx,
    Xf,
    Yf,
}

impl OpType {
    pub const STRS: &[&str] = &["xfx", "xfy", "yfx", "fy", "fx", "xf", "yf"];

    pub fn fixity(self) -> Fixity {
        match self {
            OpType::Xfx | OpType::Xfy | OpType::Yfx => Fixity::Infix,
            OpType::Fy | OpType::Fx => Fixity::Prefix,
            OpType::Xf | OpType::Yf => Fixity::Postfix,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        Self::STRS[self as usize]
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpType {
    type Err = PrologError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xfx" => Ok(OpType::Xfx),
            "xfy" => Ok(OpType::Xfy),
            "yfx" => Ok(OpType::Yfx),
            "fy" => Ok(OpType::Fy),
            "fx" => Ok(OpType::Fx),
            "xf" => Ok(OpType::Xf),
            "yf" => Ok(OpType::Yf),
            other => Err(PrologError::domain_error(
                "operator_specifier",
                Term::atom(other),
            )),
        }
    }
}

/// One operator definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpDef {
    pub priority: i64,
    pub kind: OpType,
    pub name: Atom,
}

/// The operator table, in definition order.
#[derive(Debug, Clone, Default)]
pub struct Operators {
    map: IndexMap<Atom, [Option<(i64, OpType)>; Fixity::COUNT]>,
}

const DEFAULTS: &[(i64, OpType, &[&str])] = &[
    (1200, OpType::Xfx, &[":-", "-->"]),
    (1200, OpType::Fx, &[":-", "?-"]),
    (1100, OpType::Xfy, &[";", "|"]),
    (1050, OpType::Xfy, &["->"]),
    (1000, OpType::Xfy, &[","]),
    (900, OpType::Fy, &["\\+"]),
    (
        700,
        OpType::Xfx,
        &[
            "=", "\\=", "==", "\\==", "@<", "@>", "@=<", "@>=", "=..", "is", "=:=", "=\\=",
            "<", ">", "=<", ">=",
        ],
    ),
    (500, OpType::Yfx, &["+", "-", "/\\", "\\/"]),
    (400, OpType::Yfx, &["*", "/", "//", "rem", "mod", "<<", ">>"]),
    (200, OpType::Xfx, &["**"]),
    (200, OpType::Xfy, &["^"]),
    (200, OpType::Fy, &["-", "+", "\\"]),
];

impl Operators {
    /// The standard operator table.
    pub fn standard() -> Self {
        let mut ops = Operators::default();
        for (priority, kind, names) in DEFAULTS {
            for name in *names {
                ops.map.entry(Atom::new(name)).or_default()[kind.fixity() as usize] =
                    Some((*priority, *kind));
            }
        }
        ops
    }

    /// Defines `name`; priority 0 removes the definition of that fixity.
    pub fn define(&mut self, priority: i64, kind: OpType, name: Atom) -> Result<(), PrologError> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(PrologError::domain_error("operator_priority", Term::int(priority)));
        }
        if name == "," {
            return Err(PrologError::permission_error("modify", "operator", Term::Atom(name)));
        }
        let slots = self.map.entry(name.clone()).or_default();
        let clash = match kind.fixity() {
            Fixity::Infix => Fixity::Postfix,
            Fixity::Postfix => Fixity::Infix,
            Fixity::Prefix => Fixity::Prefix,
        };
        if clash != kind.fixity() && priority > 0 && slots[clash as usize].is_some() {
            return Err(PrologError::permission_error("create", "operator", Term::Atom(name)));
        }
        slots[kind.fixity() as usize] = (priority > 0).then_some((priority, kind));
        Ok(())
    }

    pub fn get(&self, name: &str, fixity: Fixity) -> Option<(i64, OpType)> {
        self.map
            .get(&Atom::new(name))
            .and_then(|slots| slots[fixity as usize])
    }

    /// Every definition, in table order.
    pub fn defs(&self) -> Vec<OpDef> {
        self.map
            .iter()
            .flat_map(|(name, slots)| {
                slots.iter().flatten().map(|(priority, kind)| OpDef {
                    priority: *priority,
                    kind: *kind,
                    name: name.clone(),
                })
            })
            .collect()
    }
}

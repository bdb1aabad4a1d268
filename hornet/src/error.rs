//! Defines [`PrologError`], the error type of the engine.
//!
//! Program errors are ordinary terms carried in [`PrologError::Thrown`] so
//! that `catch/3` can unify against them. Host faults that no program can
//! recover from are [`PrologError::Fatal`].

use crate::Term;
use thiserror::Error;

/// Errors raised while compiling or executing a query.
#[derive(Debug, Clone, Error)]
pub enum PrologError {
    /// A catchable program error; the payload is the ball.
    #[error("uncaught exception: {0}")]
    Thrown(Term),

    /// A non-catchable failure. Terminates the query.
    #[error("fatal: {0}")]
    Fatal(std::string::String),
}

impl PrologError {
    /// Raises `term` as a program error.
    #[inline]
    pub fn throw(term: Term) -> Self {
        PrologError::Thrown(term)
    }

    pub fn instantiation_error() -> Self {
        Self::throw(Term::atom("instantiation_error"))
    }

    pub fn type_error(expected: &str, culprit: Term) -> Self {
        Self::throw(crate::func!("type_error"; expected, culprit))
    }

    pub fn domain_error(expected: &str, culprit: Term) -> Self {
        Self::throw(crate::func!("domain_error"; expected, culprit))
    }

    pub fn existence_error(kind: &str, culprit: Term) -> Self {
        Self::throw(crate::func!("existence_error"; kind, culprit))
    }

    /// `permission_error(Action, Type, Culprit)`.
    pub fn permission_error(action: &str, kind: &str, culprit: Term) -> Self {
        Self::throw(crate::func!("permission_error"; action, kind, culprit))
    }

    pub fn syntax_error(detail: impl AsRef<str>) -> Self {
        Self::throw(crate::func!("syntax_error"; detail.as_ref()))
    }

    pub fn io_error(operation: &str, stream: Term) -> Self {
        Self::throw(crate::func!("io_error"; operation, stream))
    }

    /// `evaluation_error(What)`, e.g. `zero_divisor` or `int_overflow`.
    pub fn evaluation_error(what: &str) -> Self {
        Self::throw(crate::func!("evaluation_error"; what))
    }

    pub fn representation_error(what: &str) -> Self {
        Self::throw(crate::func!("representation_error"; what))
    }

    /// The ball of a program error.
    #[inline]
    pub fn ball(&self) -> Option<&Term> {
        match self {
            PrologError::Thrown(ball) => Some(ball),
            PrologError::Fatal(_) => None,
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, PrologError::Fatal(_))
    }
}

/// Returns early with a [`PrologError::Fatal`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::PrologError::Fatal(format!($($arg)*)))
    };
}

//! Arithmetic evaluation and comparison.
//!
//! Integers are 64-bit and never silently wrap: an overflowing operation
//! raises `evaluation_error(int_overflow)`. Mixed operands are promoted to
//! floats.

use super::det;
use crate::{func, Database, Number, PrologError, Query, Term};
use rand::Rng;
use std::cmp::Ordering;
use std::rc::Rc;

use Number::{Float, Int};

fn overflow() -> PrologError {
    PrologError::evaluation_error("int_overflow")
}

fn zero_divisor() -> PrologError {
    PrologError::evaluation_error("zero_divisor")
}

fn int(n: Number) -> Result<i64, PrologError> {
    match n {
        Int(i) => Ok(i),
        Float(f) => Err(PrologError::type_error("integer", Term::float(f))),
    }
}

fn float(f: f64) -> Result<Number, PrologError> {
    if f.is_nan() {
        Err(PrologError::evaluation_error("undefined"))
    } else if f.is_infinite() {
        Err(PrologError::evaluation_error("float_overflow"))
    } else {
        Ok(Float(f))
    }
}

/// Converts a float to an integer, raising `int_overflow` outside the
/// representable range.
fn to_int(f: f64) -> Result<Number, PrologError> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(Int(f as i64))
    } else {
        Err(overflow())
    }
}

/// Applies an integer operation when both operands are integers and the
/// float operation otherwise.
fn mixed(
    a: Number,
    b: Number,
    ints: fn(i64, i64) -> Option<i64>,
    floats: fn(f64, f64) -> f64,
) -> Result<Number, PrologError> {
    match (a, b) {
        (Int(x), Int(y)) => ints(x, y).map(Int).ok_or_else(overflow),
        _ => float(floats(a.as_f64(), b.as_f64())),
    }
}

fn divide(a: Number, b: Number) -> Result<Number, PrologError> {
    match (a, b) {
        (_, Int(0)) => Err(zero_divisor()),
        (Int(x), Int(y)) => match x.checked_rem(y) {
            Some(0) | None => x.checked_div(y).map(Int).ok_or_else(overflow),
            Some(_) => float(x as f64 / y as f64),
        },
        (_, Float(y)) if y == 0.0 => Err(zero_divisor()),
        _ => float(a.as_f64() / b.as_f64()),
    }
}

fn integer_division(a: Number, b: Number, op: fn(i64, i64) -> Option<i64>) -> Result<Number, PrologError> {
    let (x, y) = (int(a)?, int(b)?);
    if y == 0 {
        return Err(zero_divisor());
    }
    op(x, y).map(Int).ok_or_else(overflow)
}

/// `mod` takes the sign of the divisor.
fn modulo(x: i64, y: i64) -> Option<i64> {
    let r = x.checked_rem(y)?;
    if r != 0 && (r < 0) != (y < 0) {
        r.checked_add(y)
    } else {
        Some(r)
    }
}

fn shift(a: Number, b: Number, left: bool) -> Result<Number, PrologError> {
    let (x, y) = (int(a)?, int(b)?);
    let left = left == (y >= 0);
    let amount = u32::try_from(y.unsigned_abs()).unwrap_or(u32::MAX).min(63);
    if left {
        let shifted = x << amount;
        if shifted >> amount != x {
            return Err(overflow());
        }
        Ok(Int(shifted))
    } else {
        Ok(Int(x >> amount))
    }
}

fn compare_numbers(a: Number, b: Number) -> Ordering {
    match (a, b) {
        (Int(x), Int(y)) => x.cmp(&y),
        _ => a.as_f64().total_cmp(&b.as_f64()),
    }
}

fn unary(name: &str, x: Number) -> Option<Result<Number, PrologError>> {
    let result = match name {
        "-" => match x {
            Int(i) => i.checked_neg().map(Int).ok_or_else(overflow),
            Float(f) => Ok(Float(-f)),
        },
        "+" => Ok(x),
        "abs" => match x {
            Int(i) => i.checked_abs().map(Int).ok_or_else(overflow),
            Float(f) => Ok(Float(f.abs())),
        },
        "sign" => Ok(match x {
            Int(i) => Int(i.signum()),
            Float(f) if f == 0.0 => Float(0.0),
            Float(f) => Float(f.signum()),
        }),
        "float" => Ok(Float(x.as_f64())),
        "integer" | "round" => match x {
            Int(_) => Ok(x),
            Float(f) => to_int(f.round()),
        },
        "truncate" => match x {
            Int(_) => Ok(x),
            Float(f) => to_int(f.trunc()),
        },
        "floor" => match x {
            Int(_) => Ok(x),
            Float(f) => to_int(f.floor()),
        },
        "ceiling" => match x {
            Int(_) => Ok(x),
            Float(f) => to_int(f.ceil()),
        },
        "\\" => int(x).map(|i| Int(!i)),
        "sqrt" if x.as_f64() < 0.0 => Err(PrologError::evaluation_error("undefined")),
        "sqrt" => float(x.as_f64().sqrt()),
        "log" if x.as_f64() <= 0.0 => Err(PrologError::evaluation_error("undefined")),
        "log" => float(x.as_f64().ln()),
        "exp" => float(x.as_f64().exp()),
        "sin" => float(x.as_f64().sin()),
        "cos" => float(x.as_f64().cos()),
        _ => return None,
    };
    Some(result)
}

fn binary(name: &str, x: Number, y: Number) -> Option<Result<Number, PrologError>> {
    let result = match name {
        "+" => mixed(x, y, i64::checked_add, |a, b| a + b),
        "-" => mixed(x, y, i64::checked_sub, |a, b| a - b),
        "*" => mixed(x, y, i64::checked_mul, |a, b| a * b),
        "/" => divide(x, y),
        "//" => integer_division(x, y, i64::checked_div),
        "mod" => integer_division(x, y, modulo),
        "rem" => integer_division(x, y, i64::checked_rem),
        "min" => Ok(if compare_numbers(x, y) == Ordering::Greater { y } else { x }),
        "max" => Ok(if compare_numbers(x, y) == Ordering::Less { y } else { x }),
        "<<" => shift(x, y, true),
        ">>" => shift(x, y, false),
        "/\\" => int(x).and_then(|a| Ok(Int(a & int(y)?))),
        "\\/" => int(x).and_then(|a| Ok(Int(a | int(y)?))),
        "xor" => int(x).and_then(|a| Ok(Int(a ^ int(y)?))),
        "**" => float(x.as_f64().powf(y.as_f64())),
        "^" => match (x, y) {
            (Int(b), Int(e)) if e < 0 && b.abs() != 1 => {
                Err(PrologError::type_error("float", Term::int(b)))
            }
            (Int(b), Int(e)) if e < 0 => Ok(Int(if e % 2 == 0 { 1 } else { b })),
            (Int(b), Int(e)) => u32::try_from(e)
                .ok()
                .and_then(|e| b.checked_pow(e))
                .map(Int)
                .ok_or_else(overflow),
            _ => float(x.as_f64().powf(y.as_f64())),
        },
        _ => return None,
    };
    Some(result)
}

/// Evaluates an arithmetic expression in the frames of `query`.
pub(crate) fn eval(query: &Query, term: &Term) -> Result<Number, PrologError> {
    let term = query.strip(term)?;
    if let Term::Number(n) = &term {
        return Ok(*n);
    }
    if term.is_var() {
        return Err(PrologError::instantiation_error());
    }
    let Some((name, arity)) = term.functor() else {
        return Err(PrologError::type_error("evaluable", term.clone()));
    };
    let result = match arity {
        0 => match name.as_str() {
            "pi" => Some(Ok(Float(std::f64::consts::PI))),
            "e" => Some(Ok(Float(std::f64::consts::E))),
            "max_integer" => Some(Ok(Int(i64::MAX))),
            "min_integer" => Some(Ok(Int(i64::MIN))),
            "random" => Some(Ok(Float(rand::thread_rng().gen()))),
            _ => None,
        },
        1 => {
            let x = eval(query, &term.args()[0])?;
            unary(name.as_str(), x)
        }
        2 => {
            let args = term.args();
            let x = eval(query, &args[0])?;
            let y = eval(query, &args[1])?;
            binary(name.as_str(), x, y)
        }
        _ => None,
    };
    result.unwrap_or_else(|| {
        Err(PrologError::type_error(
            "evaluable",
            func!("/"; name.as_str(), arity as i64),
        ))
    })
}

fn compare(query: &Query, args: &[Term]) -> Result<Ordering, PrologError> {
    let a = eval(query, &args[0])?;
    let b = eval(query, &args[1])?;
    Ok(compare_numbers(a, b))
}

fn is(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let value = eval(query, &args[1])?;
    query.unify(&args[0], &Term::number(value))
}

fn random(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let value: f64 = rand::thread_rng().gen();
    query.unify(&args[0], &Term::float(value))
}

pub(super) fn install(db: &Rc<Database>) -> Result<(), PrologError> {
    det(db, "is", 2, is)?;
    det(db, "=:=", 2, |q, a| Ok(compare(q, a)? == Ordering::Equal))?;
    det(db, "=\\=", 2, |q, a| Ok(compare(q, a)? != Ordering::Equal))?;
    det(db, "<", 2, |q, a| Ok(compare(q, a)? == Ordering::Less))?;
    det(db, ">", 2, |q, a| Ok(compare(q, a)? == Ordering::Greater))?;
    det(db, "=<", 2, |q, a| Ok(compare(q, a)? != Ordering::Greater))?;
    det(db, ">=", 2, |q, a| Ok(compare(q, a)? != Ordering::Less))?;
    det(db, "random", 1, random)
}

//! The variadic arithmetic builtins `+`, `-`, `*`, and `/`.
//!
//! Addition and multiplication fold over their identity elements (0 and 1).
//! If any argument is a float the result is a float, otherwise it stays an
//! int; integer arithmetic wraps. Division always produces a float, so
//! `(/ 2)` is `0.5`.

use super::check_at_least;
use crate::{
    Vm,
    error::{Error, RunResult},
    value::Value,
};

/// A numeric operand: the only value variants arithmetic accepts.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn value(self) -> Value {
        match self {
            Self::Int(i) => Value::Int(i),
            Self::Float(f) => Value::Float(f),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

fn as_num(name: &str, value: Value) -> RunResult<Num> {
    match value {
        Value::Int(i) => Ok(Num::Int(i)),
        Value::Float(f) => Ok(Num::Float(f)),
        other => Err(Error::type_error(format!(
            "{name} expects numbers, got {}",
            other.type_name()
        ))),
    }
}

fn fold_int(acc: Num, operand: Num, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Num {
    match (acc, operand) {
        (Num::Int(a), Num::Int(b)) => Num::Int(int_op(a, b)),
        (a, b) => Num::Float(float_op(a.as_f64(), b.as_f64())),
    }
}

pub(super) fn add(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    let mut acc = Num::Int(0);
    for &arg in args {
        acc = fold_int(acc, as_num("+", arg)?, i64::wrapping_add, |a, b| a + b);
    }
    Ok(acc.value())
}

pub(super) fn mul(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    let mut acc = Num::Int(1);
    for &arg in args {
        acc = fold_int(acc, as_num("*", arg)?, i64::wrapping_mul, |a, b| a * b);
    }
    Ok(acc.value())
}

pub(super) fn sub(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_at_least("-", args, 1)?;
    let first = as_num("-", args[0])?;
    if args.len() == 1 {
        return Ok(match first {
            Num::Int(i) => Value::Int(i.wrapping_neg()),
            Num::Float(f) => Value::Float(-f),
        });
    }
    let mut acc = first;
    for &arg in &args[1..] {
        acc = fold_int(acc, as_num("-", arg)?, i64::wrapping_sub, |a, b| a - b);
    }
    Ok(acc.value())
}

pub(super) fn div(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_at_least("/", args, 1)?;
    let first = as_num("/", args[0])?.as_f64();
    if args.len() == 1 {
        return Ok(Value::Float(1.0 / first));
    }
    let mut acc = first;
    for &arg in &args[1..] {
        acc /= as_num("/", arg)?.as_f64();
    }
    Ok(Value::Float(acc))
}

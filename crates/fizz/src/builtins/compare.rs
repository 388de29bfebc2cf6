//! The variadic ordering comparisons `<`, `<=`, `>`, and `>=`.
//!
//! Comparisons are vacuously true for zero or one arguments and otherwise
//! hold when every adjacent pair satisfies the ordering. Mixed int/float
//! pairs promote the int to a float.

use std::cmp::Ordering;

use crate::{
    Vm,
    error::{Error, RunResult},
    value::Value,
};

pub(super) fn lt(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    chain("<", args, Ordering::is_lt)
}

pub(super) fn le(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    chain("<=", args, Ordering::is_le)
}

pub(super) fn gt(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    chain(">", args, Ordering::is_gt)
}

pub(super) fn ge(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    chain(">=", args, Ordering::is_ge)
}

fn chain(name: &str, args: &[Value], keep: fn(Ordering) -> bool) -> RunResult<Value> {
    for pair in args.windows(2) {
        // NaN compares as unordered, which fails every chain.
        let holds = numeric_ordering(name, pair[0], pair[1])?.is_some_and(keep);
        if !holds {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn numeric_ordering(name: &str, a: Value, b: Value) -> RunResult<Option<Ordering>> {
    Ok(match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(&b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(&b),
        (Value::Int(a), Value::Float(b)) => (a as f64).partial_cmp(&b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(b as f64)),
        _ => {
            let offender = if matches!(a, Value::Int(_) | Value::Float(_)) { b } else { a };
            return Err(Error::type_error(format!(
                "{name} expects numbers, got {}",
                offender.type_name()
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn eval(source: &str) -> RunResult<Value> {
        Vm::new().eval_str(source)
    }

    #[test]
    fn test_vacuous_truth() {
        assert_eq!(eval("(<)").unwrap(), Value::Bool(true));
        assert_eq!(eval("(< 0)").unwrap(), Value::Bool(true));
        assert_eq!(eval("(>= 9)").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_chained_comparison() {
        assert_eq!(eval("(< 0 1 2)").unwrap(), Value::Bool(true));
        assert_eq!(eval("(< 0 1 0)").unwrap(), Value::Bool(false));
        assert_eq!(eval("(<= 1 1 2)").unwrap(), Value::Bool(true));
        assert_eq!(eval("(> 3 2 1)").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_mixed_int_float_promotes() {
        assert_eq!(eval("(< 1 1.5 2)").unwrap(), Value::Bool(true));
        assert_eq!(eval("(> 1 1.5)").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_non_numbers_are_rejected() {
        assert_eq!(eval("(< 1 \"x\")").unwrap_err().kind(), ErrorKind::TypeError);
    }
}

//! The structural equality builtin `=`.
//!
//! Takes exactly two arguments. Strings and symbols compare by interned
//! handle (which is content equality), lists element-wise, structs by key
//! set and per-key values, and functions by identity. Comparing values of
//! different variants is a `TypeError`.

use std::ptr;

use super::check_exact;
use crate::{
    Vm,
    error::{Error, RunResult},
    heap::{Heap, HeapData},
    value::Value,
};

pub(super) fn equal(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("=", args, 2)?;
    Ok(Value::Bool(structural_eq(vm.heap(), args[0], args[1])?))
}

fn structural_eq(heap: &Heap, a: Value, b: Value) -> RunResult<bool> {
    Ok(match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        // Interning makes handle equality content equality.
        (Value::Str(a), Value::Str(b)) | (Value::Symbol(a), Value::Symbol(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            if a == b {
                return Ok(true);
            }
            let left = heap.list(a);
            let right = heap.list(b);
            if left.len() != right.len() {
                return Ok(false);
            }
            for (x, y) in left.iter().zip(right) {
                if !structural_eq(heap, *x, *y)? {
                    return Ok(false);
                }
            }
            true
        }
        (Value::Struct(a), Value::Struct(b)) => {
            if a == b {
                return Ok(true);
            }
            let (HeapData::Struct(left), HeapData::Struct(right)) = (heap.get(a), heap.get(b)) else {
                unreachable!("struct values refer to struct slots")
            };
            if left.len() != right.len() {
                return Ok(false);
            }
            for (key, value) in left {
                let Some(other) = right.get(key) else {
                    return Ok(false);
                };
                if !structural_eq(heap, *value, *other)? {
                    return Ok(false);
                }
            }
            true
        }
        (Value::ByteCode(a), Value::ByteCode(b)) => a == b,
        (Value::NativeFn(a), Value::NativeFn(b)) => ptr::fn_addr_eq(a, b),
        _ => {
            return Err(Error::type_error(format!(
                "= cannot compare {} to {}",
                a.type_name(),
                b.type_name()
            )));
        }
    })
}

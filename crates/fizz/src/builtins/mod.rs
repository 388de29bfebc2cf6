//! The native functions registered into the global module at VM creation.
//!
//! Each builtin group has its own submodule. Builtins share the native
//! function signature: they receive the VM and their argument slice, which
//! also remains on the VM's data stack for the duration of the call (so the
//! arguments stay reachable across any collection a builtin triggers).

mod apply;
mod arithmetic;
mod compare;
mod equality;
mod filter;
mod lists;
mod map;
mod misc;
mod strings;
mod structs;
mod to_str;

use crate::{
    Vm,
    bytecode::DEFINE_BUILTIN,
    error::{Error, RunResult},
    heap::HeapId,
    value::Value,
};

/// Registers every builtin into the global module.
pub(crate) fn register(vm: &mut Vm) -> RunResult<()> {
    vm.register_function("*modules*", misc::modules)?;
    vm.register_function("do", misc::do_)?;
    vm.register_function("apply", apply::apply)?;
    vm.register_function("->str", to_str::to_str)?;
    vm.register_function("=", equality::equal)?;
    vm.register_function("str-len", strings::str_len)?;
    vm.register_function("str-concat", strings::str_concat)?;
    vm.register_function("str-substr", strings::str_substr)?;
    vm.register_function("struct", structs::struct_new)?;
    vm.register_function("struct-set!", structs::struct_set)?;
    vm.register_function("struct-get", structs::struct_get)?;
    vm.register_function("list", lists::list)?;
    vm.register_function("list?", lists::is_list)?;
    vm.register_function("len", lists::len)?;
    vm.register_function("first", lists::first)?;
    vm.register_function("rest", lists::rest)?;
    vm.register_function("nth", lists::nth)?;
    vm.register_function("map", map::map)?;
    vm.register_function("filter", filter::filter)?;
    vm.register_function("+", arithmetic::add)?;
    vm.register_function("-", arithmetic::sub)?;
    vm.register_function("*", arithmetic::mul)?;
    vm.register_function("/", arithmetic::div)?;
    vm.register_function("<", compare::lt)?;
    vm.register_function("<=", compare::le)?;
    vm.register_function(">", compare::gt)?;
    vm.register_function(">=", compare::ge)?;
    vm.register_function(DEFINE_BUILTIN, misc::define)?;
    Ok(())
}

/// Fails with an `ArityError` unless exactly `expected` arguments were
/// passed.
fn check_exact(name: &str, args: &[Value], expected: usize) -> RunResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::arity_error(format!(
            "{name} expects {expected} arguments, got {}",
            args.len()
        )))
    }
}

/// Fails with an `ArityError` unless at least `min` arguments were passed.
fn check_at_least(name: &str, args: &[Value], min: usize) -> RunResult<()> {
    if args.len() >= min {
        Ok(())
    } else {
        Err(Error::arity_error(format!(
            "{name} expects at least {min} arguments, got {}",
            args.len()
        )))
    }
}

/// Extracts a list handle or fails with a `TypeError`.
fn expect_list(name: &str, value: Value) -> RunResult<HeapId> {
    match value {
        Value::List(id) => Ok(id),
        other => Err(Error::type_error(format!(
            "{name} expects a list, got {}",
            other.type_name()
        ))),
    }
}

/// Extracts a string handle or fails with a `TypeError`.
fn expect_str(name: &str, value: Value) -> RunResult<HeapId> {
    match value {
        Value::Str(id) => Ok(id),
        other => Err(Error::type_error(format!(
            "{name} expects a string, got {}",
            other.type_name()
        ))),
    }
}

/// Extracts a symbol handle or fails with a `TypeError`.
fn expect_symbol(name: &str, value: Value) -> RunResult<HeapId> {
    match value {
        Value::Symbol(id) => Ok(id),
        other => Err(Error::type_error(format!(
            "{name} expects a symbol, got {}",
            other.type_name()
        ))),
    }
}

/// Extracts an in-range `usize` index or fails with a `TypeError`.
fn expect_index(name: &str, value: Value) -> RunResult<usize> {
    match value {
        Value::Int(i) if i >= 0 => Ok(usize::try_from(i).expect("non-negative i64 fits in usize")),
        Value::Int(i) => Err(Error::runtime_error(format!("{name} index {i} is negative"))),
        other => Err(Error::type_error(format!(
            "{name} expects an int index, got {}",
            other.type_name()
        ))),
    }
}

/// Fails with a `TypeError` unless the value is a bytecode or native
/// function.
fn expect_callable(name: &str, value: Value) -> RunResult<Value> {
    if value.is_callable() {
        Ok(value)
    } else {
        Err(Error::type_error(format!(
            "{name} expects a function, got {}",
            value.type_name()
        )))
    }
}

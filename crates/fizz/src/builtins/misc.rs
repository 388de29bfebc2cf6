//! `do`, `*modules*`, and the internal `%define%` builtin.

use super::{check_exact, expect_symbol};
use crate::{Vm, error::RunResult, value::Value};

/// Evaluates to the last argument, or `none` with no arguments.
pub(super) fn do_(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    Ok(args.last().copied().unwrap_or(Value::None))
}

/// Lists the names of all registered modules, global first.
pub(super) fn modules(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("*modules*", args, 0)?;
    let names: Vec<String> = vm.module_names().map(str::to_owned).collect();
    let mut values = Vec::with_capacity(names.len());
    for name in &names {
        values.push(vm.make_string(name)?);
    }
    vm.make_list(&values)
}

/// Internal: binds a symbol in the current module.
///
/// Only called through compiler-emitted `define` sequences, which push the
/// symbol and the evaluated expression.
pub(super) fn define(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("%define%", args, 2)?;
    let symbol = expect_symbol("%define%", args[0])?;
    let module = vm.current_module();
    vm.set_module_value(module, symbol, args[1]);
    Ok(Value::None)
}

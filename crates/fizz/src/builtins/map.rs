//! The `map` builtin.
//!
//! Applies a callable to each element of a list through the VM's re-entrant
//! evaluator. The result list is allocated up front at full length and
//! pinned in the heap's keep-alive set for the duration of the callbacks:
//! the callbacks may trigger collections, and the partially filled result
//! has no other root.

use super::{check_exact, expect_callable, expect_list};
use crate::{
    Vm,
    error::RunResult,
    heap::HeapData,
    value::Value,
};

pub(super) fn map(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("map", args, 2)?;
    let func = expect_callable("map", args[0])?;
    let list_id = expect_list("map", args[1])?;
    let len = vm.heap().list(list_id).len();

    let out_id = vm.heap_mut().alloc_list_of_len(len)?;
    vm.heap_mut().keep_alive(Value::List(out_id));
    let result: RunResult<Value> = (|| {
        for index in 0..len {
            let element = vm.heap().list(list_id)[index];
            let mapped = vm.eval_no_reset(func, &[element])?;
            let HeapData::List(values) = vm.heap_mut().get_mut(out_id) else {
                unreachable!("result slot holds a list")
            };
            values[index] = mapped;
        }
        Ok(Value::List(out_id))
    })();
    vm.heap_mut().allow_death(Value::List(out_id));
    result
}

//! The `filter` builtin.
//!
//! Keeps the elements for which the predicate returns `true`. The predicate
//! must return a boolean. Kept elements are staged in a pre-sized, pinned
//! list while callbacks run (callbacks may trigger collections); the final
//! list is allocated from the staged prefix once the count is known.

use super::{check_exact, expect_callable, expect_list};
use crate::{
    Vm,
    error::{Error, RunResult},
    heap::HeapData,
    value::Value,
};

pub(super) fn filter(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("filter", args, 2)?;
    let func = expect_callable("filter", args[0])?;
    let list_id = expect_list("filter", args[1])?;
    let len = vm.heap().list(list_id).len();

    let staging_id = vm.heap_mut().alloc_list_of_len(len)?;
    vm.heap_mut().keep_alive(Value::List(staging_id));
    let result: RunResult<Value> = (|| {
        let mut kept = 0;
        for index in 0..len {
            let element = vm.heap().list(list_id)[index];
            let verdict = vm.eval_no_reset(func, &[element])?;
            match verdict {
                Value::Bool(true) => {
                    let HeapData::List(values) = vm.heap_mut().get_mut(staging_id) else {
                        unreachable!("staging slot holds a list")
                    };
                    values[kept] = element;
                    kept += 1;
                }
                Value::Bool(false) => {}
                other => {
                    return Err(Error::type_error(format!(
                        "filter predicate must return a boolean, got {}",
                        other.type_name()
                    )));
                }
            }
        }
        let kept_elements = vm.heap().list(staging_id)[..kept].to_vec();
        vm.make_list(&kept_elements)
    })();
    vm.heap_mut().allow_death(Value::List(staging_id));
    result
}

//! The `apply` builtin: call a function with a list as its arguments.

use smallvec::SmallVec;

use super::{check_exact, expect_callable, expect_list};
use crate::{Vm, error::RunResult, value::Value};

pub(super) fn apply(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("apply", args, 2)?;
    let func = expect_callable("apply", args[0])?;
    let list_id = expect_list("apply", args[1])?;
    // The source list stays rooted through apply's own argument slots.
    let call_args: SmallVec<[Value; 8]> = vm.heap().list(list_id).iter().copied().collect();
    vm.eval_no_reset(func, &call_args)
}

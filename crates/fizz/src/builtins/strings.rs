//! The string primitives: `str-len`, `str-concat`, and `str-substr`.
//!
//! Strings are UTF-8; lengths and substring indices are byte-based.
//! `str-substr` takes a half-open `[start, end)` range and enforces both
//! bounds and UTF-8 character boundaries.

use super::{check_exact, expect_index, expect_list, expect_str};
use crate::{
    Vm,
    error::{Error, RunResult},
    value::Value,
};

pub(super) fn str_len(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("str-len", args, 1)?;
    let id = expect_str("str-len", args[0])?;
    let length = i64::try_from(vm.heap().str_content(id).len()).expect("string length fits in i64");
    Ok(Value::Int(length))
}

/// Joins a single list of strings.
pub(super) fn str_concat(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("str-concat", args, 1)?;
    let list_id = expect_list("str-concat", args[0])?;
    let mut joined = String::new();
    for &element in vm.heap().list(list_id) {
        let id = expect_str("str-concat", element)?;
        joined.push_str(vm.heap().str_content(id));
    }
    vm.make_string(&joined)
}

pub(super) fn str_substr(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("str-substr", args, 3)?;
    let id = expect_str("str-substr", args[0])?;
    let start = expect_index("str-substr", args[1])?;
    let end = expect_index("str-substr", args[2])?;
    let content = vm.heap().str_content(id);
    if start > end || end > content.len() {
        return Err(Error::runtime_error(format!(
            "str-substr range {start}..{end} is out of bounds for a string of {} bytes",
            content.len()
        )));
    }
    let Some(slice) = content.get(start..end) else {
        return Err(Error::runtime_error(format!(
            "str-substr range {start}..{end} splits a multi-byte character"
        )));
    };
    let slice = slice.to_owned();
    vm.make_string(&slice)
}

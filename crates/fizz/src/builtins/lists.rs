//! The list primitives: `list`, `list?`, `len`, `first`, `rest`, and `nth`.

use super::{check_exact, expect_index, expect_list};
use crate::{
    Vm,
    error::{Error, RunResult},
    value::Value,
};

pub(super) fn list(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    vm.make_list(args)
}

pub(super) fn is_list(_vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("list?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::List(_))))
}

pub(super) fn len(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("len", args, 1)?;
    let id = expect_list("len", args[0])?;
    let length = i64::try_from(vm.heap().list(id).len()).expect("list length fits in i64");
    Ok(Value::Int(length))
}

pub(super) fn first(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("first", args, 1)?;
    let id = expect_list("first", args[0])?;
    vm.heap()
        .list(id)
        .first()
        .copied()
        .ok_or_else(|| Error::runtime_error("first on an empty list"))
}

pub(super) fn rest(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("rest", args, 1)?;
    let id = expect_list("rest", args[0])?;
    let elements = vm.heap().list(id);
    if elements.is_empty() {
        return Err(Error::runtime_error("rest on an empty list"));
    }
    let tail = elements[1..].to_vec();
    vm.make_list(&tail)
}

pub(super) fn nth(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("nth", args, 2)?;
    let id = expect_list("nth", args[0])?;
    let index = expect_index("nth", args[1])?;
    let elements = vm.heap().list(id);
    elements.get(index).copied().ok_or_else(|| {
        Error::runtime_error(format!("nth index {index} is out of range for a list of {}", elements.len()))
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

    fn display(source: &str) -> String {
        let mut vm = Vm::new();
        let value = vm.eval_str(source).unwrap();
        vm.display(value)
    }

    #[test]
    fn test_list_construction_and_predicates() {
        assert_eq!(display("(list 1 2 3)"), "(1 2 3)");
        assert_eq!(display("(list)"), "()");
        assert_eq!(eval("(list? (list))").unwrap(), Value::Bool(true));
        assert_eq!(eval("(list? 1)").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_len_first_rest_nth() {
        assert_eq!(eval("(len (list 4 5 6))").unwrap(), Value::Int(3));
        assert_eq!(eval("(first (list 4 5 6))").unwrap(), Value::Int(4));
        assert_eq!(display("(rest (list 4 5 6))"), "(5 6)");
        assert_eq!(eval("(nth (list 4 5 6) 2)").unwrap(), Value::Int(6));
    }

    #[test]
    fn test_empty_list_domain_errors() {
        assert_eq!(eval("(first (list))").unwrap_err().kind(), ErrorKind::RuntimeError);
        assert_eq!(eval("(rest (list))").unwrap_err().kind(), ErrorKind::RuntimeError);
        assert_eq!(eval("(nth (list) 0)").unwrap_err().kind(), ErrorKind::RuntimeError);
    }

    #[test]
    fn test_nth_bounds_and_types() {
        assert_eq!(eval("(nth (list 1) 1)").unwrap_err().kind(), ErrorKind::RuntimeError);
        assert_eq!(eval("(nth (list 1) -1)").unwrap_err().kind(), ErrorKind::RuntimeError);
        assert_eq!(eval("(nth 1 (list))").unwrap_err().kind(), ErrorKind::TypeError);
        assert_eq!(eval("(len \"abc\")").unwrap_err().kind(), ErrorKind::TypeError);
    }
}

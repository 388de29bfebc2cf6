//! The struct primitives: `struct`, `struct-get`, and `struct-set!`.

use super::{check_exact, expect_symbol};
use crate::{
    Vm,
    error::{Error, RunResult},
    heap::{HeapData, HeapId},
    value::Value,
};

/// Builds a struct from `(symbol, value)` pairs.
pub(super) fn struct_new(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    if args.len() % 2 != 0 {
        return Err(Error::arity_error(format!(
            "struct expects symbol and value pairs, got {} arguments",
            args.len()
        )));
    }
    let id = vm.heap_mut().alloc_struct()?;
    for pair in args.chunks_exact(2) {
        let key = expect_symbol("struct", pair[0])?;
        let HeapData::Struct(fields) = vm.heap_mut().get_mut(id) else {
            unreachable!("freshly allocated struct slot")
        };
        fields.insert(key, pair[1]);
    }
    Ok(Value::Struct(id))
}

pub(super) fn struct_get(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("struct-get", args, 2)?;
    let id = expect_struct("struct-get", args[0])?;
    let key = expect_symbol("struct-get", args[1])?;
    let HeapData::Struct(fields) = vm.heap().get(id) else {
        unreachable!("struct value refers to a struct slot")
    };
    fields.get(&key).copied().ok_or_else(|| {
        Error::runtime_error(format!("struct has no field '{}", vm.heap().str_content(key)))
    })
}

pub(super) fn struct_set(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("struct-set!", args, 3)?;
    let id = expect_struct("struct-set!", args[0])?;
    let key = expect_symbol("struct-set!", args[1])?;
    let HeapData::Struct(fields) = vm.heap_mut().get_mut(id) else {
        unreachable!("struct value refers to a struct slot")
    };
    fields.insert(key, args[2]);
    Ok(Value::None)
}

fn expect_struct(name: &str, value: Value) -> RunResult<HeapId> {
    match value {
        Value::Struct(id) => Ok(id),
        other => Err(Error::type_error(format!(
            "{name} expects a struct, got {}",
            other.type_name()
        ))),
    }
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
    fn test_struct_lookup_and_mutation() {
        let mut vm = Vm::new();
        vm.eval_str("(define s (struct 'id 0 'hello \"world\"))").unwrap();
        let hello = vm.eval_str("(struct-get s 'hello)").unwrap();
        assert_eq!(vm.display(hello), "\"world\"");
        vm.eval_str("(struct-set! s 'id 100)").unwrap();
        assert_eq!(vm.eval_str("(struct-get s 'id)").unwrap(), Value::Int(100));
    }

    #[test]
    fn test_struct_set_can_add_a_field() {
        let mut vm = Vm::new();
        vm.eval_str("(define s (struct))").unwrap();
        vm.eval_str("(struct-set! s 'fresh 1)").unwrap();
        assert_eq!(vm.eval_str("(struct-get s 'fresh)").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_odd_arity_is_rejected() {
        assert_eq!(eval("(struct 'a)").unwrap_err().kind(), ErrorKind::ArityError);
        assert_eq!(eval("(struct 'a 1 'b)").unwrap_err().kind(), ErrorKind::ArityError);
    }

    #[test]
    fn test_non_symbol_keys_are_rejected() {
        assert_eq!(eval("(struct \"a\" 1)").unwrap_err().kind(), ErrorKind::TypeError);
        assert_eq!(eval("(struct 1 1)").unwrap_err().kind(), ErrorKind::TypeError);
    }

    #[test]
    fn test_missing_field_is_a_runtime_error() {
        assert_eq!(
            eval("(struct-get (struct 'a 1) 'b)").unwrap_err().kind(),
            ErrorKind::RuntimeError
        );
    }
}

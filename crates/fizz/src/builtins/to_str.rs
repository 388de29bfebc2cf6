//! The `->str` builtin.
//!
//! A string argument is returned as-is; anything else is rendered through
//! the printed representation.

use super::check_exact;
use crate::{Vm, error::RunResult, value::Value};

pub(super) fn to_str(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
    check_exact("->str", args, 1)?;
    match args[0] {
        Value::Str(_) => Ok(args[0]),
        other => {
            let rendered = vm.display(other);
            vm.make_string(&rendered)
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn to_str_content(source: &str) -> String {
        let mut vm = Vm::new();
        let value = vm.eval_str(source).unwrap();
        vm.str_content(value).unwrap().to_owned()
    }

    #[test]
    fn test_strings_pass_through_unquoted() {
        assert_eq!(to_str_content("(->str \"already\")"), "already");
    }

    #[test]
    fn test_other_values_use_the_printed_representation() {
        assert_eq!(to_str_content("(->str (if false 1))"), "none");
        assert_eq!(to_str_content("(->str 42)"), "42");
        assert_eq!(to_str_content("(->str 1.5)"), "1.5");
        assert_eq!(to_str_content("(->str 'sym)"), "'sym");
        assert_eq!(to_str_content("(->str (list 1 2))"), "(1 2)");
    }

    #[test]
    fn test_function_rendering_includes_the_display_name() {
        let mut vm = Vm::new();
        vm.eval_str("(define (fib n) n)").unwrap();
        let named = vm.eval_str("(->str fib)").unwrap();
        assert_eq!(vm.str_content(named).unwrap(), "<function fib>");
        let anonymous = vm.eval_str("(->str (lambda (n) n))").unwrap();
        assert_eq!(vm.str_content(anonymous).unwrap(), "<function >");
    }
}

//! Invariant and property checks: interning identity, GC idempotence and
//! safety, keep-alive discipline for native callbacks, and resource limits.

use fizz::{ErrorKind, GcStrategy, RunResult, Value, Vm};
use pretty_assertions::assert_eq;

#[test]
fn test_equal_content_strings_share_a_handle() {
    let mut vm = Vm::new();
    let a = vm.make_string("shared").unwrap();
    let b = vm.make_string("shared").unwrap();
    assert_eq!(a, b);
    let symbol = vm.make_symbol("shared").unwrap();
    // Same pool, distinguished only by the value tag.
    assert_eq!(vm.str_content(a), vm.str_content(symbol));
    assert_ne!(a, symbol);
}

#[test]
fn test_interning_survives_collection() {
    let mut vm = Vm::with_gc_strategy(GcStrategy::Manual);
    vm.eval_str("(define kept \"persistent\")").unwrap();
    vm.run_gc();
    vm.run_gc();
    let again = vm.make_string("persistent").unwrap();
    let bound = vm.eval_str("kept").unwrap();
    assert_eq!(bound, again);
}

#[test]
fn test_collection_is_idempotent_without_mutation() {
    let mut vm = Vm::with_gc_strategy(GcStrategy::Manual);
    vm.eval_str("(define data (list 1 (list 2 3) (struct 'k \"v\")))").unwrap();
    vm.run_gc();
    vm.run_gc();
    let settled = vm.heap_stats();
    vm.run_gc();
    assert_eq!(vm.heap_stats(), settled);
}

#[test]
fn test_heap_diff_of_an_evaluation() {
    let mut vm = Vm::with_gc_strategy(GcStrategy::Manual);
    let before = vm.heap_stats();
    vm.eval_str("(define grown (list 1 2 3))").unwrap();
    let diff = before.diff(&vm.heap_stats());
    assert!(diff.live_objects_delta > 0);
    assert_eq!(diff.objects_by_type_delta.get("List"), Some(&1));
}

#[test]
fn test_native_keep_alive_protects_intermediates() {
    // A native that builds a list, then runs enough script to trigger
    // collections, then returns the list. Without its argument staying on
    // the data stack the intermediate would be unreachable mid-callback.
    fn build_and_spin(vm: &mut Vm, args: &[Value]) -> RunResult<Value> {
        let built = vm.make_list(&[Value::Int(1), Value::Int(2)])?;
        let spinner = args[0];
        vm.eval_no_reset(spinner, &[built])?;
        Ok(built)
    }

    let mut vm = Vm::new();
    vm.register_function("build-and-spin", build_and_spin).unwrap();
    vm.eval_str("(define (spin x) (do (spin-loop 400) x))").unwrap();
    vm.eval_str("(define (spin-loop n) (if (< n 1) n (spin-loop (- n 1))))")
        .unwrap();
    let result = vm.eval_str("(build-and-spin spin)").unwrap();
    assert_eq!(vm.display(result), "(1 2)");
}

#[test]
fn test_out_of_memory_when_the_heap_limit_is_hit() {
    let mut vm = Vm::new();
    vm.set_heap_limit(Some(vm.heap_stats().live_objects + 4));
    let err = vm.eval_str("(list (list 1) (list 2) (list 3) (list 4) (list 5))").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    // The VM stays usable after the failure.
    vm.set_heap_limit(None);
    assert_eq!(vm.eval_str("(+ 1 2)").unwrap(), Value::Int(3));
}

#[test]
fn test_apply_equivalence_holds_for_native_functions() {
    let mut vm = Vm::new();
    let applied = vm.eval_str("(apply + (list 1 2 3))").unwrap();
    let direct = vm.eval_str("(+ 1 2 3)").unwrap();
    assert_eq!(applied, direct);
}

#[test]
fn test_lone_slash_is_the_division_builtin() {
    // A `/` at either end of an identifier does not qualify it.
    let mut vm = Vm::new();
    assert_eq!(vm.eval_str("(apply / (list 1 2))").unwrap(), Value::Float(0.5));
    assert_eq!(vm.eval_str("(= / /)").unwrap(), Value::Bool(true));
}

#[test]
fn test_deeply_nested_expressions() {
    let mut vm = Vm::new();
    let depth = 200;
    let source = format!("{}1{}", "(+ ".repeat(depth), ")".repeat(depth));
    assert_eq!(vm.eval_str(&source).unwrap(), Value::Int(1));
}

#[test]
fn test_struct_display_is_stable_between_reads() {
    let mut vm = Vm::new();
    vm.eval_str("(define s (struct 'a 1 'b 2 'c 3))").unwrap();
    let first = {
        let value = vm.eval_str("s").unwrap();
        vm.display(value)
    };
    let second = {
        let value = vm.eval_str("s").unwrap();
        vm.display(value)
    };
    assert_eq!(first, second);
}

#[test]
fn test_gc_strategy_can_change_at_runtime() {
    let mut vm = Vm::new();
    vm.set_gc_strategy(GcStrategy::Manual);
    vm.eval_str("(define (count n) (if (< n 1) 0 (count (- n 1))))").unwrap();
    assert_eq!(vm.eval_str("(count 600)").unwrap(), Value::Int(0));
    vm.set_gc_strategy(GcStrategy::Per256Calls);
    assert_eq!(vm.eval_str("(count 600)").unwrap(), Value::Int(0));
}

//! Module import scenarios backed by real files in a temp directory.

use std::fs;

use fizz::{ErrorKind, Value, Vm};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn import_source(dir: &TempDir, file: &str) -> String {
    format!("(import \"{}\")", dir.path().join(file).display())
}

fn module_names(vm: &mut Vm) -> Vec<String> {
    let listed = vm.eval_str("(*modules*)").unwrap();
    vm.list_elements(listed)
        .unwrap()
        .iter()
        .map(|name| vm.str_content(*name).unwrap().to_owned())
        .collect()
}

#[test]
fn test_import_and_qualified_access() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("aux.fizz"), "(define x 42)").unwrap();

    let mut vm = Vm::new();
    vm.eval_str(&import_source(&dir, "aux.fizz")).unwrap();
    assert_eq!(vm.eval_str("(aux/x)").unwrap(), Value::Int(42));
    assert_eq!(vm.eval_str("aux/x").unwrap(), Value::Int(42));
}

#[test]
fn test_modules_listing_contains_global_and_import() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("aux.fizz"), "(define x 42)").unwrap();

    let mut vm = Vm::new();
    vm.eval_str(&import_source(&dir, "aux.fizz")).unwrap();
    let names = module_names(&mut vm);
    assert_eq!(names[0], "*global*");
    assert!(
        names.iter().any(|name| name.ends_with("aux.fizz")),
        "expected the canonical module path in {names:?}"
    );
}

#[test]
fn test_imported_functions_run_in_their_own_module() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("geometry.fizz"),
        "(define (area w h) (* w h)) (define two 2)",
    )
    .unwrap();
    fs::write(
        dir.path().join("shapes.fizz"),
        "(import \"geometry.fizz\") (define (double-area w h) (* geometry/two (geometry/area w h)))",
    )
    .unwrap();

    let mut vm = Vm::new();
    vm.eval_str(&import_source(&dir, "shapes.fizz")).unwrap();
    assert_eq!(vm.eval_str("(shapes/double-area 3 4)").unwrap(), Value::Int(24));
}

#[test]
fn test_reimport_reuses_the_registered_module() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("aux.fizz"), "(define x 42)").unwrap();

    let mut vm = Vm::new();
    vm.eval_str(&import_source(&dir, "aux.fizz")).unwrap();
    let first = module_names(&mut vm);
    vm.eval_str(&import_source(&dir, "aux.fizz")).unwrap();
    assert_eq!(module_names(&mut vm), first);
    assert_eq!(vm.eval_str("(aux/x)").unwrap(), Value::Int(42));
}

#[test]
fn test_missing_file_is_a_file_error() {
    let dir = TempDir::new().unwrap();
    let mut vm = Vm::new();
    let err = vm.eval_str(&import_source(&dir, "absent.fizz")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileError);
}

#[test]
fn test_failed_import_deletes_the_partial_module() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.fizz"), "(define x").unwrap();

    let mut vm = Vm::new();
    let err = vm.eval_str(&import_source(&dir, "broken.fizz")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
    let names = module_names(&mut vm);
    assert!(
        !names.iter().any(|name| name.ends_with("broken.fizz")),
        "partial module should be deleted, got {names:?}"
    );
    assert_eq!(vm.eval_str("(broken/x)").unwrap_err().kind(), ErrorKind::SymbolNotFound);
}

#[test]
fn test_import_size_cap_is_enforced() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("big.fizz"), "(define x 1) ;; padded\n".repeat(64)).unwrap();

    let mut vm = Vm::new();
    vm.set_import_limit(16);
    let err = vm.eval_str(&import_source(&dir, "big.fizz")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileError);
}

#[test]
fn test_unknown_alias_is_symbol_not_found() {
    let mut vm = Vm::new();
    assert_eq!(vm.eval_str("nowhere/x").unwrap_err().kind(), ErrorKind::SymbolNotFound);
}

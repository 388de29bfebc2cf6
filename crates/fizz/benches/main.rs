use criterion::{Criterion, criterion_group, criterion_main};
use fizz::Vm;

fn bench_fib(c: &mut Criterion) {
    let mut vm = Vm::new();
    vm.eval_str("(define (fib n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))")
        .unwrap();
    c.bench_function("fib 15", |b| {
        b.iter(|| vm.eval_str("(fib 15)").unwrap());
    });
}

fn bench_map_filter(c: &mut Criterion) {
    let mut vm = Vm::new();
    vm.eval_str("(define lst (list 1 2 3 4 5 6 7 8 9 10))").unwrap();
    c.bench_function("map+filter", |b| {
        b.iter(|| {
            vm.eval_str("(filter (lambda (n) (< n 6)) (map (lambda (n) (+ n 1)) lst))")
                .unwrap()
        });
    });
}

fn bench_struct_roundtrip(c: &mut Criterion) {
    let mut vm = Vm::new();
    vm.eval_str("(define s (struct 'a 1 'b 2))").unwrap();
    c.bench_function("struct get/set", |b| {
        b.iter(|| {
            vm.eval_str("(do (struct-set! s 'a (+ (struct-get s 'a) 1)) (struct-get s 'a))")
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_fib, bench_map_filter, bench_struct_roundtrip);
criterion_main!(benches);

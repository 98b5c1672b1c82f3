use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use plzero::compile_source_silent;
use plzero::vm::Vm;

const FACTORIAL: &str = "var n, f; begin n := 12; f := 1; \
                         while n > 1 do begin f := f * n; n := n - 1 end; \
                         write f end.";

const NESTED: &str = "var x; \
                      procedure outer; \
                        procedure inner; x := x + 1; \
                        begin call inner; call inner end; \
                      begin x := 0; \
                        while x < 50 do call outer \
                      end.";

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_factorial", |b| {
        b.iter(|| compile_source_silent(black_box(FACTORIAL)).unwrap())
    });
    c.bench_function("compile_nested", |b| {
        b.iter(|| compile_source_silent(black_box(NESTED)).unwrap())
    });
}

fn bench_execute(c: &mut Criterion) {
    let code = compile_source_silent(FACTORIAL).unwrap();
    c.bench_function("run_factorial", |b| {
        b.iter(|| {
            let mut vm = Vm::new(&code);
            let mut output = Vec::new();
            vm.run(&mut "".as_bytes(), &mut output).unwrap();
            output
        })
    });
}

criterion_group!(benches, bench_compile, bench_execute);
criterion_main!(benches);

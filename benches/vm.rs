mod common;

use std::io;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use minic::vm::Vm;
use minic::{bytecode, lexer, parser, semantics};

fn bench_vm(c: &mut Criterion) {
    for (label, source) in common::workloads() {
        let (program, errors) = parser::parse_tokens(lexer::tokenize(source));
        assert!(errors.is_empty(), "workload must parse: {errors:?}");
        let semantic_errors = semantics::analyze(&program);
        assert!(
            semantic_errors.is_empty(),
            "workload must check: {semantic_errors:?}"
        );
        let code = bytecode::generate(&program);

        c.bench_function(&format!("vm_generate_{label}"), |b| {
            b.iter(|| {
                let out = bytecode::generate(black_box(&program));
                black_box(out);
            })
        });

        c.bench_function(&format!("vm_execute_{label}"), |b| {
            b.iter(|| {
                let mut vm = Vm::new(black_box(&code));
                let mut input = io::empty();
                let mut output = io::sink();
                vm.run(&mut input, &mut output).expect("vm run");
            })
        });
    }
}

criterion_group!(benches, bench_vm);
criterion_main!(benches);

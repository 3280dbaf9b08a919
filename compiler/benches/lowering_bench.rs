//! Benchmarks for module lowering

use compiler::driver::{lower_module, lower_modules_parallel, TypedModule};
use compiler::tast::builder::TastBuilder;
use compiler::tast::*;
use compiler::LoweringConfig;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// A chain of open classes, each adding one function and one property,
/// so every level inherits everything above it
fn generate_deep_inheritance(depth: usize) -> TypedModule {
    let mut b = TastBuilder::new();
    let mut declarations = Vec::with_capacity(depth);
    let mut parent: Option<SymbolId> = None;

    for i in 0..depth {
        let mut class = b.class(&format!("Level{}", i));
        class.modality = Modality::Open;
        if let Some(parent) = parent {
            class.supertypes.push(TypeRef::class(parent));
        }
        let mut method = b.function(&format!("method{}", i), TypeRef::int());
        method.modality = Modality::Open;
        let ret = b.ret(Some(method.symbol_id), None, Some(b.int(i as i64)));
        method.body = Some(TypedBlock::new(vec![b.expr(ret)]));
        class.members.push(TypedDeclaration::Function(method));

        let mut field = b.property(&format!("field{}", i), TypeRef::int(), true);
        field.initializer = Some(b.int(i as i64));
        class.members.push(TypedDeclaration::Property(field));

        parent = Some(class.symbol_id);
        declarations.push(TypedDeclaration::Class(class));
    }

    let file = b.file("inheritance.kt", declarations);
    TypedModule::new("inheritance", vec![file])
}

/// One function per file calling the function of the previous file
fn generate_many_functions(count: usize) -> TypedModule {
    let mut b = TastBuilder::new();
    let mut files = Vec::with_capacity(count);
    let mut previous: Option<SymbolId> = None;

    for i in 0..count {
        let mut function = b.function(&format!("step{}", i), TypeRef::int());
        let mut statements = Vec::new();
        let local = b.variable("acc", TypeRef::int(), Some(b.int(i as i64)));
        let read = b.read(&local);
        statements.push(TypedStatement::Variable(local));
        let value = match previous {
            Some(callee) => b.call(callee, &format!("step{}", i - 1), Vec::new(), TypeRef::int()),
            None => read,
        };
        statements.push(b.expr(b.ret(Some(function.symbol_id), None, Some(value))));
        function.body = Some(TypedBlock::new(statements));

        previous = Some(function.symbol_id);
        files.push(b.file(&format!("step{}.kt", i), vec![TypedDeclaration::Function(function)]));
    }

    TypedModule::new("functions", files)
}

fn benchmark_inheritance(c: &mut Criterion) {
    let mut group = c.benchmark_group("fake_overrides");
    let config = LoweringConfig::default();

    for depth in [10, 20, 50].iter() {
        let module = generate_deep_inheritance(*depth);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &module, |b, module| {
            b.iter(|| {
                let lowered = lower_module(black_box(module), &config);
                black_box(lowered)
            });
        });
    }

    group.finish();
}

fn benchmark_function_bodies(c: &mut Criterion) {
    let mut group = c.benchmark_group("function_bodies");
    let config = LoweringConfig {
        validate: false,
        ..LoweringConfig::default()
    };

    for count in [100, 500, 1000].iter() {
        let module = generate_many_functions(*count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &module, |b, module| {
            b.iter(|| {
                let lowered = lower_module(black_box(module), &config);
                black_box(lowered)
            });
        });
    }

    group.finish();
}

fn benchmark_parallel_modules(c: &mut Criterion) {
    let modules: Vec<TypedModule> = (0..8).map(|_| generate_deep_inheritance(20)).collect();
    let config = LoweringConfig::default();

    c.bench_function("parallel_modules", |b| {
        b.iter(|| black_box(lower_modules_parallel(black_box(&modules), &config)));
    });
}

criterion_group!(
    benches,
    benchmark_inheritance,
    benchmark_function_bodies,
    benchmark_parallel_modules
);
criterion_main!(benches);

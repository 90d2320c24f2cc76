use criterion::{black_box, criterion_group, criterion_main, Criterion};
use evalexpr::*;
use formula_rs::{Evaluator, Value};

/// Benchmark simple arithmetic expressions
fn benchmark_simple_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("Simple arithmetic Expression Evaluation");

    let mut evaluator = Evaluator::new();

    let expr = "2 + 3 * 4";
    let converted = evaluator.convert(expr).unwrap();
    let precompiled_evalexpr = build_operator_tree::<DefaultNumericTypes>(expr).unwrap();

    group.bench_function("converted_arithmetic", |b| {
        b.iter(|| evaluator.evaluate(black_box(expr)).unwrap())
    });

    group.bench_function("preconverted_arithmetic", |b| {
        b.iter(|| evaluator.execute(black_box(&converted)).unwrap())
    });

    group.bench_function("native_rust_arithmetic", |b| {
        b.iter(|| black_box(2.0 + 3.0 * 4.0))
    });

    group.bench_function("meval_arithmetic", |b| {
        b.iter(|| meval::eval_str(black_box(expr)).unwrap())
    });

    group.bench_function("evalexpr_arithmetic", |b| {
        b.iter(|| evalexpr::eval(black_box(expr)).unwrap())
    });

    group.bench_function("precompiled_evalexpr_arithmetic", |b| {
        b.iter(|| precompiled_evalexpr.eval().unwrap())
    });
}

/// Benchmark complex arithmetic expressions
fn benchmark_complex_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("Complex arithmetic Expression Evaluation");

    let mut evaluator = Evaluator::new();

    let expr = "(10 + 20) * 3 / (4 - 1) + 5 ^ 2 ^ 0.5";
    let converted = evaluator.convert(expr).unwrap();

    group.bench_function("converted_complex_arithmetic", |b| {
        b.iter(|| evaluator.evaluate(black_box(expr)).unwrap())
    });

    group.bench_function("preconverted_complex_arithmetic", |b| {
        b.iter(|| evaluator.execute(black_box(&converted)).unwrap())
    });

    group.bench_function("meval_complex_arithmetic", |b| {
        b.iter(|| meval::eval_str(black_box(expr)).unwrap())
    });
}

/// Benchmark logical expressions
fn benchmark_logic_expressions(c: &mut Criterion) {
    let mut group = c.benchmark_group("Logic Expression Evaluation");
    let mut evaluator = Evaluator::new();

    let expr = "true && false || true";
    let converted = evaluator.convert(expr).unwrap();
    let precompiled_evalexpr = build_operator_tree::<DefaultNumericTypes>(expr).unwrap();

    group.bench_function("converted_logic_expression", |b| {
        b.iter(|| evaluator.evaluate(black_box(expr)).unwrap())
    });

    group.bench_function("preconverted_logic_expression", |b| {
        b.iter(|| evaluator.execute(black_box(&converted)).unwrap())
    });

    group.bench_function("native_rust_logic_expression", |b| {
        b.iter(|| black_box(true && false || true))
    });

    group.bench_function("precompiled_evalexpr_logic_expression", |b| {
        b.iter(|| precompiled_evalexpr.eval().unwrap())
    });
}

/// Benchmark array and object access
fn benchmark_index_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("Index Access Evaluation");
    let mut evaluator = Evaluator::new();
    evaluator.evaluate(r#"data = {"values": [1, 2, 42]}"#).unwrap();

    let expr = r#"data["values"][2]"#;
    let converted = evaluator.convert(expr).unwrap();

    group.bench_function("converted_index_access", |b| {
        b.iter(|| evaluator.evaluate(black_box(expr)).unwrap())
    });

    group.bench_function("preconverted_index_access", |b| {
        b.iter(|| evaluator.execute(black_box(&converted)).unwrap())
    });
}

/// Benchmark function calls
fn benchmark_function_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("Function Call Evaluation");
    let mut evaluator = Evaluator::new();

    evaluator
        .register_native_function("square", |x: f64| -> Result<Value, String> {
            Ok(Value::Number(x * x))
        })
        .unwrap();
    evaluator.evaluate("cube(x) = x * x * x").unwrap();

    let native = evaluator.convert("square(4)").unwrap();
    let user = evaluator.convert("cube(4)").unwrap();

    group.bench_function("preconverted_native_function_call", |b| {
        b.iter(|| evaluator.execute(black_box(&native)).unwrap())
    });

    group.bench_function("preconverted_user_function_call", |b| {
        b.iter(|| evaluator.execute(black_box(&user)).unwrap())
    });

    group.bench_function("native_rust_function_call", |b| {
        b.iter(|| black_box(4.0 * 4.0))
    });
}

/// Benchmark regex matching with a warm pattern cache
fn benchmark_regex_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("Regex Match Evaluation");
    let mut evaluator = Evaluator::new();

    let converted = evaluator
        .convert(r#""Foo,Bar" =~ /^([fo]+),(bar)$/i"#)
        .unwrap();

    group.bench_function("preconverted_regex_match", |b| {
        b.iter(|| evaluator.execute(black_box(&converted)).unwrap())
    });
}

/// Grouping benchmarks
criterion_group!(
    benches,
    benchmark_simple_arithmetic,
    benchmark_complex_arithmetic,
    benchmark_logic_expressions,
    benchmark_index_access,
    benchmark_function_calls,
    benchmark_regex_match,
);
criterion_main!(benches);

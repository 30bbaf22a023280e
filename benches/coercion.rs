//! Cell coercion, promoted arithmetic and jagged-array flattening.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

use rust_data_tools::processing::arithmetic::add;
use rust_data_tools::processing::coerce::{format_canonical, get_as, parse_as};
use rust_data_tools::processing::{reduce_cells, ArrayNode, ReduceOp};
use rust_data_tools::types::{DataType, Value};

fn bench_coercion(c: &mut Criterion) {
    let texts: Vec<Value> = (0..10_000).map(|i| Value::Utf8(format!("{}.{:02}", i, i % 100))).collect();
    let floats: Vec<Value> = (0..10_000).map(|i| Value::Float64(i as f64 + 0.5)).collect();

    c.bench_function("coerce/text_to_decimal", |b| {
        b.iter(|| {
            for v in &texts {
                black_box(get_as::<Decimal>(v).unwrap());
            }
        })
    });
    c.bench_function("coerce/float_to_i32_rounded", |b| {
        b.iter(|| {
            for v in &floats {
                black_box(get_as::<i32>(v).unwrap());
            }
        })
    });
    c.bench_function("coerce/parse_and_format_datetime", |b| {
        b.iter(|| {
            let v = parse_as("2024-02-29T23:59:59.125", DataType::DateTime).unwrap();
            black_box(format_canonical(&v).unwrap())
        })
    });
    c.bench_function("arithmetic/mixed_add", |b| {
        b.iter(|| {
            let mut total = Value::Null;
            for (i, v) in floats.iter().enumerate() {
                let lhs = if i % 2 == 0 { Value::Int32(i as i32) } else { v.clone() };
                total = add(&total, &lhs).unwrap();
            }
            black_box(total)
        })
    });
}

fn bench_flatten(c: &mut Criterion) {
    let rows: Vec<Option<Vec<Value>>> = (0..1_000)
        .map(|i| (i % 10 != 0).then(|| (0..i % 50).map(Value::Int64).collect()))
        .collect();
    let jagged = ArrayNode::jagged(rows);

    c.bench_function("flatten/jagged_sum", |b| {
        b.iter(|| black_box(reduce_cells(jagged.leaves(), ReduceOp::Sum, true).unwrap()))
    });
}

criterion_group!(benches, bench_coercion, bench_flatten);
criterion_main!(benches);

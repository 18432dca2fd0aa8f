// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Serialization Benchmark
//!
//! Measures save/load throughput over a descriptor-driven object graph:
//! - JSON save (compact and pretty)
//! - JSON load (with the array counting pre-pass)
//! - Binary save/load

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dynser::{
    load_binary, load_json, save_binary, save_json, BasicKind, ClassBuilder, Instance,
    TypeDescriptor, WriteBuffer, FORMAT_OUTPUT,
};
use std::hint::black_box as bb;
use std::sync::Arc;

fn scene_type() -> Arc<TypeDescriptor> {
    let point = ClassBuilder::new("Point")
        .field("x", &TypeDescriptor::basic(BasicKind::F32))
        .field("y", &TypeDescriptor::basic(BasicKind::F32))
        .field("z", &TypeDescriptor::basic(BasicKind::F32))
        .build();
    let list = TypeDescriptor::template("list<Point>", point, false);
    ClassBuilder::new("Scene")
        .field("id", &TypeDescriptor::basic(BasicKind::U64))
        .field("points", &list)
        .build()
}

fn scene_instance(ty: &Arc<TypeDescriptor>, count: usize) -> Instance {
    let mut inst = Instance::new(ty);
    inst.set_field("id", 7u64).expect("set id");
    let handle = inst.make_container("points", count).expect("make points");
    for i in 0..count {
        let at = inst.element_addr(handle, i);
        inst.set_at(at.at(0), i as f32);
        inst.set_at(at.at(4), (i * 2) as f32);
        inst.set_at(at.at(8), (i * 3) as f32);
    }
    inst
}

fn bench_save_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_json");
    let ty = scene_type();

    for count in [16usize, 256, 4096] {
        let mut inst = scene_instance(&ty, count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let mut out = WriteBuffer::with_capacity(count * 32);
                save_json(&mut out, &mut inst, None, 0);
                bb(out.len())
            });
        });
    }
    group.finish();
}

fn bench_save_json_pretty(c: &mut Criterion) {
    let ty = scene_type();
    let mut inst = scene_instance(&ty, 256);
    c.bench_function("save_json_pretty_256", |b| {
        b.iter(|| {
            let mut out = WriteBuffer::with_capacity(256 * 40);
            save_json(&mut out, &mut inst, None, FORMAT_OUTPUT);
            bb(out.len())
        });
    });
}

fn bench_load_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_json");
    let ty = scene_type();

    for count in [16usize, 256, 4096] {
        let mut inst = scene_instance(&ty, count);
        let mut out = WriteBuffer::new();
        save_json(&mut out, &mut inst, None, 0);
        let text = out.into_bytes();

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let mut dest = Instance::new(&ty);
                load_json(&text, &mut dest).expect("load should succeed");
                bb(dest.root())
            });
        });
    }
    group.finish();
}

fn bench_binary(c: &mut Criterion) {
    let ty = scene_type();
    let mut inst = scene_instance(&ty, 256);

    c.bench_function("save_binary_256", |b| {
        b.iter(|| {
            let mut out = WriteBuffer::with_capacity(256 * 12 + 16);
            save_binary(&mut out, &mut inst, None);
            bb(out.len())
        });
    });

    let mut out = WriteBuffer::new();
    save_binary(&mut out, &mut inst, None);
    let bytes = out.into_bytes();
    c.bench_function("load_binary_256", |b| {
        b.iter(|| {
            let mut dest = Instance::new(&ty);
            load_binary(&bytes, &mut dest).expect("decode should succeed");
            bb(dest.root())
        });
    });
}

criterion_group!(
    benches,
    bench_save_json,
    bench_save_json_pretty,
    bench_load_json,
    bench_binary
);
criterion_main!(benches);

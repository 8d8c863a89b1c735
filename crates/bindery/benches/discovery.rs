use std::sync::Arc;

use bindery::{discover_public_methods, export_methods, export_type, Class, Dependencies, Value};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn hierarchy(depth: usize, methods_per_level: usize) -> Arc<Class> {
    let mut class = Class::builder("Level0");
    for m in 0..methods_per_level {
        class = class.method(format!("method{m}"), |_, _| Ok(Value::Null));
    }
    let mut current = class.build();
    for level in 1..depth {
        let mut builder = Class::builder(format!("Level{level}")).extends(&current);
        for m in 0..methods_per_level {
            // every other name overrides the parent's
            let name = if m % 2 == 0 {
                format!("method{m}")
            } else {
                format!("level{level}_method{m}")
            };
            builder = builder.method(name, |_, _| Ok(Value::Null));
        }
        current = builder.build();
    }
    current
}

fn bench_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("discover_public_methods");

    for depth in [1, 4, 16] {
        let instance = hierarchy(depth, 8).construct(&[]).unwrap();
        group.bench_with_input(BenchmarkId::new("depth", depth), &instance, |b, instance| {
            b.iter(|| discover_public_methods(black_box(instance)));
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let class = hierarchy(4, 8);
    let instance = class.construct(&[]).unwrap();

    c.bench_function("export_methods", |b| {
        b.iter(|| export_methods(black_box(&instance)));
    });

    c.bench_function("export_type", |b| {
        let exporter = export_type(Dependencies::none());
        b.iter(|| exporter.export_class(black_box(&class)).unwrap());
    });
}

criterion_group!(benches, bench_discovery, bench_export);
criterion_main!(benches);

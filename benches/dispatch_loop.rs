//! Benchmarks for the dispatch loop end to end.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use packetgraph::frame::FramePool;
use packetgraph::{DispatchConfig, Dispatcher, NodeCategory, NodeDescriptor, NodeRegistry};
use std::sync::Arc;

fn build_dispatcher(config: DispatchConfig, packets_per_pass: u32) -> Dispatcher {
    let size_class = config.frame_size_classes[0];
    let mut registry = NodeRegistry::new();
    registry
        .register(
            NodeDescriptor::new(
                "source",
                NodeCategory::Input,
                size_class,
                Box::new(move |ctx| {
                    for i in 0..packets_per_pass {
                        ctx.enqueue(0, size_class, i);
                    }
                    Ok(packets_per_pass)
                }),
            )
            .with_next("ip4-lookup"),
        )
        .unwrap();
    registry
        .register(
            NodeDescriptor::new("ip4-lookup", NodeCategory::Internal, size_class, Box::new(|ctx| {
                Ok(ctx.input_vectors().len() as u32)
            }))
            .with_next("ethernet-output"),
        )
        .unwrap();
    registry
        .register(NodeDescriptor::new("ethernet-output", NodeCategory::Internal, size_class, Box::new(|ctx| {
            Ok(ctx.input_vectors().len() as u32)
        })))
        .unwrap();

    let pool = FramePool::new(config.frame_size_classes.clone(), false);
    let graph = Arc::new(registry.finalize_arcs(&pool).unwrap());
    Dispatcher::new(config, graph)
}

fn bench_single_arc_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_loop_single_arc");
    group.throughput(Throughput::Elements(256));

    for packets in [1u32, 64, 256] {
        group.bench_with_input(BenchmarkId::new("dispatch_interrupt", packets), &packets, |b, &packets| {
            b.iter(|| {
                let mut dispatcher = build_dispatcher(DispatchConfig::minimal(), packets);
                dispatcher.dispatch_interrupt(0).unwrap();
                black_box(dispatcher.runtimes().get(2).stats.vectors.get());
            })
        });
    }

    group.finish();
}

fn bench_repeated_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_loop_repeated_passes");

    group.bench_function("100_interrupt_passes_of_64_packets", |b| {
        b.iter(|| {
            let mut dispatcher = build_dispatcher(DispatchConfig::minimal(), 64);
            for _ in 0..100 {
                dispatcher.dispatch_interrupt(0).unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_single_arc_dispatch, bench_repeated_passes);
criterion_main!(benches);

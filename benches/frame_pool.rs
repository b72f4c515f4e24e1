//! Benchmarks for the frame pool and next-frame table.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use packetgraph::frame::FramePool;
use packetgraph::nextframe::NextFrameTable;
use packetgraph::pending::PendingQueue;

const SIZE_CLASS: (usize, usize) = (0, 256);

fn bench_alloc_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_pool_alloc_free");

    group.bench_function("alloc_then_free_1000x", |b| {
        b.iter(|| {
            let mut pool = FramePool::new([SIZE_CLASS], false);
            for _ in 0..1000 {
                let idx = pool.alloc_to(SIZE_CLASS);
                black_box(idx);
                pool.free(idx);
            }
        })
    });

    group.bench_function("alloc_100x_then_free_all", |b| {
        b.iter(|| {
            let mut pool = FramePool::new([SIZE_CLASS], false);
            let mut indices = Vec::with_capacity(100);
            for _ in 0..100 {
                indices.push(pool.alloc_to(SIZE_CLASS));
            }
            for idx in indices {
                pool.free(idx);
            }
        })
    });

    group.finish();
}

fn bench_next_frame_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_frame_table_append");
    group.throughput(Throughput::Elements(256));

    for slots in [1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::new("append_256_packets", slots), &slots, |b, &slots| {
            b.iter(|| {
                let mut pool = FramePool::new([SIZE_CLASS], false);
                let mut pending = PendingQueue::new();
                let mut table = NextFrameTable::new(slots);
                for i in 0..256u32 {
                    let slot = (i as usize) % slots;
                    table.set_next_frame_buffer(&mut pool, &mut pending, slot, slot as u32, 0, slot as u32, SIZE_CLASS, i);
                }
                black_box(pending.len());
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_alloc_free, bench_next_frame_append);
criterion_main!(benches);

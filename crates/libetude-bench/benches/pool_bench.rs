//! Memory pool allocator benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use libetude_pool::Pool;

fn bench_alloc_free_cycle(c: &mut Criterion) {
    let sizes: &[usize] = &[16, 64, 256, 1024, 4096, 32768];
    let mut group = c.benchmark_group("pool_alloc_free_cycle");

    for &size in sizes {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("libetude_pool", size), &size, |b, &sz| {
            let mut pool = Pool::create(1 << 20, 32).unwrap();
            b.iter(|| {
                let handle = pool.alloc(sz).unwrap();
                pool.free(handle).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_alloc_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_alloc_burst");

    group.bench_function("1000x64B_no_free", |b| {
        b.iter(|| {
            let mut pool = Pool::create(1 << 20, 32).unwrap();
            for _ in 0..1000 {
                black_box(pool.alloc(64).unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_alloc_free_cycle, bench_alloc_burst);
criterion_main!(benches);

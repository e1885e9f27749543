//! Tensor linear-algebra and reduction benchmarks.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use libetude_pool::Pool;
use libetude_tensor::{DType, Shape, Tensor};
use parking_lot::Mutex;

fn square_tensor(pool: &Arc<Mutex<Pool>>, n: usize) -> Tensor {
    let t = Tensor::zeros(Arc::clone(pool), Shape::new(vec![n, n]), DType::Float32).unwrap();
    for r in 0..n {
        for c in 0..n {
            t.set_f32(&[r, c], ((r + c) % 7) as f32);
        }
    }
    t
}

fn bench_matmul(c: &mut Criterion) {
    let sizes: &[usize] = &[8, 32, 64, 128];
    let mut group = c.benchmark_group("tensor_matmul");

    for &n in sizes {
        group.throughput(Throughput::Elements((n * n * n) as u64));
        group.bench_with_input(BenchmarkId::new("square", n), &n, |b, &n| {
            let pool = Arc::new(Mutex::new(Pool::create(64 << 20, 32).unwrap()));
            let a = square_tensor(&pool, n);
            let weight = square_tensor(&pool, n);
            b.iter(|| black_box(a.matmul(&weight).unwrap()));
        });
    }
    group.finish();
}

fn bench_sum_reduction(c: &mut Criterion) {
    let sizes: &[usize] = &[64, 256, 1024];
    let mut group = c.benchmark_group("tensor_sum");

    for &n in sizes {
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("axis0", n), &n, |b, &n| {
            let pool = Arc::new(Mutex::new(Pool::create(64 << 20, 32).unwrap()));
            let a = square_tensor(&pool, n);
            b.iter(|| black_box(a.sum(Some(0), false).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_matmul, bench_sum_reduction);
criterion_main!(benches);

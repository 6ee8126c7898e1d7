use criterion::{criterion_group, criterion_main, Criterion, Throughput, black_box};
use int8gemm::quantize::{quantize, quantize_u};
use int8gemm::{DefaultArch, Generic};

fn make_input(n: usize) -> Vec<f32> {
    let mut seed = 0x1234_5678_9abc_def0u64;
    (0..n)
        .map(|_| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((seed >> 40) as f32 / (1u64 << 24) as f32) * 4.0 - 2.0 // [-2,2)
        })
        .collect()
}

fn bench_quantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantize");
    for &n in &[4096usize, 65536] {
        let input = make_input(n);
        let mut out_i8 = vec![0i8; n];
        let mut out_u8 = vec![0u8; n];
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("default_{}", n), |ben| {
            ben.iter(|| quantize::<DefaultArch>(black_box(&input), &mut out_i8, 63.5))
        });
        group.bench_function(format!("default_unsigned_{}", n), |ben| {
            ben.iter(|| quantize_u::<DefaultArch>(black_box(&input), &mut out_u8, 63.5))
        });
        group.bench_function(format!("generic_{}", n), |ben| {
            ben.iter(|| quantize::<Generic>(black_box(&input), &mut out_i8, 63.5))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_quantize);
criterion_main!(benches);

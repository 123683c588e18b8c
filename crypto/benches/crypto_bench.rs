use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn fingerprint_1kb_bench(c: &mut Criterion) {
    let data = vec![0xCDu8; 1024];

    c.bench_function("sha256_fingerprint_1KB", |b| {
        b.iter(|| docchain_crypto::fingerprint(black_box(&data)))
    });
}

fn fingerprint_1mb_bench(c: &mut Criterion) {
    let data = vec![0xABu8; 1024 * 1024];

    c.bench_function("sha256_fingerprint_1MB", |b| {
        b.iter(|| docchain_crypto::fingerprint(black_box(&data)))
    });
}

fn fingerprint_reader_1mb_bench(c: &mut Criterion) {
    let data = vec![0xEFu8; 1024 * 1024];

    c.bench_function("sha256_fingerprint_reader_1MB", |b| {
        b.iter(|| docchain_crypto::fingerprint_reader(black_box(&data[..])).unwrap())
    });
}

criterion_group!(
    benches,
    fingerprint_1kb_bench,
    fingerprint_1mb_bench,
    fingerprint_reader_1mb_bench,
);
criterion_main!(benches);

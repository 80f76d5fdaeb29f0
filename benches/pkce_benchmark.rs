use criterion::{black_box, criterion_group, criterion_main, Criterion};
use waveframe::services::pkce::{challenge_for, PkcePair};

fn benchmark_pkce(c: &mut Criterion) {
    let mut group = c.benchmark_group("pkce");

    group.bench_function("generate_pair", |b| b.iter(PkcePair::generate));

    // Challenge derivation alone, over a fixed verifier
    let pair = PkcePair::generate().expect("PKCE generation failed");
    group.bench_function("challenge_for_verifier", |b| {
        b.iter(|| challenge_for(black_box(&pair.code_verifier)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_pkce);
criterion_main!(benches);

use casefile::{Casefile, CasefileConfig};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use extsort::{sort_casefile, SortConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use tempfile::tempdir;

const N: usize = 50_000;
const CASE_SIZE: usize = 32;

fn random_cases() -> Vec<[u8; CASE_SIZE]> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..N)
        .map(|_| {
            let mut c = [0u8; CASE_SIZE];
            rng.fill(&mut c[..]);
            c
        })
        .collect()
}

fn load(cases: &[[u8; CASE_SIZE]], config: CasefileConfig) -> Casefile {
    let mut cf = Casefile::with_config(CASE_SIZE, config);
    for c in cases {
        cf.append(c).unwrap();
    }
    cf
}

fn sort_in_memory(c: &mut Criterion) {
    let cases = random_cases();
    c.bench_function("sort_in_memory_50k", |b| {
        b.iter_batched(
            || load(&cases, CasefileConfig::default()),
            |mut cf| {
                sort_casefile(&mut cf, |a, b| a.cmp(b), &SortConfig::default()).unwrap();
                black_box(cf.case_count());
            },
            BatchSize::LargeInput,
        );
    });
}

fn sort_external(c: &mut Criterion) {
    let cases = random_cases();
    c.bench_function("sort_external_50k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let config = CasefileConfig::default()
                    .with_workspace(256 * 1024)
                    .with_temp_dir(dir.path());
                let cf = load(&cases, config.clone());
                (dir, cf, SortConfig::from(&config))
            },
            |(_dir, mut cf, config)| {
                sort_casefile(&mut cf, |a, b| a.cmp(b), &config).unwrap();
                black_box(cf.case_count());
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, sort_in_memory, sort_external);
criterion_main!(benches);

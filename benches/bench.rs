// Criterion benchmarks for SkillMatch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use skillmatch::core::{summarize, JobCatalog};
use skillmatch::models::{Experience, UserProfile};
use skillmatch::services::{codec, CacheKey};
use std::collections::BTreeSet;

fn create_profile(skills: usize, jobs: usize) -> UserProfile {
    let mut profile = UserProfile::new_default("bench_user", "bench@example.com");
    profile.skills = (0..skills).map(|i| format!("Skill {}", i)).collect();
    profile.experience = (0..skills / 2)
        .map(|i| Experience {
            title: format!("Intern {}", i),
            company: format!("Company {}", i),
            ..Experience::default()
        })
        .collect();
    profile.saved_job_ids = (1..=jobs as u32).collect();
    profile.applied_job_ids = (1..=jobs as u32).step_by(2).collect();
    profile
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");

    for skill_count in [0, 5, 20, 100].iter() {
        let profile = create_profile(*skill_count, 0);
        group.bench_with_input(
            BenchmarkId::new("profile_summary", skill_count),
            skill_count,
            |b, _| {
                b.iter(|| summarize(black_box(&profile)));
            },
        );
    }

    group.finish();
}

fn bench_match_cache_key(c: &mut Criterion) {
    let summary = summarize(&create_profile(20, 0));

    c.bench_function("match_cache_key", |b| {
        b.iter(|| {
            let digest = CacheKey::profile_digest(black_box(&summary));
            CacheKey::match_result(&digest, black_box(3))
        });
    });
}

fn bench_catalog(c: &mut Criterion) {
    let catalog = JobCatalog::default();
    let ids: BTreeSet<u32> = [1, 3, 5, 42].into_iter().collect();

    c.bench_function("catalog_lookup", |b| {
        b.iter(|| {
            for id in 0..8 {
                black_box(catalog.get(black_box(id)));
            }
        });
    });

    c.bench_function("catalog_select", |b| {
        b.iter(|| catalog.select(black_box(&ids)));
    });
}

fn bench_document_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_codec");

    for job_count in [0, 10, 100].iter() {
        let profile = create_profile(10, *job_count);
        let plain = serde_json::to_value(&profile).unwrap();
        let encoded = codec::encode_fields(plain.as_object().unwrap());

        group.bench_with_input(BenchmarkId::new("encode", job_count), job_count, |b, _| {
            b.iter(|| codec::encode_fields(black_box(plain.as_object().unwrap())));
        });

        group.bench_with_input(BenchmarkId::new("decode", job_count), job_count, |b, _| {
            b.iter(|| codec::decode_fields(black_box(Some(&encoded))).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_summarize,
    bench_match_cache_key,
    bench_catalog,
    bench_document_codec
);

criterion_main!(benches);

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use ner_validator::{
    cohen_kappa, compute_agreement, pivot, CombinedRow, CombinedTable, ANNOTATOR_COLUMN,
    INDEX_COLUMN, SUBSET_COLUMN,
};
use std::collections::BTreeMap;

const TAGS: [&str; 5] = ["O", "B-PER", "I-PER", "B-LOC", "I-LOC"];

/// Deterministic tags: annotator `seed` agrees with the others on most positions.
fn tags(index: usize, len: usize, seed: usize) -> Vec<String> {
    (0..len)
        .map(|i| {
            let base = (index * 31 + i * 7) % TAGS.len();
            let noise = if (index + i + seed) % 9 == 0 { seed } else { 0 };
            String::from(TAGS[(base + noise) % TAGS.len()])
        })
        .collect()
}

fn build_table(samples: usize, annotators: usize, len: usize) -> CombinedTable {
    let timestamp = NaiveDate::from_ymd_opt(2024, 10, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap();
    let mut rows = Vec::with_capacity(samples * annotators);
    for annotator in 0..annotators {
        for index in 0..samples {
            rows.push(CombinedRow {
                index,
                subset: String::from("songs"),
                annotator: format!("annotator{}", annotator),
                timestamp,
                metadata: BTreeMap::new(),
                tokens: (0..len).map(|i| format!("t{}", i)).collect(),
                tags: tags(index, len, annotator),
            });
        }
    }
    CombinedTable::from(rows)
}

fn benchmark_small_project(c: &mut Criterion) {
    let combined = build_table(500, 3, 20);
    c.bench_function("small_project_agreement", |b| {
        b.iter(|| {
            let wide = pivot(&combined, &[SUBSET_COLUMN, INDEX_COLUMN], ANNOTATOR_COLUMN).unwrap();
            compute_agreement(&wide)
        })
    });
}

fn benchmark_large_project(c: &mut Criterion) {
    let combined = build_table(10_000, 5, 30);
    let wide = pivot(&combined, &[SUBSET_COLUMN, INDEX_COLUMN], ANNOTATOR_COLUMN).unwrap();
    c.bench_function("large_project_agreement", |b| {
        b.iter(|| compute_agreement(&wide))
    });
}

fn benchmark_kappa(c: &mut Criterion) {
    let a = tags(1, 100_000, 1);
    let b = tags(1, 100_000, 2);
    c.bench_function("cohen_kappa_100k", |bencher| {
        bencher.iter(|| cohen_kappa(a.iter().map(String::as_str).zip(b.iter().map(String::as_str))))
    });
}

criterion_group!(
    benches,
    benchmark_small_project,
    benchmark_large_project,
    benchmark_kappa
);
criterion_main!(benches);

//! Benchmarks for the LCS diff and patch application.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use memsh_diff::{DiffOptions, apply_hunks, diff_lines, parse_patch, split_lines, unified_diff};

/// `n` lines with every `stride`-th line rewritten in the second text.
fn texts(n: usize, stride: usize) -> (String, String) {
    let old: String = (0..n).map(|i| format!("line {i}\n")).collect();
    let new: String = (0..n)
        .map(|i| {
            if i % stride == 0 {
                format!("changed {i}\n")
            } else {
                format!("line {i}\n")
            }
        })
        .collect();
    (old, new)
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_lines");
    let opts = DiffOptions::default();

    for (n, stride) in [(100, 10), (1_000, 50), (1_000, 3)] {
        let (old, new) = texts(n, stride);
        let (a, b) = (split_lines(&old), split_lines(&new));
        let label = format!("{n}/every{stride}");
        group.bench_function(BenchmarkId::new("lcs", &label), |bench| {
            bench.iter(|| diff_lines(&a, &b, &opts));
        });
        group.bench_function(BenchmarkId::new("unified", &label), |bench| {
            bench.iter(|| unified_diff(&a, &b, "a", "b", 3, &opts));
        });
    }

    group.finish();
}

fn bench_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch_apply");

    for n in [100, 1_000] {
        let (old, new) = texts(n, 10);
        let diff = unified_diff(
            &split_lines(&old),
            &split_lines(&new),
            "a",
            "b",
            3,
            &DiffOptions::default(),
        );
        let files = parse_patch(&diff).unwrap();
        group.bench_function(BenchmarkId::new("apply", n), |bench| {
            bench.iter(|| apply_hunks(&old, &files[0].hunks, false).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_diff, bench_patch);
criterion_main!(benches);

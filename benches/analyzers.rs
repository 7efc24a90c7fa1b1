//! Benchmarks for the analysis pipeline.
//!
//! Run with: cargo bench
//! Run specific benchmark: cargo bench -- engine

use std::fmt::Write as _;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use vincian::analyzers::{MetricsAnalyzer, SemanticAnalyzer};
use vincian::cache::AnalysisCache;
use vincian::config::Config;
use vincian::core::{AnalysisContext, AnalysisOptions, FileSet, SourceUnit};
use vincian::engine::Engine;
use vincian::parser::parse;

/// A module with `functions` functions of mixed shape.
fn generate_ts_file(seed: usize, functions: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "import {{ log }} from './log';\n");
    for i in 0..functions {
        let _ = writeln!(
            out,
            "export function handler{seed}_{i}(items: number[], limit: number): number {{\n  let total = 0;\n  for (const item of items) {{\n    if (item > limit && item % 2 === 0) {{\n      total += item;\n    }} else if (item < 0) {{\n      log('negative');\n    }}\n  }}\n  return total > limit ? limit : total;\n}}\n"
        );
    }
    let _ = writeln!(
        out,
        "export class Store{seed} {{\n  items: number[] = [];\n  add(x: number) {{ this.items.push(x); }}\n  size() {{ return this.items.length; }}\n}}"
    );
    out
}

fn create_benchmark_project(file_count: usize) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let src = temp.path().join("src");
    std::fs::create_dir_all(&src).expect("Failed to create src dir");
    for i in 0..file_count {
        std::fs::write(src.join(format!("module_{i}.ts")), generate_ts_file(i, 8))
            .expect("Failed to write file");
    }
    temp
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for functions in [5, 50] {
        let source = generate_ts_file(0, functions);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(functions), &source, |b, src| {
            b.iter(|| parse(black_box(src), Path::new("bench.ts")).expect("parses"));
        });
    }
    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let config = Config::default();
    let metrics = MetricsAnalyzer::new(&config.metrics).expect("valid config");
    let semantic = SemanticAnalyzer::new();
    let source = generate_ts_file(0, 20);
    let root = parse(&source, Path::new("bench.ts")).expect("parses");

    c.bench_function("metrics/20_functions", |b| {
        b.iter(|| metrics.analyze(black_box(&root), &source))
    });
    c.bench_function("semantic/20_functions", |b| {
        b.iter(|| semantic.analyze(black_box(&root)))
    });
}

fn bench_engine(c: &mut Criterion) {
    let config = Config::default();
    let engine = Engine::new(&config).expect("engine builds");
    let unit = SourceUnit::new("bench.ts", generate_ts_file(0, 20)).expect("supported path");
    let options = AnalysisOptions::new();

    c.bench_function("engine/file_uncached", |b| {
        let ctx = AnalysisContext::new(&config);
        b.iter(|| engine.analyze_source(&ctx, black_box(&unit), &options).expect("analyzes"))
    });

    let cache = AnalysisCache::new(config.cache.clone());
    c.bench_function("engine/file_cached", |b| {
        let ctx = AnalysisContext::new(&config).with_cache(&cache);
        b.iter(|| engine.analyze_source(&ctx, black_box(&unit), &options).expect("analyzes"))
    });
}

fn bench_project(c: &mut Criterion) {
    let mut group = c.benchmark_group("project");
    group.sample_size(10);
    let config = Config::default();
    let engine = Engine::new(&config).expect("engine builds");

    for file_count in [10, 40] {
        let temp = create_benchmark_project(file_count);
        let files = FileSet::from_path(temp.path(), &config).expect("walks");
        group.bench_with_input(BenchmarkId::from_parameter(file_count), &files, |b, files| {
            b.iter(|| {
                let ctx = AnalysisContext::new(&config);
                engine
                    .analyze_project(&ctx, files.root(), files.files(), &AnalysisOptions::new())
                    .expect("analyzes")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_metrics, bench_engine, bench_project);
criterion_main!(benches);

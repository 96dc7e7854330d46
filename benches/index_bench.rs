use std::fs;
use std::hint::black_box;
use std::path::Path;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use medienwald::config::AppConfig;
use medienwald::metrics::Metrics;
use medienwald::scanner::{LibraryIndexer, ScanSettings};
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn create_test_tree(depth: usize, files_per_dir: usize, dirs_per_level: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();

    fn create_level(
        path: &Path,
        current_depth: usize,
        max_depth: usize,
        files_per_dir: usize,
        dirs_per_level: usize,
    ) {
        if current_depth >= max_depth {
            return;
        }

        // Half media, half noise the extension filter has to reject
        for i in 0..files_per_dir {
            let ext = if i % 2 == 0 { "mp4" } else { "txt" };
            fs::write(path.join(format!("file_{}.{}", i, ext)), format!("Test content {}", i)).unwrap();
        }

        for i in 0..dirs_per_level {
            let dir_path = path.join(format!("dir_{}", i));
            fs::create_dir(&dir_path).unwrap();
            create_level(dir_path.as_path(), current_depth + 1, max_depth, files_per_dir, dirs_per_level);
        }
    }

    create_level(temp_dir.path(), 0, depth, files_per_dir, dirs_per_level);
    temp_dir
}

fn indexer_for(root: &Path, workers: usize, excludes: &[&str]) -> LibraryIndexer {
    let mut cfg = AppConfig::default().library;
    cfg.scan_workers = Some(workers);
    cfg.excludes = excludes.iter().map(|s| s.to_string()).collect();
    let settings = ScanSettings::from_config(root.canonicalize().unwrap(), &cfg).unwrap();
    LibraryIndexer::new(settings, Duration::from_secs(300), Metrics::new())
}

fn benchmark_small_tree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp_dir = create_test_tree(3, 10, 3);
    let indexer = indexer_for(temp_dir.path(), 4, &[]);

    c.bench_function("index_small_tree", |b| {
        b.iter(|| rt.block_on(async { black_box(indexer.list(true).await.unwrap().len()) }))
    });
}

fn benchmark_large_tree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp_dir = create_test_tree(4, 20, 4);
    let indexer = indexer_for(temp_dir.path(), 8, &[]);

    c.bench_function("index_large_tree", |b| {
        b.iter(|| rt.block_on(async { black_box(indexer.list(true).await.unwrap().len()) }))
    });
}

fn benchmark_workers(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp_dir = create_test_tree(3, 15, 6);

    let mut group = c.benchmark_group("workers");
    for workers in [1, 2, 4, 8, 16].iter() {
        let indexer = indexer_for(temp_dir.path(), *workers, &[]);
        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, _| {
            b.iter(|| rt.block_on(async { black_box(indexer.list(true).await.unwrap().len()) }))
        });
    }
    group.finish();
}

fn benchmark_exclude_patterns(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp_dir = create_test_tree(3, 10, 3);

    let mut group = c.benchmark_group("exclude_patterns");
    let plain = indexer_for(temp_dir.path(), 4, &[]);
    group.bench_function("no_excludes", |b| {
        b.iter(|| rt.block_on(async { black_box(plain.list(true).await.unwrap().len()) }))
    });
    let excluded = indexer_for(temp_dir.path(), 4, &["**/dir_0", "**/file_1*"]);
    group.bench_function("with_excludes", |b| {
        b.iter(|| rt.block_on(async { black_box(excluded.list(true).await.unwrap().len()) }))
    });
    group.finish();
}

fn benchmark_cached_listing(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let temp_dir = create_test_tree(4, 20, 4);
    let indexer = indexer_for(temp_dir.path(), 4, &[]);
    rt.block_on(indexer.list(true)).unwrap();

    c.bench_function("cached_listing", |b| {
        b.iter(|| rt.block_on(async { black_box(indexer.list(false).await.unwrap().len()) }))
    });
}

criterion_group!(
    benches,
    benchmark_small_tree,
    benchmark_large_tree,
    benchmark_workers,
    benchmark_exclude_patterns,
    benchmark_cached_listing
);
criterion_main!(benches);

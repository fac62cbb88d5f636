use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dupsweep::duplicates::{group_by_size, DuplicateFinder, FinderConfig};
use dupsweep::scanner::{FileRecord, Hasher, Walker, WalkerConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// Helper to create a test directory with a specific structure
fn setup_test_dir(depth: usize, files_per_dir: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    create_dir_recursive(temp_dir.path().to_path_buf(), depth, files_per_dir);
    temp_dir
}

fn create_dir_recursive(path: PathBuf, depth: usize, files_per_dir: usize) {
    if depth == 0 {
        return;
    }

    fs::create_dir_all(&path).expect("Failed to create dir");

    for i in 0..files_per_dir {
        let file_path = path.join(format!("file_{}.txt", i));
        // Every third file shares content with its neighbours
        let content = format!("content block {}", i / 3);
        fs::write(file_path, content).expect("Failed to write file");
    }

    if depth > 1 {
        for i in 0..2 {
            create_dir_recursive(path.join(format!("dir_{}", i)), depth - 1, files_per_dir);
        }
    }
}

fn bench_walker(c: &mut Criterion) {
    let temp_dir = setup_test_dir(4, 10);
    let config = WalkerConfig::default();

    c.bench_function("walker_150_files", |b| {
        b.iter(|| {
            let walker = Walker::new(temp_dir.path(), config.clone());
            let files: Vec<_> = walker.walk().expect("walkable root").collect();
            black_box(files);
        })
    });
}

fn bench_hasher(c: &mut Criterion) {
    let mut group = c.benchmark_group("hasher");
    let hasher = Hasher::new();

    for size_kb in [1, 1024, 10240] {
        let data = vec![b'a'; size_kb * 1024];
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("bench_file.dat");
        fs::write(&file_path, &data).expect("Failed to write bench file");

        group.bench_with_input(format!("blake3_{}KB", size_kb), &file_path, |b, path| {
            b.iter(|| black_box(hasher.full_hash(path).unwrap()));
        });
    }
    group.finish();
}

fn bench_grouping(c: &mut Criterion) {
    let files: Vec<FileRecord> = (0..10_000u64)
        .map(|i| FileRecord::new(PathBuf::from(format!("/bench/{}", i)), i % 2_500))
        .collect();

    c.bench_function("group_by_size_10k", |b| {
        b.iter(|| black_box(group_by_size(files.clone())))
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let temp_dir = setup_test_dir(3, 12);
    let mut group = c.benchmark_group("pipeline");

    for threads in [1, 4] {
        let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(threads));
        group.bench_function(format!("find_duplicates_{}_threads", threads), |b| {
            b.iter(|| black_box(finder.find_duplicates(temp_dir.path()).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_walker,
    bench_hasher,
    bench_grouping,
    bench_pipeline
);
criterion_main!(benches);

use dupsweep::actions::Action;
use dupsweep::duplicates::{DuplicateFinder, FinderConfig};
use dupsweep::scanner::WalkerConfig;
use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;

fn write(path: &std::path::Path, content: &[u8]) {
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
    assert!(!summary.interrupted);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"content a");
    write(&dir.path().join("b.txt"), b"content b");
    write(&dir.path().join("c.txt"), b"content c");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
    // Same size, different content: all three had to be hashed
    assert_eq!(summary.files_hashed, 3);
}

#[test]
fn test_scan_duplicate_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"duplicate");
    write(&dir.path().join("b.txt"), b"duplicate");
    write(&dir.path().join("c.txt"), b"unique");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(groups[0].size, 9);
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.reclaimable_space, 9);
    // c.txt has a unique size and is never hashed
    assert_eq!(summary.files_hashed, 2);
    assert_eq!(summary.eliminated_by_size, 1);
}

#[test]
fn test_first_in_traversal_order_is_kept() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    write(&dir.path().join("b.txt"), b"same bytes");
    write(&dir.path().join("a.txt"), b"same bytes");
    write(&sub.join("c.txt"), b"same bytes");

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.len(), 3);
    assert_eq!(group.members[0].action, Action::Keep);
    assert!(group.members[1..].iter().all(|m| m.action == Action::Delete));
    assert_eq!(
        group.members.iter().filter(|m| m.action == Action::Keep).count(),
        1
    );
    assert_eq!(group.keeper().unwrap().file.path, group.members[0].file.path);
}

#[test]
fn test_same_size_different_content_split() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a1"), b"aaaa");
    write(&dir.path().join("a2"), b"aaaa");
    write(&dir.path().join("b1"), b"bbbb");
    write(&dir.path().join("b2"), b"bbbb");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.len() == 2));
    assert_ne!(groups[0].hash, groups[1].hash);
    assert_eq!(summary.duplicate_files, 2);
}

#[test]
fn test_size_filters() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("small1"), b"ab");
    write(&dir.path().join("small2"), b"ab");
    write(&dir.path().join("big1"), &[7u8; 4096]);
    write(&dir.path().join("big2"), &[7u8; 4096]);

    let config = FinderConfig::default()
        .with_walker_config(WalkerConfig::new(false, true, Some(100), None));
    let (groups, summary) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 4096);
    assert_eq!(summary.total_files, 2);
}

#[test]
fn test_single_thread_matches_parallel() {
    let dir = tempdir().unwrap();
    for i in 0..12 {
        write(&dir.path().join(format!("f{:02}", i)), format!("{}", i % 4).as_bytes());
    }

    let serial = DuplicateFinder::new(FinderConfig::default().with_io_threads(1))
        .find_duplicates(dir.path())
        .unwrap()
        .0;
    let parallel = DuplicateFinder::new(FinderConfig::default().with_io_threads(8))
        .find_duplicates(dir.path())
        .unwrap()
        .0;

    assert_eq!(serial.len(), 4);
    let paths = |groups: &[dupsweep::duplicates::DuplicateGroup]| {
        groups.iter().map(|g| g.paths()).collect::<Vec<_>>()
    };
    assert_eq!(paths(&serial), paths(&parallel));
}

#[test]
fn test_scan_missing_root_fails() {
    let dir = tempdir().unwrap();
    let result = DuplicateFinder::with_defaults().find_duplicates(&dir.path().join("nope"));
    assert!(result.is_err());
}

#[test]
fn test_rescan_is_idempotent() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("nested");
    fs::create_dir(&sub).unwrap();
    for name in ["x1", "x2"] {
        write(&dir.path().join(name), b"xxxx");
        write(&sub.join(name), b"xxxx");
    }
    write(&sub.join("y"), b"yy");
    write(&dir.path().join("y"), b"yy");

    let finder = DuplicateFinder::with_defaults();
    let (first, _) = finder.find_duplicates(dir.path()).unwrap();
    let (second, _) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

use dupsweep::actions::{validate_preserves_copy, Action};
use dupsweep::duplicates::{group_by_size, DuplicateFinder, DuplicateGroup};
use dupsweep::scanner::{FileRecord, Hasher};
use proptest::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn records(sizes: &[u64]) -> Vec<FileRecord> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| FileRecord::new(PathBuf::from(format!("/fake/path/{}", i)), size))
        .collect()
}

proptest! {
    #[test]
    fn test_hash_determinism(content in "\\PC*") {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        fs::write(&path, content.as_bytes()).unwrap();

        let hasher = Hasher::new();
        let hash1 = hasher.full_hash(&path).unwrap();
        let hash2 = hasher.full_hash(&path).unwrap();

        prop_assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_chunk_size_does_not_change_hash(
        content in prop::collection::vec(any::<u8>(), 0..5000),
        chunk in 1usize..600,
    ) {
        let small = Hasher::with_chunk_size(chunk).hash_reader(content.as_slice()).unwrap();
        let default = Hasher::new().hash_reader(content.as_slice()).unwrap();
        prop_assert_eq!(small, default);
    }

    #[test]
    fn test_group_by_size_invariants(sizes in prop::collection::vec(0u64..50, 0..60)) {
        let entries = records(&sizes);
        let (groups, stats) = group_by_size(entries.clone());

        for (size, files) in &groups {
            // Sizes never mix and singletons never survive
            prop_assert!(files.len() >= 2);
            for file in files {
                prop_assert_eq!(file.size, *size);
            }
        }

        prop_assert_eq!(stats.total_files, entries.len());
        let kept: usize = groups.values().map(Vec::len).sum();
        prop_assert_eq!(kept + stats.eliminated_unique, entries.len());

        // Input order is preserved within a bucket
        for files in groups.values() {
            let indices: Vec<usize> = files
                .iter()
                .map(|f| f.path.file_name().unwrap().to_string_lossy().parse().unwrap())
                .collect();
            let mut sorted = indices.clone();
            sorted.sort_unstable();
            prop_assert_eq!(indices, sorted);
        }
    }

    #[test]
    fn test_group_has_exactly_one_keeper(count in 2usize..20) {
        let files = records(&vec![7; count]);
        let group = DuplicateGroup::new([3u8; 32], 7, files).unwrap();

        let keepers = group.members.iter().filter(|m| m.action == Action::Keep).count();
        prop_assert_eq!(keepers, 1);
        prop_assert_eq!(group.members[0].action, Action::Keep);
        prop_assert_eq!(group.paths_to_delete().len(), count - 1);
        prop_assert_eq!(group.wasted_space(), 7 * (count as u64 - 1));
        prop_assert!(validate_preserves_copy(&group.paths_to_delete(), &group.paths()).is_ok());
    }

    #[test]
    fn test_found_groups_share_content(contents in prop::collection::vec(0u8..4, 1..12)) {
        let dir = TempDir::new().unwrap();
        for (i, c) in contents.iter().enumerate() {
            fs::write(dir.path().join(format!("f{:02}", i)), vec![*c; 16]).unwrap();
        }

        let (groups, summary) = DuplicateFinder::with_defaults()
            .find_duplicates(dir.path())
            .unwrap();

        let mut distinct = contents.clone();
        distinct.sort_unstable();
        distinct.dedup();
        let expected = distinct
            .iter()
            .filter(|d| contents.iter().filter(|c| c == d).count() >= 2)
            .count();
        prop_assert_eq!(groups.len(), expected);
        prop_assert_eq!(summary.total_files, contents.len());

        for group in &groups {
            let first = fs::read(&group.members[0].file.path).unwrap();
            for member in &group.members[1..] {
                prop_assert_eq!(&fs::read(&member.file.path).unwrap(), &first);
            }
        }
    }
}

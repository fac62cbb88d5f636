//! Duplicate grouping and size-based file organization.
//!
//! # Overview
//!
//! Grouping happens in two passes:
//!
//! 1. **Size bucketing**: every enumerated file goes into a [`SizeBucket`]
//!    keyed by its exact size. Files with a unique size cannot have a
//!    duplicate and are dropped without being read.
//! 2. **Hash bucketing**: members of the surviving size buckets are hashed
//!    and sub-grouped by `(size, digest)` into [`HashBucket`]s. Buckets that
//!    end up with two or more members become [`DuplicateGroup`]s.
//!
//! [`GroupingIndex`] holds both passes. It is owned by a single writer (the
//! scan pipeline) and never shared, so it needs no locking.
//!
//! # Keep selection
//!
//! Insertion order is preserved at every step. The first record of a
//! duplicate group, in traversal order, is the default keep candidate and
//! every other member defaults to delete. Traversal order is stable for a
//! given tree on a given platform but is not guaranteed to match across
//! filesystems.
//!
//! # Example
//!
//! ```
//! use dupsweep::scanner::FileRecord;
//! use dupsweep::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(groups.len(), 1);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::actions::{Action, Decision};
use crate::scanner::{FileRecord, Hash};

/// A group of files with the same size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeBucket {
    /// File size in bytes (shared by all files in this bucket)
    pub size: u64,
    /// Files with this exact size, in traversal order
    pub files: Vec<FileRecord>,
}

impl SizeBucket {
    /// Create an empty bucket.
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self {
            size,
            files: Vec::new(),
        }
    }

    /// Add a file to this bucket.
    pub fn add(&mut self, file: FileRecord) {
        debug_assert_eq!(
            file.size, self.size,
            "File size {} doesn't match bucket size {}",
            file.size, self.size
        );
        self.files.push(file);
    }

    /// Number of files in this bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Check if this bucket could contain duplicates (2+ files).
    #[must_use]
    pub fn has_candidates(&self) -> bool {
        self.files.len() > 1
    }
}

/// Files sharing a size and a content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashBucket {
    /// Shared file size
    pub size: u64,
    /// Shared BLAKE3 digest
    pub hash: Hash,
    /// Files in insertion order
    pub files: Vec<FileRecord>,
}

/// One file within a duplicate group and the action chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// The duplicate file
    pub file: FileRecord,
    /// Keep or delete; defaults to keep for the first member only
    pub action: Action,
}

/// Confirmed duplicate group of files.
///
/// Always holds at least two members. On construction exactly one member
/// (the first in traversal order) is marked [`Action::Keep`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// BLAKE3 hash of the file content
    pub hash: Hash,
    /// File size in bytes (shared by all members)
    pub size: u64,
    /// Members in traversal order
    pub members: Vec<GroupMember>,
}

impl DuplicateGroup {
    /// Build a group from files sharing size and hash.
    ///
    /// Returns `None` when fewer than two files are given.
    #[must_use]
    pub fn new(hash: Hash, size: u64, files: Vec<FileRecord>) -> Option<Self> {
        if files.len() < 2 {
            return None;
        }

        let members = files
            .into_iter()
            .enumerate()
            .map(|(i, file)| GroupMember {
                file,
                action: if i == 0 { Action::Keep } else { Action::Delete },
            })
            .collect();

        Some(Self {
            hash,
            size,
            members,
        })
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always `false` for groups built through [`DuplicateGroup::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.members.len() as u64
    }

    /// Total wasted space (all copies minus one).
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Hash as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        crate::scanner::hash_to_hex(&self.hash)
    }

    /// Paths of all members, in order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|m| m.file.path.clone()).collect()
    }

    /// Paths currently marked for deletion.
    #[must_use]
    pub fn paths_to_delete(&self) -> Vec<PathBuf> {
        self.members
            .iter()
            .filter(|m| m.action == Action::Delete)
            .map(|m| m.file.path.clone())
            .collect()
    }

    /// The member currently marked keep, if any.
    #[must_use]
    pub fn keeper(&self) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.action == Action::Keep)
    }

    /// Override the action for the member at `path`.
    ///
    /// Returns `false` if no member has that path.
    pub fn set_action(&mut self, path: &Path, action: Action) -> bool {
        match self.members.iter_mut().find(|m| m.file.path == path) {
            Some(member) => {
                member.action = action;
                true
            }
            None => false,
        }
    }

    /// One decision per member, in member order.
    #[must_use]
    pub fn decisions(&self) -> Vec<Decision> {
        self.members
            .iter()
            .map(|m| Decision::new(m.file.path.clone(), m.action))
            .collect()
    }
}

/// Statistics from size grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of unique file sizes
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in buckets of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique (singleton buckets)
    pub eliminated_unique: usize,
    /// Number of size buckets with 2+ files
    pub candidate_buckets: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Two-pass grouping index: size buckets, then hash buckets.
///
/// # Example
///
/// ```
/// use dupsweep::duplicates::GroupingIndex;
/// use dupsweep::scanner::FileRecord;
/// use std::path::PathBuf;
///
/// let mut index = GroupingIndex::new();
/// index.insert_sized(FileRecord::new(PathBuf::from("/a"), 3));
/// index.insert_sized(FileRecord::new(PathBuf::from("/b"), 3));
/// index.insert_sized(FileRecord::new(PathBuf::from("/c"), 9));
///
/// let buckets = index.take_size_buckets();
/// assert_eq!(buckets.len(), 1);
///
/// for file in buckets[0].files.clone() {
///     index.insert_hashed(file, [7u8; 32]);
/// }
/// let groups = index.finalize_groups();
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct GroupingIndex {
    size_buckets: Vec<SizeBucket>,
    size_slots: HashMap<u64, usize>,
    hash_buckets: Vec<HashBucket>,
    hash_slots: HashMap<(u64, Hash), usize>,
    stats: GroupingStats,
}

impl GroupingIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an enumerated file to its size bucket.
    pub fn insert_sized(&mut self, file: FileRecord) {
        self.stats.total_files += 1;
        self.stats.total_size += file.size;

        let size = file.size;
        let slot = *self.size_slots.entry(size).or_insert_with(|| {
            self.size_buckets.push(SizeBucket::new(size));
            self.size_buckets.len() - 1
        });
        self.size_buckets[slot].add(file);
    }

    /// Number of files inserted so far.
    #[must_use]
    pub fn files_seen(&self) -> usize {
        self.stats.total_files
    }

    /// Remove and return the size buckets with 2+ members.
    ///
    /// Buckets come back in the order their size was first seen; files keep
    /// their traversal order. Singleton buckets are counted as eliminated
    /// and discarded.
    pub fn take_size_buckets(&mut self) -> Vec<SizeBucket> {
        self.size_slots.clear();
        self.stats.unique_sizes = self.size_buckets.len();

        let mut candidates = Vec::new();
        for bucket in std::mem::take(&mut self.size_buckets) {
            if bucket.has_candidates() {
                self.stats.potential_duplicates += bucket.len();
                self.stats.candidate_buckets += 1;
                log::debug!(
                    "Size bucket {} bytes: {} potential duplicates",
                    bucket.size,
                    bucket.len()
                );
                candidates.push(bucket);
            } else {
                self.stats.eliminated_unique += bucket.len();
            }
        }

        log::info!(
            "Size grouping complete: {} files → {} potential duplicates ({:.1}% eliminated)",
            self.stats.total_files,
            self.stats.potential_duplicates,
            self.stats.elimination_rate()
        );

        candidates
    }

    /// Add a hashed file to its `(size, hash)` bucket.
    pub fn insert_hashed(&mut self, file: FileRecord, hash: Hash) {
        let key = (file.size, hash);
        let slot = *self.hash_slots.entry(key).or_insert_with(|| {
            self.hash_buckets.push(HashBucket {
                size: file.size,
                hash,
                files: Vec::new(),
            });
            self.hash_buckets.len() - 1
        });
        self.hash_buckets[slot].files.push(file);
    }

    /// Drain the hash buckets into duplicate groups.
    ///
    /// Buckets with a single member are dropped. Groups come back in the
    /// order their first member was inserted. The index can keep accepting
    /// hashed files afterwards; each call finalizes only what was added
    /// since the previous one.
    pub fn finalize_groups(&mut self) -> Vec<DuplicateGroup> {
        self.hash_slots.clear();
        std::mem::take(&mut self.hash_buckets)
            .into_iter()
            .filter_map(|bucket| DuplicateGroup::new(bucket.hash, bucket.size, bucket.files))
            .collect()
    }

    /// Size grouping statistics.
    #[must_use]
    pub fn stats(&self) -> &GroupingStats {
        &self.stats
    }
}

/// Group files by size in one pass.
///
/// Returns only the sizes shared by 2+ files, with files in input order.
#[must_use]
pub fn group_by_size(
    files: impl IntoIterator<Item = FileRecord>,
) -> (HashMap<u64, Vec<FileRecord>>, GroupingStats) {
    let mut index = GroupingIndex::new();
    for file in files {
        index.insert_sized(file);
    }

    let groups = index
        .take_size_buckets()
        .into_iter()
        .map(|bucket| (bucket.size, bucket.files))
        .collect();

    (groups, index.stats().clone())
}

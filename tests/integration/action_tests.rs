use dupsweep::actions::{
    validate_preserves_copy, Action, ActionManager, ActionResult, BatchSummary, Decision,
    DeleteError, FolderTrash,
};
use dupsweep::duplicates::DuplicateFinder;
use dupsweep::output::json::decisions_for;
use std::fs;
use std::sync::atomic::AtomicBool;
use tempfile::tempdir;

#[test]
fn test_scan_then_apply_default_decisions() {
    let dir = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let scan_root = dir.path().join("data");
    fs::create_dir(&scan_root).unwrap();
    fs::write(scan_root.join("a.txt"), "same").unwrap();
    fs::write(scan_root.join("b.txt"), "same").unwrap();
    fs::write(scan_root.join("c.txt"), "same").unwrap();

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&scan_root)
        .unwrap();
    for group in &groups {
        validate_preserves_copy(&group.paths_to_delete(), &group.paths()).unwrap();
    }

    let manager = ActionManager::new(Box::new(FolderTrash::new(bin.path()).unwrap()));
    let outcomes = manager.apply(&decisions_for(&groups));

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert!(scan_root.join("a.txt").exists());
    assert!(!scan_root.join("b.txt").exists());
    assert!(!scan_root.join("c.txt").exists());

    // Removed files are recoverable from the trash folder
    assert_eq!(fs::read_dir(bin.path()).unwrap().count(), 2);

    let summary = BatchSummary::from_outcomes(&outcomes);
    assert_eq!(summary.removed, 2);
    assert_eq!(summary.kept, 1);
    assert_eq!(summary.failed, 0);

    // A rescan finds nothing left
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&scan_root)
        .unwrap();
    assert!(groups.is_empty());
}

#[test]
fn test_name_collisions_in_trash_folder() {
    let dir = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let one = dir.path().join("one");
    let two = dir.path().join("two");
    fs::create_dir(&one).unwrap();
    fs::create_dir(&two).unwrap();
    fs::write(one.join("same.txt"), "1").unwrap();
    fs::write(two.join("same.txt"), "2").unwrap();

    let manager = ActionManager::new(Box::new(FolderTrash::new(bin.path()).unwrap()));
    let outcomes = manager.apply(&[
        Decision::new(one.join("same.txt"), Action::Delete),
        Decision::new(two.join("same.txt"), Action::Delete),
    ]);

    assert!(outcomes.iter().all(|o| o.is_success()));
    let mut names: Vec<String> = fs::read_dir(bin.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["same (1).txt".to_string(), "same.txt".to_string()]);
}

#[test]
fn test_failure_does_not_stop_batch() {
    let dir = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let present = dir.path().join("present.txt");
    fs::write(&present, "x").unwrap();

    let manager = ActionManager::new(Box::new(FolderTrash::new(bin.path()).unwrap()));
    let outcomes = manager.apply(&[
        Decision::new(dir.path().join("gone.txt"), Action::Delete),
        Decision::new(dir.path().to_path_buf(), Action::Delete),
        Decision::new(present.clone(), Action::Delete),
    ]);

    assert_eq!(outcomes[0].result, ActionResult::Failed);
    assert_eq!(outcomes[1].result, ActionResult::Failed);
    assert!(outcomes[1].failure_reason.is_some());
    assert_eq!(outcomes[2].result, ActionResult::Success);
    assert!(!present.exists());
}

#[test]
fn test_stop_flag_set_before_apply() {
    let dir = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    fs::write(&file, "x").unwrap();

    let manager = ActionManager::new(Box::new(FolderTrash::new(bin.path()).unwrap()));
    let outcomes = manager.apply_with_stop(
        &[Decision::new(file.clone(), Action::Delete)],
        &AtomicBool::new(true),
    );

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].result, ActionResult::Failed);
    assert!(file.exists());
}

#[test]
fn test_refuses_to_delete_every_copy() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let all = vec![a.clone(), b.clone()];

    assert!(matches!(
        validate_preserves_copy(&all, &all),
        Err(DeleteError::AllCopiesWouldBeDeleted)
    ));
    assert!(validate_preserves_copy(&[b], &all).is_ok());
}

#[test]
fn test_decision_file_roundtrip_through_apply() {
    let dir = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let file = dir.path().join("dup.bin");
    fs::write(&file, "x").unwrap();

    let json = format!(
        r#"[{{"path": {}, "action": "delete"}}]"#,
        serde_json::to_string(&file).unwrap()
    );
    let decisions: Vec<Decision> = serde_json::from_str(&json).unwrap();

    let outcomes =
        ActionManager::new(Box::new(FolderTrash::new(bin.path()).unwrap())).apply(&decisions);
    assert!(outcomes[0].is_success());
    assert!(!file.exists());
}

use crossbeam_channel::{unbounded, Receiver, Sender};
use dupsweep::duplicates::{DuplicateFinder, FinderConfig, ScanController, ScanState};
use dupsweep::progress::{ScanEvent, ScanEventHandler, ScanPhase};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

fn tree_with_groups(groups: usize) -> TempDir {
    let dir = tempdir().unwrap();
    for g in 0..groups {
        let content = format!("group {} content", g);
        fs::write(dir.path().join(format!("g{}_a", g)), &content).unwrap();
        fs::write(dir.path().join(format!("g{}_b", g)), &content).unwrap();
    }
    fs::write(dir.path().join("lonely"), "unique").unwrap();
    dir
}

/// One size bucket per group: group `g` holds two files of `10 * (g + 1)` bytes.
fn tree_with_sized_groups(groups: usize) -> TempDir {
    let dir = tempdir().unwrap();
    for g in 0..groups {
        let content = vec![b'a' + g as u8; 10 * (g + 1)];
        fs::write(dir.path().join(format!("g{}_a", g)), &content).unwrap();
        fs::write(dir.path().join(format!("g{}_b", g)), &content).unwrap();
    }
    fs::write(dir.path().join("lonely"), "unique").unwrap();
    dir
}

/// Forwards events, holding the pipeline on the first confirmed group.
struct FirstGroupGate {
    gate: Receiver<()>,
    opened: AtomicBool,
    tx: Sender<ScanEvent>,
}

impl ScanEventHandler for FirstGroupGate {
    fn on_event(&self, event: ScanEvent) {
        let first_group =
            matches!(event, ScanEvent::GroupFound(_)) && !self.opened.swap(true, Ordering::SeqCst);
        let _ = self.tx.send(event);
        if first_group {
            let _ = self.gate.recv();
        }
    }
}

#[test]
fn test_event_stream_ends_with_one_terminal_event() {
    let dir = tree_with_groups(3);
    let (tx, rx) = unbounded::<ScanEvent>();

    let mut controller = ScanController::new(FinderConfig::default());
    controller.start(dir.path(), Arc::new(tx)).unwrap();
    let report = controller.wait().unwrap();

    let events: Vec<ScanEvent> = rx.try_iter().collect();
    let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert!(events.last().unwrap().is_terminal());

    let found = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::GroupFound(_)))
        .count();
    match events.last().unwrap() {
        ScanEvent::Completed { groups, summary } => {
            assert_eq!(groups.len(), 3);
            assert_eq!(found, 3);
            assert_eq!(summary.duplicate_groups, 3);
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }

    assert_eq!(report.state, ScanState::Completed);
    assert_eq!(controller.state(), ScanState::Completed);
}

#[test]
fn test_final_progress_reports_all_hashed() {
    let dir = tree_with_groups(2);
    let (tx, rx) = unbounded::<ScanEvent>();

    let mut controller = ScanController::new(FinderConfig::default());
    controller.start(dir.path(), Arc::new(tx)).unwrap();
    controller.wait().unwrap();

    let last_progress = rx
        .try_iter()
        .filter_map(|e| match e {
            ScanEvent::Progress(p) => Some(p),
            _ => None,
        })
        .last()
        .unwrap();
    assert_eq!(last_progress.phase, ScanPhase::Hashing);
    assert_eq!(last_progress.files_hashed, last_progress.files_to_hash);
    assert_eq!(last_progress.files_to_hash, 4);
}

#[test]
fn test_invalid_root_reports_failure() {
    let dir = tempdir().unwrap();
    let (tx, rx) = unbounded::<ScanEvent>();

    let mut controller = ScanController::new(FinderConfig::default());
    let result = controller.start(&dir.path().join("missing"), Arc::new(tx));

    assert!(result.is_err());
    assert_eq!(controller.state(), ScanState::Failed);
    assert!(matches!(rx.try_recv(), Ok(ScanEvent::Failed { .. })));
}

#[test]
fn test_drop_while_running_does_not_hang() {
    let dir = tree_with_groups(20);
    let (tx, _rx) = unbounded::<ScanEvent>();

    let mut controller = ScanController::new(FinderConfig::default());
    controller.start(dir.path(), Arc::new(tx)).unwrap();
    drop(controller);
}

#[test]
fn test_cancel_mid_hashing_keeps_finished_groups() {
    let dir = tree_with_sized_groups(5);
    let config = FinderConfig::default().with_io_threads(1);

    let (full, _) = DuplicateFinder::new(config.clone())
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(full.len(), 5);

    let (tx, rx) = unbounded::<ScanEvent>();
    let (gate_tx, gate_rx) = unbounded();
    let handler = FirstGroupGate {
        gate: gate_rx,
        opened: AtomicBool::new(false),
        tx,
    };

    let mut controller = ScanController::new(config);
    controller.start(dir.path(), Arc::new(handler)).unwrap();

    loop {
        let event = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        if matches!(event, ScanEvent::GroupFound(_)) {
            break;
        }
    }
    assert!(controller.is_running());
    controller.cancel();
    gate_tx.send(()).unwrap();
    let report = controller.wait().unwrap();

    assert_eq!(report.state, ScanState::Cancelled);
    assert!(report.summary.interrupted);
    assert!(!report.groups.is_empty());
    assert!(report.groups.len() < full.len());
    for group in &report.groups {
        let twin = full
            .iter()
            .find(|f| f.hash == group.hash)
            .expect("cancelled group missing from the full run");
        assert_eq!(twin.paths(), group.paths());
        assert_eq!(twin.size, group.size);
    }

    match rx.try_iter().last() {
        Some(ScanEvent::Cancelled { groups, .. }) => assert_eq!(groups, report.groups),
        other => panic!("unexpected last event: {:?}", other),
    }
}

//! dupsweep - duplicate file finder
//!
//! Finds files with identical content under a directory tree and applies
//! keep/delete decisions through recoverable removal.
//!
//! The pipeline lives in [`duplicates`]: files are bucketed by size, only
//! same-size candidates are hashed (BLAKE3, streamed), and each confirmed
//! group defaults to keeping its first member in traversal order.
//! [`duplicates::ScanController`] runs the pipeline on a background thread
//! with cooperative cancellation and reports through [`progress::ScanEvent`]s.
//! [`actions::ActionManager`] applies decisions, moving files to the trash.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossbeam_channel::RecvTimeoutError;

use crate::actions::{
    validate_preserves_copy, ActionManager, ActionOutcome, Decision, FolderTrash, SystemTrash,
};
use crate::cli::{ApplyArgs, Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{DuplicateGroup, ScanController, ScanState, ScanSummary};
use crate::error::ExitCode;
use crate::output::json::{decisions_for, deletions};
use crate::output::{write_outcomes, JsonApplyOutput, JsonOutput, TextOutput};
use crate::progress::{Progress, ScanEvent, ScanEventHandler};
use crate::signal::{install_handler, ShutdownHandler};

/// How often the scan command checks for Ctrl+C while waiting for events.
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the application logic for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unscannable root, an
/// unreadable decision file, or an output failure.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Scan(args) => run_scan(args, config, cli.quiet),
        Commands::Apply(args) => run_apply(args, &config),
        Commands::Config => {
            print!("{}", config.to_toml().context("failed to render configuration")?);
            Ok(ExitCode::Success)
        }
    }
}

/// Fold scan flags over the loaded configuration.
fn apply_scan_overrides(config: &mut Config, args: &ScanArgs) {
    if args.include_hidden {
        config.scan.skip_hidden = false;
    }
    if args.follow_symlinks {
        config.scan.follow_symlinks = true;
    }
    if let Some(threads) = args.io_threads {
        config.scan.io_threads = threads;
    }
    if args.min_size.is_some() {
        config.scan.min_size = args.min_size;
    }
    if args.max_size.is_some() {
        config.scan.max_size = args.max_size;
    }
    if args.trash_dir.is_some() {
        config.actions.trash_dir.clone_from(&args.trash_dir);
    }
}

fn run_scan(args: ScanArgs, mut config: Config, quiet: bool) -> Result<ExitCode> {
    apply_scan_overrides(&mut config, &args);
    config.validate()?;

    let shutdown = install_handler()?;
    let progress = Progress::new(quiet);

    let (tx, rx) = crossbeam_channel::unbounded::<ScanEvent>();
    let mut controller = ScanController::new(config.finder_config());
    controller
        .start(&args.path, Arc::new(tx))
        .with_context(|| format!("cannot scan {}", args.path.display()))?;

    loop {
        match rx.recv_timeout(SIGNAL_POLL_INTERVAL) {
            Ok(event) => {
                let terminal = event.is_terminal();
                progress.on_event(event);
                if terminal {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if shutdown.is_shutdown_requested() {
            controller.cancel();
        }
    }

    let report = controller
        .wait()
        .context("scan thread ended without a report")?;

    if report.state == ScanState::Failed {
        bail!(
            "scan of {} failed: {}",
            args.path.display(),
            report.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut exit_code = scan_exit_code(report.state, &report.groups, &report.summary);

    let outcomes = if args.delete && report.state == ScanState::Completed {
        let outcomes = delete_duplicates(&report.groups, &config, args.yes, &shutdown)?;
        if outcomes.iter().any(|o| !o.is_success()) && exit_code == ExitCode::Success {
            exit_code = ExitCode::PartialSuccess;
        }
        Some(outcomes)
    } else {
        if args.delete {
            log::warn!("Scan was cancelled; nothing was deleted");
        }
        None
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => {
            TextOutput::new(report.state, &report.groups, &report.summary).write_to(&mut out)?;
            if let Some(outcomes) = outcomes.as_deref() {
                writeln!(out)?;
                write_outcomes(&mut out, outcomes)?;
            }
        }
        OutputFormat::Json => {
            let mut json = JsonOutput::new(report.state, &report.groups, &report.summary, exit_code);
            if let Some(outcomes) = outcomes.as_deref() {
                json = json.with_actions(outcomes);
            }
            json.write_to(&mut out, true)?;
        }
    }

    Ok(exit_code)
}

/// Exit code for a finished scan, before any actions.
fn scan_exit_code(state: ScanState, groups: &[DuplicateGroup], summary: &ScanSummary) -> ExitCode {
    if state == ScanState::Cancelled {
        ExitCode::Interrupted
    } else if groups.is_empty() {
        ExitCode::NoDuplicates
    } else if summary.has_issues() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}

/// Apply the default decisions of every group.
fn delete_duplicates(
    groups: &[DuplicateGroup],
    config: &Config,
    assume_yes: bool,
    shutdown: &ShutdownHandler,
) -> Result<Vec<ActionOutcome>> {
    for group in groups {
        validate_preserves_copy(&group.paths_to_delete(), &group.paths())?;
    }

    let decisions = decisions_for(groups);
    let count = deletions(&decisions);
    if count == 0 {
        return Ok(Vec::new());
    }

    let target = match &config.actions.trash_dir {
        Some(dir) => dir.display().to_string(),
        None => "the trash".to_string(),
    };
    if !assume_yes && !confirm(&format!("Move {} file(s) to {}?", count, target))? {
        log::info!("Deletion declined");
        return Ok(Vec::new());
    }

    let manager = build_manager(config.actions.trash_dir.as_deref())?;
    Ok(manager.apply_with_stop(&decisions, &shutdown.get_flag()))
}

fn run_apply(args: ApplyArgs, config: &Config) -> Result<ExitCode> {
    let content = std::fs::read_to_string(&args.decisions)
        .with_context(|| format!("failed to read {}", args.decisions.display()))?;
    let decisions: Vec<Decision> = serde_json::from_str(&content)
        .with_context(|| format!("invalid decision list in {}", args.decisions.display()))?;

    log::info!("Applying {} decision(s)", decisions.len());

    let trash_dir = args
        .trash_dir
        .as_deref()
        .or(config.actions.trash_dir.as_deref());
    let manager = build_manager(trash_dir)?;
    let shutdown = install_handler()?;
    let outcomes = manager.apply_with_stop(&decisions, &shutdown.get_flag());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => write_outcomes(&mut out, &outcomes)?,
        OutputFormat::Json => JsonApplyOutput::new(&outcomes).write_to(&mut out, true)?,
    }

    Ok(if shutdown.is_shutdown_requested() {
        ExitCode::Interrupted
    } else if outcomes.iter().all(ActionOutcome::is_success) {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    })
}

fn build_manager(trash_dir: Option<&Path>) -> Result<ActionManager> {
    Ok(match trash_dir {
        Some(dir) => {
            let remover = FolderTrash::new(dir)
                .with_context(|| format!("cannot use {} as trash folder", dir.display()))?;
            ActionManager::new(Box::new(remover))
        }
        None => ActionManager::new(Box::new(SystemTrash)),
    })
}

/// Ask a yes/no question on stderr; anything but y/yes is no.
fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{} [y/N] ", prompt);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn scan_args(extra: &[&str]) -> ScanArgs {
        let mut argv = vec!["dupsweep", "scan", "/root"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Scan(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_overrides_only_touch_given_flags() {
        let mut config = Config::default();
        config.scan.io_threads = 7;
        apply_scan_overrides(&mut config, &scan_args(&[]));
        assert_eq!(config, {
            let mut expected = Config::default();
            expected.scan.io_threads = 7;
            expected
        });

        apply_scan_overrides(
            &mut config,
            &scan_args(&["--include-hidden", "--io-threads", "2", "--min-size", "1KB"]),
        );
        assert!(!config.scan.skip_hidden);
        assert_eq!(config.scan.io_threads, 2);
        assert_eq!(config.scan.min_size, Some(1000));
    }

    #[test]
    fn test_scan_exit_codes() {
        let summary = ScanSummary::default();
        assert_eq!(
            scan_exit_code(ScanState::Completed, &[], &summary),
            ExitCode::NoDuplicates
        );
        assert_eq!(
            scan_exit_code(ScanState::Cancelled, &[], &summary),
            ExitCode::Interrupted
        );

        let group = DuplicateGroup::new(
            [0u8; 32],
            1,
            vec![
                crate::scanner::FileRecord::new("/a".into(), 1),
                crate::scanner::FileRecord::new("/b".into(), 1),
            ],
        )
        .unwrap();
        let groups = [group];
        assert_eq!(
            scan_exit_code(ScanState::Completed, &groups, &summary),
            ExitCode::Success
        );

        let troubled = ScanSummary {
            hash_failures: 1,
            ..Default::default()
        };
        assert_eq!(
            scan_exit_code(ScanState::Completed, &groups, &troubled),
            ExitCode::PartialSuccess
        );
    }
}

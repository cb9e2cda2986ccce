#![cfg(unix)]

use repkg_runner::{
    CancelToken, Config, Mode, OptionSet, OptionValue, Orchestrator, OverallStatus, RunEvent,
    RunStatus, RunnerError,
};
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Shell script standing in for RePKG. Every invocation appends its
/// arguments to `calls.txt` next to the script before running `body`.
fn fake_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("RePKG");
    let script = format!(
        "#!/bin/sh\necho \"$@\" >> '{}'\n{}\n",
        dir.join("calls.txt").display(),
        body
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.txt"))
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

fn touch(path: &Path) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"PKGV0001").unwrap();
    path.to_path_buf()
}

fn config_for(tool: &Path, temp: &Path) -> Config {
    let mut config = Config::default();
    config.tool.path = Some(tool.to_path_buf());
    config.tool.log_enabled = false;
    config.tool.poll_interval_ms = 10;
    config.run.output_dir = temp.join("out");
    config
}

/// Cancels from another thread once the tool has had time to start.
fn cancel_after(cancel: &CancelToken, delay: Duration) {
    let cancel = cancel.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        cancel.cancel();
    });
}

fn options(mode: Mode, pairs: &[(&str, OptionValue)]) -> OptionSet {
    let raw: BTreeMap<String, OptionValue> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    OptionSet::validate(mode, &raw).unwrap()
}

#[test]
fn single_file_runs_exactly_once() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "echo extracted");
    let input = touch(&temp.path().join("foo.pkg"));
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(
            &[input.clone()],
            &config.run.output_dir,
            options(Mode::Extract, &[("overwrite", OptionValue::Flag(false))]),
        )
        .unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let report = orchestrator.execute(plan, &tx, &CancelToken::new()).unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, RunStatus::Succeeded);
    assert_eq!(report.results[0].stdout, "extracted\n");
    assert_eq!(report.status, OverallStatus::AllSucceeded);
    assert!(config.run.output_dir.is_dir());

    let calls = calls(temp.path());
    assert_eq!(
        calls,
        vec![format!(
            "extract {} -o {}",
            input.display(),
            config.run.output_dir.display()
        )]
    );
    assert!(!calls[0].contains("--overwrite"));
}

#[test]
fn failure_does_not_stop_the_queue() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(
        temp.path(),
        "case \"$*\" in *bad.pkg*) echo \"bad file\" >&2; exit 1;; esac\necho ok",
    );
    let good = touch(&temp.path().join("in/a_good.pkg"));
    let bad = touch(&temp.path().join("in/bad.pkg"));
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(
            &[good.clone(), bad.clone()],
            &config.run.output_dir,
            options(Mode::Extract, &[]),
        )
        .unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let report = orchestrator.execute(plan, &tx, &CancelToken::new()).unwrap();

    assert_eq!(report.status, OverallStatus::PartialFailure);
    assert_eq!(report.results[0].input, good);
    assert_eq!(report.results[0].status, RunStatus::Succeeded);
    assert_eq!(report.results[1].input, bad);
    assert_eq!(report.results[1].status, RunStatus::Failed);
    assert_eq!(report.results[1].exit_code, Some(1));
    assert_eq!(report.results[1].stderr, "bad file\n");

    match report.results[1].to_error() {
        Some(RunnerError::ProcessingFailed { path, stderr, .. }) => {
            assert_eq!(path, bad);
            assert_eq!(stderr, "bad file\n");
        }
        other => panic!("expected ProcessingFailed, got {:?}", other),
    }
}

#[test]
fn every_failure_is_all_failed() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "exit 3");
    let dir = temp.path().join("in");
    touch(&dir.join("a.pkg"));
    touch(&dir.join("b.tex"));
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(&[dir], &config.run.output_dir, options(Mode::Extract, &[]))
        .unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let report = orchestrator.execute(plan, &tx, &CancelToken::new()).unwrap();

    assert_eq!(report.status, OverallStatus::AllFailed);
    assert!(report
        .results
        .iter()
        .all(|r| r.status == RunStatus::Failed && r.exit_code == Some(3)));
}

#[test]
fn results_follow_candidate_order() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "true");
    let dir = temp.path().join("in");
    touch(&dir.join("c.pkg"));
    touch(&dir.join("a.pkg"));
    touch(&dir.join("b.tex"));
    touch(&dir.join("notes.txt"));
    let single = touch(&temp.path().join("z.pkg"));
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(
            &[single.clone(), dir.clone()],
            &config.run.output_dir,
            options(Mode::Extract, &[]),
        )
        .unwrap();

    let expected = vec![single, dir.join("a.pkg"), dir.join("b.tex"), dir.join("c.pkg")];
    assert_eq!(plan.skipped, vec![dir.join("notes.txt")]);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let report = orchestrator.execute(plan, &tx, &CancelToken::new()).unwrap();
    drop(tx);

    let inputs: Vec<PathBuf> = report.results.iter().map(|r| r.input.clone()).collect();
    assert_eq!(inputs, expected);
    assert_eq!(report.skipped.len(), 1);

    let mut started = 0;
    let mut completed = Vec::new();
    let mut finished = false;
    while let Ok(event) = rx.try_recv() {
        assert!(!finished, "no events after RunFinished");
        match event {
            RunEvent::ItemStarted { .. } => started += 1,
            RunEvent::ItemCompleted { index, total, .. } => {
                assert_eq!(total, 4);
                completed.push(index);
            }
            RunEvent::RunFinished(_) => finished = true,
        }
    }
    assert_eq!(started, 4);
    assert_eq!(completed, vec![0, 1, 2, 3]);
    assert!(finished);
}

#[test]
fn recursive_option_controls_enumeration() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "true");
    let dir = temp.path().join("in");
    touch(&dir.join("top.pkg"));
    touch(&dir.join("nested/deep.pkg"));
    let config = config_for(&tool, temp.path());
    let orchestrator = Orchestrator::new(&config).unwrap();

    let flat = orchestrator
        .plan(
            &[dir.clone()],
            &config.run.output_dir,
            options(Mode::Extract, &[]),
        )
        .unwrap();
    assert_eq!(flat.len(), 1);

    let recursive = orchestrator
        .plan(
            &[dir.clone()],
            &config.run.output_dir,
            options(Mode::Extract, &[("recursive", OptionValue::Flag(true))]),
        )
        .unwrap();
    let inputs: Vec<&Path> = recursive.requests.iter().map(|r| r.input()).collect();
    assert_eq!(
        inputs,
        vec![dir.join("nested/deep.pkg").as_path(), dir.join("top.pkg").as_path()]
    );

    // "recursive" is consumed here and never reaches RePKG.
    let (tx, _rx) = mpsc::unbounded_channel();
    orchestrator.execute(recursive, &tx, &CancelToken::new()).unwrap();
    assert!(calls(temp.path()).iter().all(|line| !line.contains("recursive")));
}

#[test]
fn missing_tool_is_reported_before_any_run() {
    let temp = TempDir::new().unwrap();
    let input = touch(&temp.path().join("foo.pkg"));
    let config = config_for(&temp.path().join("missing/RePKG"), temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let result = orchestrator.plan(&[input], &config.run.output_dir, options(Mode::Extract, &[]));

    assert!(matches!(result, Err(RunnerError::ToolNotFound { .. })));
    assert!(!config.run.output_dir.exists());
}

#[test]
fn tool_vanishing_mid_run_aborts() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "true");
    let input = touch(&temp.path().join("foo.pkg"));
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(&[input], &config.run.output_dir, options(Mode::Extract, &[]))
        .unwrap();
    fs::remove_file(&tool).unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let result = orchestrator.execute(plan, &tx, &CancelToken::new());
    assert!(matches!(result, Err(RunnerError::ToolNotFound { .. })));
}

#[test]
fn empty_selection_and_unsupported_files() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "true");
    let notes = temp.path().join("notes.txt");
    fs::write(&notes, "hello").unwrap();
    let config = config_for(&tool, temp.path());
    let orchestrator = Orchestrator::new(&config).unwrap();

    let empty = orchestrator.plan(&[], &config.run.output_dir, options(Mode::Extract, &[]));
    assert!(matches!(empty, Err(RunnerError::InvalidInput { .. })));

    let missing = orchestrator.plan(
        &[temp.path().join("nope.pkg")],
        &config.run.output_dir,
        options(Mode::Extract, &[]),
    );
    assert!(matches!(missing, Err(RunnerError::InvalidInput { .. })));

    match orchestrator.plan(&[notes], &config.run.output_dir, options(Mode::Extract, &[])) {
        Err(RunnerError::NoCandidates { skipped, .. }) => assert_eq!(skipped, 1),
        other => panic!("expected NoCandidates, got {:?}", other),
    }
    assert!(calls(temp.path()).is_empty());
}

#[test]
fn unwritable_output_directory_is_fatal() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "true");
    let input = touch(&temp.path().join("foo.pkg"));
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "file, not a folder").unwrap();
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(&[input], &blocker.join("out"), options(Mode::Extract, &[]))
        .unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let result = orchestrator.execute(plan, &tx, &CancelToken::new());
    assert!(matches!(result, Err(RunnerError::OutputUnavailable { .. })));
    assert!(calls(temp.path()).is_empty());
}

#[test]
fn read_only_output_directory_is_fatal() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "true");
    let input = touch(&temp.path().join("foo.pkg"));
    let locked = temp.path().join("locked");
    fs::create_dir_all(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    // Permission bits do not stop a privileged user.
    if fs::write(locked.join("scratch"), b"").is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let config = config_for(&tool, temp.path());
    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(&[input], &locked, options(Mode::Extract, &[]))
        .unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let result = orchestrator.execute(plan, &tx, &CancelToken::new());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    match result {
        Err(RunnerError::OutputUnavailable { path, .. }) => assert_eq!(path, locked),
        other => panic!("expected OutputUnavailable, got {:?}", other),
    }
    assert!(calls(temp.path()).is_empty());
}

#[test]
fn info_mode_has_no_output_directory() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "echo \"Title: Forest\"");
    let input = touch(&temp.path().join("scene.pkg"));
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(
            &[input.clone()],
            &config.run.output_dir,
            options(
                Mode::Info,
                &[
                    ("sortby", OptionValue::Text("size".to_string())),
                    ("printentries", OptionValue::Flag(true)),
                ],
            ),
        )
        .unwrap();
    assert!(plan.output_dir.is_none());

    let (tx, _rx) = mpsc::unbounded_channel();
    let report = orchestrator.execute(plan, &tx, &CancelToken::new()).unwrap();

    assert_eq!(report.results[0].stdout, "Title: Forest\n");
    assert_eq!(
        calls(temp.path()),
        vec![format!("info -b size -e {}", input.display())]
    );
    assert!(!config.run.output_dir.exists());
}

#[test]
fn run_log_records_each_invocation() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(
        temp.path(),
        "case \"$*\" in *b.pkg*) echo \"broken\" >&2; exit 1;; esac",
    );
    let dir = temp.path().join("in");
    touch(&dir.join("a.pkg"));
    touch(&dir.join("b.pkg"));
    let mut config = config_for(&tool, temp.path());
    config.tool.log_enabled = true;
    config.tool.log_file = temp.path().join("logs.txt");

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(&[dir], &config.run.output_dir, options(Mode::Extract, &[]))
        .unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    orchestrator.execute(plan, &tx, &CancelToken::new()).unwrap();

    let log = fs::read_to_string(temp.path().join("logs.txt")).unwrap();
    assert_eq!(log.matches("=== Command ===").count(), 2);
    assert_eq!(log.matches("[No output]").count(), 2);
    assert!(log.contains("=== Error ===\nbroken\n"));
}

#[test]
fn cancelled_token_runs_nothing() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(temp.path(), "true");
    let dir = temp.path().join("in");
    touch(&dir.join("a.pkg"));
    touch(&dir.join("b.pkg"));
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(&[dir], &config.run.output_dir, options(Mode::Extract, &[]))
        .unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let (tx, _rx) = mpsc::unbounded_channel();
    let report = orchestrator.execute(plan, &tx, &cancel).unwrap();

    assert!(report.cancelled);
    assert_eq!(report.status, OverallStatus::Cancelled);
    assert_eq!(report.results.len(), 2);
    assert!(report
        .results
        .iter()
        .all(|r| r.status == RunStatus::Cancelled && r.command.is_empty()));
    assert!(calls(temp.path()).is_empty());
}

#[tokio::test]
async fn cancel_mid_run_kills_current_and_skips_rest() {
    let temp = TempDir::new().unwrap();
    let tool = fake_tool(
        temp.path(),
        "case \"$*\" in *b_slow.pkg*) exec sleep 30;; esac",
    );
    let dir = temp.path().join("in");
    touch(&dir.join("a.pkg"));
    touch(&dir.join("b_slow.pkg"));
    touch(&dir.join("c.pkg"));
    touch(&dir.join("d.pkg"));
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(&[dir], &config.run.output_dir, options(Mode::Extract, &[]))
        .unwrap();

    let started = Instant::now();
    let mut handle = orchestrator.start(plan, CancelToken::new());
    while let Some(event) = handle.next_event().await {
        if let RunEvent::ItemStarted { index: 1, .. } = event {
            // Give the shell time to log its call before it is killed.
            thread::sleep(Duration::from_millis(300));
            handle.request_cancel();
        }
    }
    let report = handle.wait().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(report.cancelled);
    assert_eq!(report.results.len(), 4);
    assert_eq!(report.results[0].status, RunStatus::Succeeded);
    assert!(report.results[1..]
        .iter()
        .all(|r| r.status == RunStatus::Cancelled));
    assert_eq!(report.status, OverallStatus::Cancelled);
    assert_eq!(calls(temp.path()).len(), 2);
}

#[tokio::test]
async fn cancel_returns_while_a_tool_subprocess_holds_the_pipes() {
    let temp = TempDir::new().unwrap();
    // No exec: the shell is killed but its `sleep` keeps stdout and stderr open.
    let tool = fake_tool(temp.path(), "echo working\nsleep 30\necho finished");
    let input = touch(&temp.path().join("scene.pkg"));
    let config = config_for(&tool, temp.path());

    let orchestrator = Orchestrator::new(&config).unwrap();
    let plan = orchestrator
        .plan(&[input], &config.run.output_dir, options(Mode::Extract, &[]))
        .unwrap();

    let started = Instant::now();
    let cancel = CancelToken::new();
    let mut handle = orchestrator.start(plan, cancel.clone());
    while let Some(event) = handle.next_event().await {
        if let RunEvent::ItemStarted { .. } = event {
            cancel_after(&cancel, Duration::from_millis(300));
        }
    }
    let report = handle.wait().await.unwrap();

    assert!(
        started.elapsed() < Duration::from_secs(5),
        "cancel took {:?}",
        started.elapsed()
    );
    assert_eq!(report.status, OverallStatus::Cancelled);
    assert_eq!(report.results[0].status, RunStatus::Cancelled);
    assert!(!report.results[0].stdout.contains("finished"));
}

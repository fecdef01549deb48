//! End-to-end: scripted run → JSONL file → leak report.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use mountlab_core::{LabConfig, MountLab};
use mountlab_harness::{JsonlSink, LeakReport, Script, run_script};
use serde_json::Value;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("mountlab_core=debug,mountlab_harness=debug")
        .try_init();
}

fn run_to_file(path: &Path, script: &str, count: u16, shutdown: bool) {
    let mut lab = MountLab::new(LabConfig::default().with_initial_count(count));
    let script = Script::parse(script).expect("script parses");
    let file = File::create(path).expect("create jsonl");
    let mut sink = JsonlSink::with_run_id(BufWriter::new(file), "it");
    run_script(&mut lab, &script, &mut sink, shutdown).expect("run");
}

fn analyze(path: &Path) -> LeakReport {
    let file = File::open(path).expect("open jsonl");
    LeakReport::from_reader(BufReader::new(file)).expect("parse report")
}

fn lines(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .expect("read jsonl")
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid json line"))
        .collect()
}

#[test]
fn full_session_with_teardown_is_clean() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    run_to_file(
        &path,
        "toggle; wait 500; remount; wait 200; inc; stress; wait 2000; stress",
        30,
        true,
    );

    let report = analyze(&path);
    assert!(report.is_clean(), "{report}");
    assert_eq!(report.created, report.destroyed);

    let lines = lines(&path);
    assert_eq!(lines.first().map(|v| v["event"].clone()), Some("run_start".into()));
    let last = lines.last().expect("footer");
    assert_eq!(last["event"], "run_complete");
    assert_eq!(last["run_id"], "it");
    assert_eq!(last["created"].as_u64(), Some(report.created));
    assert_eq!(last["duration_ms"], 2700);
}

#[test]
fn keeping_items_live_reports_them_as_leaked() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    run_to_file(&path, "toggle; wait 100; remount; wait 100", 20, false);

    let report = analyze(&path);
    assert!(!report.is_clean());
    assert_eq!(report.leaked.len(), 20);
    // Generation 1 was fully torn down by the remount; only generation 2 is live.
    assert_eq!(report.leaked_by_generation.len(), 1);
    assert_eq!(report.leaked_by_generation.get(&2), Some(&20));
    assert!(report.double_destroyed.is_empty());
    assert!(report.orphaned.is_empty());
}

#[test]
fn remount_destroys_old_generation_before_new_one_appears() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    run_to_file(&path, "toggle; remount; wait 100", 10, false);

    let item_events: Vec<(String, u64)> = lines(&path)
        .iter()
        .filter(|v| matches!(v["event"].as_str(), Some("item_created" | "item_destroyed")))
        .map(|v| {
            (
                v["event"].as_str().unwrap_or_default().to_string(),
                v["generation"].as_u64().unwrap_or_default(),
            )
        })
        .collect();
    let last_gen1_destroy = item_events
        .iter()
        .rposition(|(e, g)| e == "item_destroyed" && *g == 1)
        .expect("generation 1 destroyed");
    let first_gen2_create = item_events
        .iter()
        .position(|(e, g)| e == "item_created" && *g == 2)
        .expect("generation 2 created");
    assert!(last_gen1_destroy < first_gen2_create);
}

#[test]
fn rejected_intents_are_visible_in_the_stream() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    run_to_file(&path, "stress; toggle; remount; stress", 10, true);

    let rejected: Vec<Value> = lines(&path)
        .into_iter()
        .filter(|v| v["event"] == "intent_rejected")
        .collect();
    assert_eq!(rejected.len(), 2);
    assert_eq!(rejected[0]["intent"], "toggle_mount");
    assert_eq!(rejected[1]["intent"], "remount");
    assert!(analyze(&path).is_clean());
}

//! Replay and decide against files on disk.

use std::fs;
use std::path::Path;

use fleet_core::engine::FleetEngine;
use fleet_core::snapshot::WorldSnapshot;
use fleet_headless::{decide_file, replay_dir, HeadlessError};
use fleet_test_utils::fixtures;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::Value;

fn write_snapshot(dir: &Path, name: &str, snapshot: &WorldSnapshot) {
    fs::write(dir.join(name), serde_json::to_string(snapshot).unwrap()).unwrap();
}

fn engine() -> FleetEngine {
    FleetEngine::new(fixtures::config()).unwrap()
}

fn lines(out: &[u8]) -> Vec<Value> {
    String::from_utf8(out.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_replay_writes_one_line_per_tick_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut late = fixtures::trade_lane();
    late.tick = 9;
    write_snapshot(dir.path(), "0002.json", &late);
    write_snapshot(dir.path(), "0001.json", &fixtures::trade_lane());

    let mut out = Vec::new();
    let summary = replay_dir(&engine(), dir.path(), &mut SmallRng::seed_from_u64(0), &mut out).unwrap();
    assert_eq!(summary.decided, 2);

    let lines = lines(&out);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["tick"], 2);
    assert_eq!(lines[1]["tick"], 9);
    assert_eq!(lines[0]["commands"]["1"]["type"], "trade");
    assert_eq!(lines[0]["commands"]["1"]["amount"], 100);
}

#[test]
fn test_replay_survives_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), "a.json", &fixtures::trade_lane());
    fs::write(dir.path().join("b.json"), "not json").unwrap();
    // Player 99 is not in the snapshot, so the engine fails on it.
    write_snapshot(dir.path(), "c.json", &WorldSnapshot::new(99, 3));
    write_snapshot(dir.path(), "d.json", &fixtures::skirmish());

    let mut out = Vec::new();
    let summary = replay_dir(&engine(), dir.path(), &mut SmallRng::seed_from_u64(0), &mut out).unwrap();
    assert_eq!(summary.decided, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.transport_errors, 1);
    assert_eq!(lines(&out).len(), 2);
}

#[test]
fn test_empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = replay_dir(&engine(), dir.path(), &mut SmallRng::seed_from_u64(0), Vec::new());
    assert!(matches!(result, Err(HeadlessError::NoSnapshots(_))));
}

#[test]
fn test_decide_persists_memory_between_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("tick.json");
    let memory_path = dir.path().join("memory.bin");
    write_snapshot(dir.path(), "tick.json", &fixtures::trade_lane());

    let mut rng = SmallRng::seed_from_u64(0);
    let mut out = Vec::new();
    let first = decide_file(&engine(), &snapshot_path, Some(memory_path.as_path()), &mut rng, &mut out).unwrap();
    assert!(memory_path.exists());
    let second = decide_file(&engine(), &snapshot_path, Some(memory_path.as_path()), &mut rng, &mut out).unwrap();

    assert_eq!(first.memory.positions.get(&1).map(|h| h.len()), Some(1));
    assert_eq!(second.memory.positions.get(&1).map(|h| h.len()), Some(2));
    assert_eq!(lines(&out).len(), 2);
}

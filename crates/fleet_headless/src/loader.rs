//! File loading for configuration, snapshots and persisted memory.

use std::fs;
use std::path::{Path, PathBuf};

use fleet_core::config::EngineConfig;
use fleet_core::memory::EngineMemory;
use fleet_core::snapshot::WorldSnapshot;

use crate::error::{HeadlessError, Result};

/// Load an engine configuration from a RON file, or defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content = fs::read_to_string(path)?;
    let config: EngineConfig = ron::from_str(&content)?;
    config.validate()?;
    tracing::debug!(path = %path.display(), "Loaded engine config");
    Ok(config)
}

/// Load a snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<WorldSnapshot> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load persisted memory, or empty memory when the file does not exist yet.
pub fn load_memory(path: &Path) -> Result<EngineMemory> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No memory file, starting fresh");
        return Ok(EngineMemory::new());
    }
    let bytes = fs::read(path)?;
    Ok(EngineMemory::from_bytes(&bytes)?)
}

/// Persist memory for the next invocation.
pub fn save_memory(path: &Path, memory: &EngineMemory) -> Result<()> {
    fs::write(path, memory.to_bytes()?)?;
    Ok(())
}

/// Every `*.json` file in `dir`, in lexical order.
pub fn snapshot_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(HeadlessError::NoSnapshots(dir.to_path_buf()));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_out_of_range_snapshot_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tick.json");
        let json = r#"{"player_id": 1, "tick": 1, "nodes": {"9": {"id": 9, "position": [0, 9000000000000000000]}}}"#;
        fs::write(&path, json).unwrap();
        assert!(matches!(load_snapshot(&path), Err(HeadlessError::Json(_))));
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        fs::write(&path, "(allied_players: [\"friends\"], maintenance: (history_len: 4))").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert!(config.is_allied("friends"));
        assert_eq!(config.maintenance.history_len, 4);
    }

    #[test]
    fn test_bad_config_is_a_ron_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");
        fs::write(&path, "(trade: oops").unwrap();
        assert!(matches!(load_config(Some(path.as_path())), Err(HeadlessError::Ron(_))));
    }

    #[test]
    fn test_memory_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.bin");
        assert_eq!(load_memory(&path).unwrap(), EngineMemory::new());

        let memory = EngineMemory {
            sticky_target: Some(42),
            ..EngineMemory::default()
        };
        save_memory(&path, &memory).unwrap();
        assert_eq!(load_memory(&path).unwrap(), memory);
    }

    #[test]
    fn test_snapshot_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt", "c.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let names: Vec<_> = snapshot_files(dir.path())
            .unwrap()
            .iter()
            .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, ["a.json", "b.json", "c.json"]);

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(snapshot_files(empty.path()), Err(HeadlessError::NoSnapshots(_))));
    }
}

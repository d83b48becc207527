use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::DragSession;

/// State carried between `tn` invocations (written to state.json)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliState {
    /// A drag started by `tn drag` and not yet dropped or cancelled
    #[serde(default)]
    pub drag: DragSession,
}

pub fn state_path(config_dir: &Path) -> PathBuf {
    config_dir.join("state.json")
}

/// Read persisted state. Missing or malformed files read as `None`.
pub fn read_state(config_dir: &Path) -> Option<CliState> {
    let content = fs::read_to_string(state_path(config_dir)).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn write_state(config_dir: &Path, state: &CliState) -> std::io::Result<()> {
    fs::create_dir_all(config_dir)?;
    let content = serde_json::to_string_pretty(state)?;
    fs::write(state_path(config_dir), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{ListId, TaskId};
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let state = CliState {
            drag: DragSession::Dragging {
                task_id: TaskId(4),
                from_list: ListId(1),
            },
        };
        write_state(dir.path(), &state).unwrap();
        assert_eq!(read_state(dir.path()), Some(state));
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_state(dir.path()).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        fs::write(state_path(dir.path()), "not json {{{").unwrap();
        assert!(read_state(dir.path()).is_none());
    }

    #[test]
    fn empty_object_is_idle() {
        let state: CliState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.drag, DragSession::Idle);
    }
}

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::actions::Slot;
use crate::error::FlowError;
use crate::error::FlowResult;
use crate::state::StudyProfile;
use crate::state::TaskBoard;

pub const STATE_SCHEMA_VERSION: u16 = 1;

/// On-disk wrapper around a state tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSlot<T> {
    pub version: u16,
    pub saved_at_ms: i64,
    pub state: T,
}

/// One JSON file per application under a data directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.file_name())
    }

    /// `Ok(None)` when nothing was saved yet.
    pub fn load<T: DeserializeOwned>(&self, slot: Slot) -> FlowResult<Option<T>> {
        let path = self.path(slot);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        let raw = serde_json::from_slice::<Value>(&bytes).map_err(|err| FlowError::CorruptState {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        let migrated = migrate(slot, raw, &path)?;
        let persisted = serde_json::from_value::<PersistedSlot<T>>(migrated).map_err(|err| {
            FlowError::CorruptState {
                path: path.clone(),
                reason: err.to_string(),
            }
        })?;
        debug!(path = %path.display(), saved_at_ms = persisted.saved_at_ms, "slot loaded");
        Ok(Some(persisted.state))
    }

    pub fn save<T: Serialize>(&self, slot: Slot, state: &T) -> FlowResult<()> {
        let persisted = PersistedSlot {
            version: STATE_SCHEMA_VERSION,
            saved_at_ms: chrono::Utc::now().timestamp_millis(),
            state,
        };
        let encoded = serde_json::to_vec_pretty(&persisted)?;
        let path = self.path(slot);
        write_atomic(&path, &encoded)?;
        debug!(path = %path.display(), bytes = encoded.len(), "slot saved");
        Ok(())
    }

    pub fn load_tasks(&self) -> FlowResult<TaskBoard> {
        Ok(self.load::<TaskBoard>(Slot::Tasks)?.unwrap_or_default())
    }

    /// A stored profile comes back with its timer paused; `fallback` builds
    /// the profile used when nothing was stored yet.
    pub fn load_study(&self, fallback: impl FnOnce() -> StudyProfile) -> FlowResult<StudyProfile> {
        match self.load::<StudyProfile>(Slot::Study)? {
            Some(mut profile) => {
                profile.timer = profile.timer.restored();
                Ok(profile)
            }
            None => {
                info!("no stored study profile, creating one");
                Ok(fallback())
            }
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut opts = OpenOptions::new();
    opts.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(&tmp)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp, path)
}

/// Brings any stored layout up to the current envelope.
pub fn migrate(slot: Slot, raw: Value, path: &Path) -> FlowResult<Value> {
    match raw {
        Value::Array(items) if slot == Slot::Tasks => {
            info!(path = %path.display(), count = items.len(), "migrating legacy task list");
            Ok(json!({
                "version": STATE_SCHEMA_VERSION,
                "saved_at_ms": 0,
                "state": migrate_legacy_tasks(items),
            }))
        }
        Value::Object(map) => {
            let Some(found) = map.get("version").and_then(Value::as_u64) else {
                return Err(FlowError::CorruptState {
                    path: path.to_path_buf(),
                    reason: "missing schema version".to_string(),
                });
            };
            if found > u64::from(STATE_SCHEMA_VERSION) {
                return Err(FlowError::UnsupportedVersion {
                    path: path.to_path_buf(),
                    found,
                    supported: STATE_SCHEMA_VERSION,
                });
            }
            Ok(Value::Object(map))
        }
        _ => Err(FlowError::CorruptState {
            path: path.to_path_buf(),
            reason: "unexpected top-level value".to_string(),
        }),
    }
}

/// The first layout was a bare array of tasks with numeric ids and
/// camelCase keys.
fn migrate_legacy_tasks(items: Vec<Value>) -> Value {
    let mut tasks = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let Value::Object(old) = item else {
            continue;
        };
        let id = match old.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(n)) => format!("legacy-{n}"),
            _ => format!("legacy-{idx}"),
        };
        let priority = old
            .get("priority")
            .and_then(Value::as_str)
            .and_then(crate::state::Priority::parse)
            .unwrap_or(crate::state::Priority::Medium);
        let published = old
            .get("isPublished")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let points = old
            .get("impactPoints")
            .and_then(Value::as_u64)
            .filter(|_| published);

        let mut task = Map::new();
        task.insert("id".into(), Value::String(id));
        task.insert(
            "title".into(),
            Value::String(
                old.get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
        );
        task.insert("priority".into(), json!(priority));
        task.insert(
            "completed".into(),
            Value::Bool(old.get("completed").and_then(Value::as_bool).unwrap_or(false)),
        );
        task.insert("published".into(), Value::Bool(published));
        task.insert("points".into(), json!(points));
        task.insert(
            "created_at_ms".into(),
            json!(old
                .get("createdAt")
                .and_then(Value::as_f64)
                .map_or(0, |ms| ms as i64)),
        );
        tasks.push(Value::Object(task));
    }
    json!({ "tasks": tasks, "next_seq": 1 })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::state::Priority;
    use crate::state::TaskId;
    use crate::timer::TimerPhase;

    #[test]
    fn missing_slots_load_as_defaults() {
        let dir = tempdir().expect("tmpdir");
        let store = StateStore::open(dir.path()).expect("open");
        assert_eq!(store.load_tasks().expect("tasks"), TaskBoard::default());
        let study = store.load_study(StudyProfile::default).expect("study");
        assert_eq!(study, StudyProfile::default());
    }

    #[test]
    fn saved_board_loads_back() {
        let dir = tempdir().expect("tmpdir");
        let store = StateStore::open(dir.path()).expect("open");
        let mut board = TaskBoard::default();
        board.prepend("revise notes".to_string(), Priority::High, 1_700_000_000_000);
        board.extracting = true;

        store.save(Slot::Tasks, &board).expect("save");
        let loaded = store.load_tasks().expect("load");
        assert_eq!(loaded.tasks, board.tasks);
        assert_eq!(loaded.next_seq, board.next_seq);
        assert!(!loaded.extracting);

        let raw: Value =
            serde_json::from_slice(&std::fs::read(store.path(Slot::Tasks)).expect("read"))
                .expect("json");
        assert_eq!(raw["version"], json!(STATE_SCHEMA_VERSION));
        assert!(raw["state"].get("timer").is_none());
    }

    #[test]
    fn running_study_timer_is_restored_paused() {
        let dir = tempdir().expect("tmpdir");
        let store = StateStore::open(dir.path()).expect("open");
        let mut profile = StudyProfile::default();
        profile.timer.toggle();
        profile.timer.tick();
        store.save(Slot::Study, &profile).expect("save");

        let loaded = store.load_study(StudyProfile::default).expect("load");
        assert_eq!(loaded.timer.phase, TimerPhase::Idle);
        assert_eq!(loaded.timer.remaining_secs, profile.timer.remaining_secs);
    }

    #[test]
    fn legacy_task_array_is_migrated() {
        let dir = tempdir().expect("tmpdir");
        let store = StateStore::open(dir.path()).expect("open");
        let legacy = json!([
            {
                "id": 1712345678901.25,
                "title": "Finish essay",
                "priority": "high",
                "completed": true,
                "isPublished": true,
                "impactPoints": 50,
                "createdAt": 1712345678901_i64
            },
            {
                "id": 1712345678999_i64,
                "title": "Call mom",
                "priority": "urgent",
                "completed": false,
                "createdAt": 1712345678999_i64
            }
        ]);
        std::fs::write(store.path(Slot::Tasks), legacy.to_string()).expect("write");

        let board = store.load_tasks().expect("load");
        assert_eq!(board.tasks.len(), 2);
        assert_eq!(board.tasks[0].id, TaskId("legacy-1712345678901.25".to_string()));
        assert_eq!(board.tasks[0].points, Some(50));
        assert!(board.tasks[0].published);
        assert_eq!(board.tasks[1].priority, Priority::Medium);
        assert_eq!(board.tasks[1].points, None);
        assert_eq!(board.tasks[1].created_at_ms, 1712345678999);
        assert_eq!(board.total_points(), 50);
    }

    #[test]
    fn future_versions_are_rejected() {
        let dir = tempdir().expect("tmpdir");
        let store = StateStore::open(dir.path()).expect("open");
        std::fs::write(
            store.path(Slot::Study),
            json!({ "version": 9, "saved_at_ms": 0, "state": {} }).to_string(),
        )
        .expect("write");

        let err = store
            .load_study(StudyProfile::default)
            .expect_err("newer schema");
        assert!(matches!(err, FlowError::UnsupportedVersion { found: 9, .. }));
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let dir = tempdir().expect("tmpdir");
        let store = StateStore::open(dir.path()).expect("open");
        std::fs::write(store.path(Slot::Tasks), b"{not json").expect("write");
        assert!(matches!(
            store.load_tasks(),
            Err(FlowError::CorruptState { .. })
        ));

        std::fs::write(store.path(Slot::Study), b"[1, 2, 3]").expect("write");
        assert!(matches!(
            store.load_study(StudyProfile::default),
            Err(FlowError::CorruptState { .. })
        ));
    }
}

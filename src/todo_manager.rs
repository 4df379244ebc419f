use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::task::{parse_due_date, Task, DATE_FMT};

/// What the last [`TodoManager::load`] found at the storage path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No file yet; the collection starts empty.
    Missing,
    /// The file parsed into this many tasks.
    Loaded(usize),
    /// The file exists but could not be parsed. The collection was reset to empty,
    /// and the next save overwrites the unreadable content.
    Corrupt(String),
}

/// Field updates for [`TodoManager::edit`]. `None` leaves a field untouched.
///
/// For `due`, an empty string clears the deadline.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due: Option<String>,
}

/// Owns the task collection and keeps the storage file in sync with it.
#[derive(Debug)]
pub struct TodoManager {
    storage_path: PathBuf,
    tasks: Vec<Task>,
    /// `None` once the largest id reaches `u32::MAX`.
    next_id: Option<u32>,
    load_outcome: LoadOutcome,
}

impl TodoManager {
    /// Binds a store to `storage_path` and loads whatever is there.
    pub fn open(storage_path: impl Into<PathBuf>) -> Result<Self> {
        let mut manager = Self {
            storage_path: storage_path.into(),
            tasks: Vec::new(),
            next_id: Some(1),
            load_outcome: LoadOutcome::Missing,
        };
        manager.load()?;
        Ok(manager)
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    /// Replaces the in-memory collection with the file content.
    ///
    /// Unparseable content resets the collection to empty and is reported as
    /// [`LoadOutcome::Corrupt`] rather than as an error.
    pub fn load(&mut self) -> Result<LoadOutcome> {
        let (tasks, outcome) = match fs::read(&self.storage_path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<Task>>(&bytes) {
                Ok(tasks) => {
                    let count = tasks.len();
                    (tasks, LoadOutcome::Loaded(count))
                }
                Err(err) => {
                    warn!(
                        path = %self.storage_path.display(),
                        error = %err,
                        "storage file is unreadable, starting with an empty list"
                    );
                    (Vec::new(), LoadOutcome::Corrupt(err.to_string()))
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => (Vec::new(), LoadOutcome::Missing),
            Err(err) => return Err(err.into()),
        };

        self.tasks = tasks;
        self.next_id = self.tasks.iter().map(|t| t.id).max().unwrap_or(0).checked_add(1);
        self.load_outcome = outcome.clone();
        debug!(
            path = %self.storage_path.display(),
            tasks = self.tasks.len(),
            next_id = ?self.next_id,
            "loaded tasks"
        );
        Ok(outcome)
    }

    /// Rewrites the whole storage file from the current collection.
    ///
    /// The JSON is written to a sibling temp file first and renamed into place.
    pub fn save(&self) -> Result<()> {
        let dir = match self.storage_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        // Temp files are created 0600; keep whatever mode the storage file had.
        match fs::metadata(&self.storage_path) {
            Ok(meta) => file.as_file().set_permissions(meta.permissions())?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        serde_json::to_writer_pretty(&mut file, &self.tasks)?;
        file.write_all(b"\n")?;
        file.flush()?;
        file.persist(&self.storage_path)?;

        debug!(
            path = %self.storage_path.display(),
            tasks = self.tasks.len(),
            "saved tasks"
        );
        Ok(())
    }

    pub fn add(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        due: Option<&str>,
    ) -> Result<Task> {
        let due = match due {
            Some(text) => normalize_due(text)?,
            None => None,
        };

        let id = self.next_id.ok_or(StoreError::IdsExhausted)?;

        let task = Task::new(id, title.into(), description.into(), due);
        self.tasks.push(task.clone());
        self.next_id = id.checked_add(1);
        self.save()?;

        info!(id = task.id, "task added");
        Ok(task)
    }

    /// Applies `patch` to the task with `id`. Returns `Ok(None)` if there is no such task.
    ///
    /// A malformed due date fails before any field is touched.
    pub fn edit(&mut self, id: u32, patch: TaskPatch) -> Result<Option<Task>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        let due = patch.due.as_deref().map(normalize_due).transpose()?;

        let task = &mut self.tasks[index];
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(due) = due {
            task.due = due;
        }
        let updated = task.clone();
        self.save()?;

        info!(id, "task edited");
        Ok(Some(updated))
    }

    pub fn delete(&mut self, id: u32) -> Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            self.save()?;
            info!(id, "task deleted");
        }
        Ok(removed)
    }

    pub fn toggle(&mut self, id: u32) -> Result<Option<Task>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        let task = &mut self.tasks[index];
        task.toggle();
        let updated = task.clone();
        self.save()?;

        info!(id, done = updated.done, "task toggled");
        Ok(Some(updated))
    }

    pub fn all(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn get(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn due_on(&self, date: NaiveDate) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.due_date() == Some(date))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring match on title or description.
    pub fn search(&self, keyword: &str) -> Vec<Task> {
        let key = keyword.trim().to_lowercase();
        self.tasks
            .iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&key) || t.description.to_lowercase().contains(&key)
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn position(&self, id: u32) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }
}

/// Empty text means "no deadline"; anything else must be a valid date and is
/// stored zero-padded.
fn normalize_due(text: &str) -> Result<Option<String>> {
    if text.is_empty() {
        return Ok(None);
    }
    parse_due_date(text)
        .map(|date| Some(date.format(DATE_FMT).to_string()))
        .ok_or_else(|| StoreError::InvalidDueDate(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, TodoManager) {
        let dir = TempDir::new().unwrap();
        let store = TodoManager::open(dir.path().join("storage.json")).unwrap();
        (dir, store)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_file_starts_empty() {
        let (_dir, store) = open_store();
        assert!(store.is_empty());
        assert_eq!(store.load_outcome(), &LoadOutcome::Missing);
        assert!(!store.storage_path().exists());
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let (_dir, mut store) = open_store();
        let ids: Vec<u32> = (0..5)
            .map(|i| store.add(format!("task {i}"), "", None).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn deleted_ids_are_not_reused_in_session() {
        let (_dir, mut store) = open_store();
        store.add("a", "", None).unwrap();
        let b = store.add("b", "", None).unwrap();
        assert!(store.delete(b.id).unwrap());
        let c = store.add("c", "", None).unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn next_id_follows_max_id_after_reload() {
        let (dir, mut store) = open_store();
        store.add("a", "", None).unwrap();
        store.add("b", "", None).unwrap();
        store.add("c", "", None).unwrap();
        store.delete(2).unwrap();

        let mut reopened = TodoManager::open(dir.path().join("storage.json")).unwrap();
        assert_eq!(reopened.load_outcome(), &LoadOutcome::Loaded(2));
        assert_eq!(reopened.add("d", "", None).unwrap().id, 4);
    }

    #[test]
    fn save_then_load_round_trips() {
        let (dir, mut store) = open_store();
        store.add("Buy milk", "2L, 저지방", Some("2025-11-12")).unwrap();
        store.add("Call mom", "", None).unwrap();
        store.add("Pay rent", "", Some("2025-12-01")).unwrap();
        store.toggle(2).unwrap();

        let reopened = TodoManager::open(dir.path().join("storage.json")).unwrap();
        assert_eq!(reopened.all(), store.all());
    }

    #[test]
    fn storage_is_indented_json_with_unicode() {
        let (_dir, mut store) = open_store();
        store.add("우유 사기", "", None).unwrap();
        let content = fs::read_to_string(store.storage_path()).unwrap();
        assert!(content.starts_with("[\n  {\n    \"id\": 1,"));
        assert!(content.contains("\"title\": \"우유 사기\""));
        assert!(content.contains("\"due\": null"));
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("todo").join("storage.json");
        let mut store = TodoManager::open(&path).unwrap();
        store.add("a", "", None).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn add_rejects_invalid_due_without_touching_storage() {
        let (_dir, mut store) = open_store();
        store.add("keep", "", None).unwrap();
        let before = fs::read_to_string(store.storage_path()).unwrap();

        let err = store.add("x", "", Some("2025-13-40")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDueDate(ref text) if text == "2025-13-40"));
        assert_eq!(store.len(), 1);
        assert_eq!(fs::read_to_string(store.storage_path()).unwrap(), before);
        assert_eq!(store.add("next", "", None).unwrap().id, 2);
    }

    #[test]
    fn add_with_empty_due_has_no_deadline() {
        let (_dir, mut store) = open_store();
        let task = store.add("x", "", Some("")).unwrap();
        assert_eq!(task.due, None);
    }

    #[test]
    fn add_stores_canonical_due() {
        let (_dir, mut store) = open_store();
        let task = store.add("x", "", Some("2025-1-5")).unwrap();
        assert_eq!(task.due.as_deref(), Some("2025-01-05"));
    }

    #[test]
    fn toggle_twice_restores_state() {
        let (_dir, mut store) = open_store();
        let task = store.add("Buy milk", "", None).unwrap();
        assert!(store.toggle(task.id).unwrap().unwrap().done);
        assert!(!store.toggle(task.id).unwrap().unwrap().done);
    }

    #[test]
    fn toggle_unknown_id_is_none() {
        let (_dir, mut store) = open_store();
        assert_eq!(store.toggle(42).unwrap(), None);
        assert!(!store.storage_path().exists());
    }

    #[test]
    fn delete_present_and_absent() {
        let (_dir, mut store) = open_store();
        let a = store.add("a", "", None).unwrap();
        store.add("b", "", None).unwrap();

        assert!(store.delete(a.id).unwrap());
        assert_eq!(store.len(), 1);
        assert!(store.get(a.id).is_none());

        assert!(!store.delete(a.id).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_absent_does_not_write() {
        let (_dir, mut store) = open_store();
        assert!(!store.delete(1).unwrap());
        assert!(!store.storage_path().exists());
    }

    #[test]
    fn edit_updates_given_fields_only() {
        let (_dir, mut store) = open_store();
        let task = store.add("old", "desc", Some("2025-11-12")).unwrap();

        let updated = store
            .edit(
                task.id,
                TaskPatch {
                    title: Some("new".into()),
                    ..TaskPatch::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.description, "desc");
        assert_eq!(updated.due.as_deref(), Some("2025-11-12"));
        assert_eq!(updated.created_at, task.created_at);
    }

    #[test]
    fn edit_with_empty_due_clears_deadline() {
        let (_dir, mut store) = open_store();
        let task = store.add("x", "", Some("2025-11-12")).unwrap();
        let patch = TaskPatch {
            due: Some(String::new()),
            ..TaskPatch::default()
        };
        let updated = store.edit(task.id, patch).unwrap().unwrap();
        assert_eq!(updated.due, None);
    }

    #[test]
    fn edit_with_invalid_due_leaves_task_unchanged() {
        let (_dir, mut store) = open_store();
        let task = store.add("x", "d", Some("2025-11-12")).unwrap();
        let before = fs::read_to_string(store.storage_path()).unwrap();

        let patch = TaskPatch {
            title: Some("changed".into()),
            description: Some("changed".into()),
            due: Some("2025-02-30".into()),
        };
        assert!(matches!(
            store.edit(task.id, patch),
            Err(StoreError::InvalidDueDate(_))
        ));
        assert_eq!(store.get(task.id), Some(&task));
        assert_eq!(fs::read_to_string(store.storage_path()).unwrap(), before);
    }

    #[test]
    fn edit_unknown_id_is_none() {
        let (_dir, mut store) = open_store();
        assert_eq!(store.edit(9, TaskPatch::default()).unwrap(), None);
    }

    #[test]
    fn all_returns_snapshot() {
        let (_dir, mut store) = open_store();
        store.add("a", "", None).unwrap();
        let mut snapshot = store.all();
        snapshot.clear();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn search_is_trimmed_and_case_insensitive() {
        let (_dir, mut store) = open_store();
        store.add("Buy Milk", "", None).unwrap();
        store.add("Groceries", "oat milk and bread", None).unwrap();
        store.add("Buy eggs", "", None).unwrap();

        let titles: Vec<String> = store.search("  milk ").into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["Buy Milk", "Groceries"]);
    }

    #[test]
    fn due_on_matches_exact_date() {
        let (_dir, mut store) = open_store();
        store.add("a", "", Some("2025-11-12")).unwrap();
        store.add("b", "", None).unwrap();
        store.add("c", "", Some("2025-11-13")).unwrap();
        store.add("d", "", Some("2025-11-12")).unwrap();

        let titles: Vec<String> = store
            .due_on(date(2025, 11, 12))
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["a", "d"]);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{ not json").unwrap();

        let store = TodoManager::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.load_outcome(), LoadOutcome::Corrupt(_)));
    }

    #[test]
    fn wrong_shape_counts_as_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, r#"{"tasks": []}"#).unwrap();

        let store = TodoManager::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.load_outcome(), LoadOutcome::Corrupt(_)));
    }

    #[test]
    fn load_applies_defaults_to_sparse_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, r#"[{"id": 4, "title": "only title"}, {"id": 9, "due": "2025-11-12"}]"#)
            .unwrap();

        let mut store = TodoManager::open(&path).unwrap();
        assert_eq!(store.load_outcome(), &LoadOutcome::Loaded(2));
        let first = store.get(4).unwrap();
        assert_eq!(first.title, "only title");
        assert_eq!(first.description, "");
        assert!(!first.done);
        assert!(!first.created_at.is_empty());
        assert_eq!(store.due_on(date(2025, 11, 12)).len(), 1);
        assert_eq!(store.add("next", "", None).unwrap().id, 10);
    }

    #[test]
    fn max_id_in_file_does_not_overflow() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, r#"[{"id": 4294967295, "title": "big"}]"#).unwrap();

        let mut store = TodoManager::open(&path).unwrap();
        assert_eq!(store.load_outcome(), &LoadOutcome::Loaded(1));
        assert_eq!(store.get(u32::MAX).unwrap().title, "big");

        let before = fs::read_to_string(&path).unwrap();
        assert!(matches!(
            store.add("next", "", None),
            Err(StoreError::IdsExhausted)
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn last_free_id_is_handed_out_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, r#"[{"id": 4294967294}]"#).unwrap();

        let mut store = TodoManager::open(&path).unwrap();
        assert_eq!(store.add("last", "", None).unwrap().id, u32::MAX);
        assert!(matches!(
            store.add("overflow", "", None),
            Err(StoreError::IdsExhausted)
        ));
    }

    #[test]
    fn invalid_utf8_counts_as_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, [0xff, 0xfe, b'[']).unwrap();

        let store = TodoManager::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.load_outcome(), LoadOutcome::Corrupt(_)));
    }

    #[test]
    fn save_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("data");
        let mut store = TodoManager::open(parent.join("storage.json")).unwrap();
        fs::write(&parent, "a regular file").unwrap();

        assert!(matches!(
            store.add("a", "", None),
            Err(StoreError::Io(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_storage_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, mut store) = open_store();
        store.add("a", "", None).unwrap();
        fs::set_permissions(store.storage_path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.add("b", "", None).unwrap();
        let mode = fs::metadata(store.storage_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}

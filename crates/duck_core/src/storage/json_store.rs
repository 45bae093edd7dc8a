use super::{ReminderStore, StoreState, TaskStore};
use crate::config::app_dir;
use crate::error::AppError;
use crate::model::{Reminder, TaskItem};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::PrimitiveDateTime;
use tokio::sync::Mutex;

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "store.json";
const STORE_ENV_VAR: &str = "DUCKMODE_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    schema_version: u32,
    #[serde(default)]
    tasks: Vec<TaskItem>,
    #[serde(default)]
    reminders: Vec<Reminder>,
}

/// Resolve the store file: environment first, then the configured path, then
/// the per-user default.
pub fn store_path(configured: Option<&Path>) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    Ok(app_dir()?.join(STORE_FILE_NAME))
}

async fn load_state(path: &Path) -> Result<StoreState, AppError> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(StoreState::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let stored: StoredState = serde_json::from_str(&content)?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(StoreState {
        tasks: stored.tasks,
        reminders: stored.reminders,
    })
}

async fn save_state(path: &Path, state: &StoreState) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let stored = StoredState {
        schema_version: SCHEMA_VERSION,
        tasks: state.tasks.clone(),
        reminders: state.reminders.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)?;
    tokio::fs::write(path, content).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(path, permissions).await?;
    }

    Ok(())
}

/// Both stores backed by a single JSON document.
///
/// Every call re-reads the file so several processes (the CLI and a running
/// `duck run`) see each other's writes; the mutex only serialises
/// read-modify-write cycles within this process.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreState, AppError> {
        load_state(&self.path).await
    }

    async fn modify<F>(&self, apply: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut StoreState) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut state = load_state(&self.path).await?;
        apply(&mut state);
        save_state(&self.path, &state).await?;
        debug!("saved store to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonStore {
    async fn upsert_task(&self, task: &TaskItem) -> Result<(), AppError> {
        self.modify(|state| state.upsert_task(task)).await
    }

    async fn get_task(&self, id: &str) -> Result<Option<TaskItem>, AppError> {
        Ok(self.read().await?.get_task(id))
    }

    async fn upcoming_before(&self, until: PrimitiveDateTime) -> Result<Vec<TaskItem>, AppError> {
        Ok(self.read().await?.upcoming_before(until))
    }
}

#[async_trait]
impl ReminderStore for JsonStore {
    async fn upsert_reminder(&self, reminder: &Reminder) -> Result<(), AppError> {
        self.modify(|state| state.upsert_reminder(reminder)).await
    }

    async fn pending_before(&self, now: PrimitiveDateTime) -> Result<Vec<Reminder>, AppError> {
        Ok(self.read().await?.pending_before(now))
    }

    async fn pending_for_task(&self, task_id: &str) -> Result<Vec<Reminder>, AppError> {
        Ok(self.read().await?.pending_for_task(task_id))
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonStore, SCHEMA_VERSION};
    use crate::model::{Reminder, ReminderType, TaskItem};
    use crate::storage::{ReminderStore, TaskStore};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::macros::datetime;

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("duckmode-{nanos}-{file_name}"))
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let store = JsonStore::new(temp_path("missing.json"));
        assert!(store.get_task("task-1").await.unwrap().is_none());
        assert!(
            store
                .pending_before(datetime!(2030-01-01 00:00:00))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn tasks_and_reminders_survive_a_new_handle() {
        let path = temp_path("round-trip.json");
        let now = datetime!(2024-01-01 09:00:00);
        let task = TaskItem::new("họp", now).with_due(datetime!(2024-01-01 09:10:00), 9);
        let reminder = Reminder::deadline(&task.id, datetime!(2024-01-01 09:01:00));

        let store = JsonStore::new(&path);
        store.upsert_task(&task).await.unwrap();
        store.upsert_reminder(&reminder).await.unwrap();

        let reopened = JsonStore::new(&path);
        let loaded = reopened.get_task(&task.id).await.unwrap();
        let pending = reopened
            .pending_before(datetime!(2024-01-01 09:05:00))
            .await
            .unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, Some(task));
        assert_eq!(pending, vec![reminder]);
    }

    #[tokio::test]
    async fn dates_are_stored_as_local_strings() {
        let path = temp_path("format.json");
        let store = JsonStore::new(&path);
        let reminder = Reminder::water_break(datetime!(2024-01-01 09:15:00));
        store.upsert_reminder(&reminder).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(raw["schema_version"], SCHEMA_VERSION);
        assert_eq!(raw["reminders"][0]["trigger_at"], "2024-01-01T09:15:00");
        assert_eq!(raw["reminders"][0]["kind"], "water_break");
        assert_eq!(raw["reminders"][0]["sent"], false);
        assert_eq!(reminder.kind, ReminderType::WaterBreak);
    }

    #[tokio::test]
    async fn schema_version_must_match() {
        let path = temp_path("bad-schema.json");
        let bad = format!(
            "{{\n  \"schema_version\": {},\n  \"tasks\": []\n}}",
            SCHEMA_VERSION + 1
        );
        fs::write(&path, bad).unwrap();

        let err = JsonStore::new(&path).get_task("task-1").await.unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[tokio::test]
    async fn rejects_malformed_dates() {
        let path = temp_path("bad-date.json");
        let content = "{\n  \"schema_version\": 1,\n  \"reminders\": [\n    {\n      \"id\": \"reminder-1\",\n      \"trigger_at\": \"tomorrow\",\n      \"kind\": \"deadline\"\n    }\n  ]\n}";
        fs::write(&path, content).unwrap();

        let err = JsonStore::new(&path)
            .pending_before(datetime!(2024-01-01 09:00:00))
            .await
            .unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[tokio::test]
    async fn accepts_minimal_task_records() {
        let path = temp_path("minimal.json");
        let content = "{\n  \"schema_version\": 1,\n  \"tasks\": [\n    {\n      \"id\": \"task-1\",\n      \"title\": \"demo\",\n      \"created_at\": \"2024-01-01T08:00:00\",\n      \"updated_at\": \"2024-01-01T08:00:00\"\n    }\n  ]\n}";
        fs::write(&path, content).unwrap();

        let task = JsonStore::new(&path).get_task("task-1").await.unwrap().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(task.title, "demo");
        assert_eq!(task.due_at, None);
        assert_eq!(task.remind_before_minutes, 30);
        assert!(task.is_pending());
    }
}

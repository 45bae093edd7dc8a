use super::{ReminderStore, StoreState, TaskStore};
use crate::error::AppError;
use crate::model::{Reminder, TaskItem};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use time::PrimitiveDateTime;

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::io("memory store lock poisoned"))
    }

    pub fn reminders(&self) -> Result<Vec<Reminder>, AppError> {
        Ok(self.lock()?.reminders.clone())
    }

    pub fn tasks(&self) -> Result<Vec<TaskItem>, AppError> {
        Ok(self.lock()?.tasks.clone())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn upsert_task(&self, task: &TaskItem) -> Result<(), AppError> {
        self.lock()?.upsert_task(task);
        Ok(())
    }

    async fn get_task(&self, id: &str) -> Result<Option<TaskItem>, AppError> {
        Ok(self.lock()?.get_task(id))
    }

    async fn upcoming_before(&self, until: PrimitiveDateTime) -> Result<Vec<TaskItem>, AppError> {
        Ok(self.lock()?.upcoming_before(until))
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn upsert_reminder(&self, reminder: &Reminder) -> Result<(), AppError> {
        self.lock()?.upsert_reminder(reminder);
        Ok(())
    }

    async fn pending_before(&self, now: PrimitiveDateTime) -> Result<Vec<Reminder>, AppError> {
        Ok(self.lock()?.pending_before(now))
    }

    async fn pending_for_task(&self, task_id: &str) -> Result<Vec<Reminder>, AppError> {
        Ok(self.lock()?.pending_for_task(task_id))
    }
}

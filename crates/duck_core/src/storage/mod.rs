//! Persistence contracts consumed by the scheduler and the intake, plus the
//! in-memory and JSON-file implementations.

pub mod json_store;
mod memory;

pub use json_store::JsonStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::model::{Reminder, TaskItem};
use async_trait::async_trait;
use time::PrimitiveDateTime;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn upsert_task(&self, task: &TaskItem) -> Result<(), AppError>;

    async fn get_task(&self, id: &str) -> Result<Option<TaskItem>, AppError>;

    /// Pending tasks due at or before `until`, earliest first.
    async fn upcoming_before(&self, until: PrimitiveDateTime) -> Result<Vec<TaskItem>, AppError>;
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn upsert_reminder(&self, reminder: &Reminder) -> Result<(), AppError>;

    /// Unsent reminders whose trigger time is at or before `now`, earliest first.
    async fn pending_before(&self, now: PrimitiveDateTime) -> Result<Vec<Reminder>, AppError>;

    /// Unsent reminders linked to `task_id`.
    async fn pending_for_task(&self, task_id: &str) -> Result<Vec<Reminder>, AppError>;
}

/// The records both stores keep, with the query logic they share.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct StoreState {
    pub tasks: Vec<TaskItem>,
    pub reminders: Vec<Reminder>,
}

impl StoreState {
    pub fn upsert_task(&mut self, task: &TaskItem) {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => *existing = task.clone(),
            None => self.tasks.push(task.clone()),
        }
    }

    pub fn get_task(&self, id: &str) -> Option<TaskItem> {
        self.tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn upcoming_before(&self, until: PrimitiveDateTime) -> Vec<TaskItem> {
        let mut tasks: Vec<TaskItem> = self
            .tasks
            .iter()
            .filter(|task| task.is_pending() && task.due_at.is_some_and(|due| due <= until))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.due_at);
        tasks
    }

    pub fn upsert_reminder(&mut self, reminder: &Reminder) {
        match self
            .reminders
            .iter_mut()
            .find(|existing| existing.id == reminder.id)
        {
            Some(existing) => *existing = reminder.clone(),
            None => self.reminders.push(reminder.clone()),
        }
    }

    pub fn pending_before(&self, now: PrimitiveDateTime) -> Vec<Reminder> {
        let mut reminders: Vec<Reminder> = self
            .reminders
            .iter()
            .filter(|reminder| reminder.is_due(now))
            .cloned()
            .collect();
        reminders.sort_by_key(|reminder| reminder.trigger_at);
        reminders
    }

    pub fn pending_for_task(&self, task_id: &str) -> Vec<Reminder> {
        self.reminders
            .iter()
            .filter(|reminder| !reminder.sent && reminder.task_id.as_deref() == Some(task_id))
            .cloned()
            .collect()
    }
}

use super::{DEFAULT_REMIND_BEFORE_MINUTES, local_datetime, new_id};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, with = "local_datetime::option")]
    pub due_at: Option<PrimitiveDateTime>,
    #[serde(default = "default_remind_before")]
    pub remind_before_minutes: u32,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(with = "local_datetime")]
    pub created_at: PrimitiveDateTime,
    #[serde(with = "local_datetime")]
    pub updated_at: PrimitiveDateTime,
}

impl TaskItem {
    /// A fresh pending task with no due time.
    pub fn new(title: impl Into<String>, now: PrimitiveDateTime) -> Self {
        Self {
            id: new_id("task"),
            title: title.into(),
            notes: None,
            due_at: None,
            remind_before_minutes: DEFAULT_REMIND_BEFORE_MINUTES,
            priority: TaskPriority::Normal,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_due(mut self, due_at: PrimitiveDateTime, remind_before_minutes: u32) -> Self {
        self.due_at = Some(due_at);
        self.remind_before_minutes = remind_before_minutes;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}

fn default_remind_before() -> u32 {
    DEFAULT_REMIND_BEFORE_MINUTES
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Done,
}

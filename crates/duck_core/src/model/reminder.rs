use super::{local_datetime, new_id};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(with = "local_datetime")]
    pub trigger_at: PrimitiveDateTime,
    pub kind: ReminderType,
    #[serde(default)]
    pub sent: bool,
}

impl Reminder {
    pub fn deadline(task_id: &str, trigger_at: PrimitiveDateTime) -> Self {
        Self {
            id: new_id("reminder"),
            task_id: Some(task_id.to_string()),
            trigger_at,
            kind: ReminderType::Deadline,
            sent: false,
        }
    }

    pub fn water_break(trigger_at: PrimitiveDateTime) -> Self {
        Self {
            id: new_id("reminder"),
            task_id: None,
            trigger_at,
            kind: ReminderType::WaterBreak,
            sent: false,
        }
    }

    pub fn is_due(&self, now: PrimitiveDateTime) -> bool {
        !self.sent && self.trigger_at <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    Deadline,
    WaterBreak,
    MoveBreak,
}

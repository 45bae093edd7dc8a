//! Natural-language task extraction.

mod time_expr;
mod title;

pub use time_expr::{parse_due, parse_relative};
pub use title::{Rule, clean_title, rules};

use crate::model::TaskItem;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    Due,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Due => "due",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractResult {
    pub success: bool,
    pub task: Option<TaskItem>,
    pub missing_field: Option<MissingField>,
}

impl ExtractResult {
    fn resolved(task: TaskItem) -> Self {
        Self {
            success: true,
            task: Some(task),
            missing_field: None,
        }
    }

    fn missing_due(task: TaskItem) -> Self {
        Self {
            success: false,
            task: Some(task),
            missing_field: Some(MissingField::Due),
        }
    }

    pub fn due(&self) -> Option<PrimitiveDateTime> {
        self.task.as_ref().and_then(|task| task.due_at)
    }

    pub fn title(&self) -> Option<&str> {
        self.task.as_ref().map(|task| task.title.as_str())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TaskExtractor;

impl TaskExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract a candidate task from free text. Never fails: text without a
    /// usable time yields `success == false` with `MissingField::Due`.
    pub fn extract(&self, text: &str, now: PrimitiveDateTime, locale: &str) -> ExtractResult {
        let _ = locale;
        let text = text.trim();
        let title = clean_title(text);
        let task = TaskItem::new(title, now);

        match parse_due(text, now) {
            Some(due) => {
                let remind_before = remind_before_minutes(due, now);
                ExtractResult::resolved(task.with_due(due, remind_before))
            }
            None => ExtractResult::missing_due(task),
        }
    }
}

/// Lead time for a deadline reminder, tiered on how far away the deadline is.
///
/// | until due      | remind before        |
/// |----------------|----------------------|
/// | <= 5 min       | 0                    |
/// | (5, 30] min    | max(1, minutes - 1)  |
/// | (30, 60] min   | 10                   |
/// | (1, 4] h       | 30                   |
/// | > 4 h          | 60                   |
pub fn remind_before_minutes(due: PrimitiveDateTime, now: PrimitiveDateTime) -> u32 {
    let minutes = (due - now).as_seconds_f64() / 60.0;

    if minutes <= 5.0 {
        0
    } else if minutes <= 30.0 {
        (minutes.floor() as u32).saturating_sub(1).max(1)
    } else if minutes <= 60.0 {
        10
    } else if minutes <= 240.0 {
        30
    } else {
        60
    }
}

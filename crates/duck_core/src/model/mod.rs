mod reminder;
mod task;

pub use reminder::{Reminder, ReminderType};
pub use task::{TaskItem, TaskPriority, TaskStatus};

/// Default lead time for tasks created without an adaptive offset.
pub const DEFAULT_REMIND_BEFORE_MINUTES: u32 = 30;

time::serde::format_description!(
    local_datetime,
    PrimitiveDateTime,
    "[year]-[month]-[day]T[hour]:[minute]:[second]"
);

pub(crate) fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::{Reminder, TaskItem};
    use time::macros::datetime;

    #[test]
    fn timestamps_serialize_as_local_iso_strings() {
        let task = TaskItem::new("họp", datetime!(2024-01-01 09:00:00))
            .with_due(datetime!(2024-01-01 15:30:00), 30);
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["due_at"], "2024-01-01T15:30:00");
        assert_eq!(value["created_at"], "2024-01-01T09:00:00");

        let reminder = Reminder::deadline(&task.id, datetime!(2024-01-01 15:00:00));
        let value = serde_json::to_value(&reminder).unwrap();
        assert_eq!(value["trigger_at"], "2024-01-01T15:00:00");
        let parsed: Reminder = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.trigger_at, datetime!(2024-01-01 15:00:00));
    }
}

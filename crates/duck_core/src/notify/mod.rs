use crate::error::AppError;
use crate::model::TaskItem;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::macros::format_description;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::DesktopNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::DesktopNotifier;

pub const APP_NAME: &str = "DuckMode";
pub const WATER_BREAK_MESSAGE: &str = "Bạn ơi, đã đến giờ uống nước rồi! Cùng tiếp nước nào!";
pub const MOVE_BREAK_MESSAGE: &str =
    "Đã đến giờ vận động rồi! Dậy vươn vai hoặc đi lại chút cho khoẻ nhé!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterBreakAction {
    Dismiss,
    Snooze15,
}

/// Where due reminders and breaks are surfaced.
pub trait NotificationSink: Send + Sync {
    fn on_deadline(&self, task: &TaskItem) -> Result<(), AppError>;

    /// Returns once the break has been shown. Only sinks that can wait for
    /// an answer report `Snooze15`; fire-and-forget toasts always dismiss.
    fn on_water_break(&self) -> Result<WaterBreakAction, AppError>;

    fn on_move_break(&self) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl NotificationSink for NoopNotifier {
    fn on_deadline(&self, _task: &TaskItem) -> Result<(), AppError> {
        Ok(())
    }

    fn on_water_break(&self) -> Result<WaterBreakAction, AppError> {
        Ok(WaterBreakAction::Dismiss)
    }

    fn on_move_break(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Arc<dyn NotificationSink> {
    if std::env::var("DUCKMODE_DISABLE_NOTIFICATIONS").is_ok() {
        return Arc::new(NoopNotifier);
    }

    platform_notifier().unwrap_or_else(|_| Arc::new(NoopNotifier))
}

#[cfg(any(target_os = "linux", windows))]
pub fn platform_notifier() -> Result<Arc<dyn NotificationSink>, AppError> {
    Ok(Arc::new(DesktopNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Arc<dyn NotificationSink>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}

/// Friendly text for a deadline. A zero lead time means the deadline is now.
pub fn deadline_message(task: &TaskItem) -> String {
    let title = task.title.trim();
    let arrived = task.remind_before_minutes == 0;
    match (title.is_empty(), arrived) {
        (false, true) => format!("Bạn ơi, đã đến giờ '{title}' rồi! Bắt đầu thôi nào!"),
        (false, false) => format!("Bạn ơi, sắp đến giờ '{title}' rồi! Chuẩn bị đi nào!"),
        (true, true) => {
            "Đã đến giờ nhắc nhở rồi, kiểm tra DuckMode để không bỏ lỡ công việc nhé!".to_string()
        }
        (true, false) => {
            "Sắp đến giờ nhắc nhở rồi, kiểm tra DuckMode để không bỏ lỡ công việc nhé!".to_string()
        }
    }
}

/// "⏰ Đến giờ: HH:mm" for tasks with a due time.
pub fn due_label(task: &TaskItem) -> Option<String> {
    let due = task.due_at?;
    let formatted = due
        .format(format_description!("[hour]:[minute]"))
        .ok()?;
    Some(format!("⏰ Đến giờ: {formatted}"))
}

const ACTION_PREFIX: &str = "show:";

pub fn activation_argument(task_id: &str) -> String {
    format!("{ACTION_PREFIX}{task_id}")
}

pub fn parse_activation_argument(argument: &str) -> Option<String> {
    argument
        .strip_prefix(ACTION_PREFIX)
        .map(|id| id.to_string())
}

/// Re-launch this executable as `duck show <id>`.
pub fn launch_show(task_id: &str) -> Result<(), AppError> {
    let exe = std::env::current_exe()?;
    std::process::Command::new(exe)
        .arg("show")
        .arg(task_id)
        .spawn()?;
    Ok(())
}

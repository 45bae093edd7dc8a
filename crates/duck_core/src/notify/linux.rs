use crate::error::AppError;
use crate::model::TaskItem;
use crate::notify::{
    APP_NAME, MOVE_BREAK_MESSAGE, NotificationSink, WATER_BREAK_MESSAGE, WaterBreakAction,
    activation_argument, deadline_message, due_label, launch_show,
};
use notify_rust::Notification;

/// Desktop notifications are fire-and-forget: the poll loop never waits on them,
/// so water breaks shown here are always reported as dismissed.
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn show_plain(&self, body: &str) -> Result<(), AppError> {
        Notification::new()
            .summary(APP_NAME)
            .body(body)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}

impl NotificationSink for DesktopNotifier {
    fn on_deadline(&self, task: &TaskItem) -> Result<(), AppError> {
        let mut body = deadline_message(task);
        if let Some(label) = due_label(task) {
            body.push('\n');
            body.push_str(&label);
        }

        let action = activation_argument(&task.id);
        let handle = Notification::new()
            .summary(APP_NAME)
            .body(&body)
            .action(&action, "Mở")
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        let task_id = task.id.clone();
        std::thread::spawn(move || {
            handle.wait_for_action(|selected| {
                if selected == action || selected == "default" {
                    let _ = launch_show(&task_id);
                }
            });
        });

        Ok(())
    }

    fn on_water_break(&self) -> Result<WaterBreakAction, AppError> {
        self.show_plain(WATER_BREAK_MESSAGE)?;
        Ok(WaterBreakAction::Dismiss)
    }

    fn on_move_break(&self) -> Result<(), AppError> {
        self.show_plain(MOVE_BREAK_MESSAGE)
    }
}

use crate::error::AppError;
use crate::model::TaskItem;
use crate::notify::{
    APP_NAME, MOVE_BREAK_MESSAGE, NotificationSink, WATER_BREAK_MESSAGE, WaterBreakAction,
    activation_argument, deadline_message, due_label, launch_show, parse_activation_argument,
};
use tauri_winrt_notification::Toast;

/// Desktop toasts are fire-and-forget: the poll loop never waits on them,
/// so water breaks shown here are always reported as dismissed.
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn show_plain(&self, body: &str) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(APP_NAME)
            .text1(body)
            .show()
            .map_err(|err| AppError::io(err.to_string()))
    }
}

impl NotificationSink for DesktopNotifier {
    fn on_deadline(&self, task: &TaskItem) -> Result<(), AppError> {
        let task_id = task.id.clone();
        let action = activation_argument(&task.id);
        let label = due_label(task).unwrap_or_default();

        let action_match = action.clone();
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(APP_NAME)
            .text1(&deadline_message(task))
            .text2(&label)
            .add_button("Mở", &action)
            .on_activated(move |args| {
                match args {
                    Some(args) if args == action_match => {
                        let _ = launch_show(&task_id);
                    }
                    Some(args) => {
                        if let Some(id) = parse_activation_argument(&args) {
                            let _ = launch_show(&id);
                        } else if args.trim().is_empty() {
                            let _ = launch_show(&task_id);
                        }
                    }
                    None => {
                        let _ = launch_show(&task_id);
                    }
                }
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))
    }

    fn on_water_break(&self) -> Result<WaterBreakAction, AppError> {
        self.show_plain(WATER_BREAK_MESSAGE)?;
        Ok(WaterBreakAction::Dismiss)
    }

    fn on_move_break(&self) -> Result<(), AppError> {
        self.show_plain(MOVE_BREAK_MESSAGE)
    }
}

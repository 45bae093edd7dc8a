//! Conversational front door: turns chat lines into saved, scheduled tasks
//! and water breaks, asking follow-up questions when the time is missing.

use crate::error::AppError;
use crate::extract::{TaskExtractor, parse_relative};
use crate::model::{DEFAULT_REMIND_BEFORE_MINUTES, Reminder, TaskItem};
use crate::scheduler::ReminderScheduler;
use crate::storage::TaskStore;
use std::fmt;
use std::sync::Arc;
use time::PrimitiveDateTime;
use time::macros::format_description;

pub const COMMAND_MARKER: &str = "/r";
pub const DEFAULT_LOCALE: &str = "vi-VN";

const WATER_INTENTS: [&str; 3] = ["uống nước", "uong nuoc", "drink water"];
const GREETINGS: [&str; 12] = [
    "hi", "hello", "xin chào", "chào", "hey", "ok", "oke", "okay", "ừ", "vâng", "có", "không",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Empty,
    WaterBreakScheduled {
        at: PrimitiveDateTime,
    },
    AskWaterTime,
    WaterTimeNotUnderstood,
    RejectedPastDue {
        due: PrimitiveDateTime,
    },
    Scheduled {
        task: TaskItem,
        reminder: Option<Reminder>,
        now: PrimitiveDateTime,
        minutes_until_due: i64,
    },
    AskDeadline {
        title: String,
    },
    DeadlineNotUnderstood,
    DeadlineSaved {
        task: TaskItem,
        reminder: Option<Reminder>,
    },
    NotUnderstood,
    Chat {
        text: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Pending {
    #[default]
    Nothing,
    Deadline {
        title: String,
    },
    WaterTime,
}

pub struct Intake {
    tasks: Arc<dyn TaskStore>,
    scheduler: Arc<ReminderScheduler>,
    extractor: TaskExtractor,
    locale: String,
    pending: Pending,
}

impl Intake {
    pub fn new(tasks: Arc<dyn TaskStore>, scheduler: Arc<ReminderScheduler>) -> Self {
        Self {
            tasks,
            scheduler,
            extractor: TaskExtractor::new(),
            locale: DEFAULT_LOCALE.to_string(),
            pending: Pending::Nothing,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.pending != Pending::Nothing
    }

    pub async fn handle(&mut self, line: &str) -> Result<IntakeOutcome, AppError> {
        let text = line.trim();
        if text.is_empty() {
            return Ok(IntakeOutcome::Empty);
        }

        if let Some(request) = strip_command_marker(text) {
            return self.handle_command(request.trim()).await;
        }

        if is_water_intent(text) {
            let outcome = self.water_break(text);
            if outcome == IntakeOutcome::AskWaterTime {
                self.pending = Pending::WaterTime;
            }
            return Ok(outcome);
        }

        match std::mem::take(&mut self.pending) {
            Pending::Deadline { title } => self.resolve_deadline(text, title).await,
            Pending::WaterTime => {
                let now = self.scheduler.now();
                match parse_relative(text, now) {
                    Some(at) => {
                        self.scheduler.schedule_water_break_at(at);
                        Ok(IntakeOutcome::WaterBreakScheduled { at })
                    }
                    None => {
                        self.pending = Pending::WaterTime;
                        Ok(IntakeOutcome::WaterTimeNotUnderstood)
                    }
                }
            }
            Pending::Nothing => Ok(IntakeOutcome::Chat {
                text: text.to_string(),
            }),
        }
    }

    async fn handle_command(&mut self, request: &str) -> Result<IntakeOutcome, AppError> {
        if is_water_intent(request) {
            return Ok(self.water_break(request));
        }

        let now = self.scheduler.now();
        let result = self.extractor.extract(request, now, &self.locale);

        if let Some(due) = result.due() {
            if due <= now {
                return Ok(IntakeOutcome::RejectedPastDue { due });
            }
            let Some(task) = result.task else {
                return Ok(IntakeOutcome::NotUnderstood);
            };
            self.tasks.upsert_task(&task).await?;
            let reminder = self.scheduler.schedule_task(&task).await?;
            let minutes_until_due = (due - now).whole_minutes().max(0);
            return Ok(IntakeOutcome::Scheduled {
                task,
                reminder,
                now,
                minutes_until_due,
            });
        }

        match result.title() {
            Some(title) if is_meaningful_title(title) => {
                let title = title.to_string();
                self.pending = Pending::Deadline {
                    title: title.clone(),
                };
                Ok(IntakeOutcome::AskDeadline { title })
            }
            _ => Ok(IntakeOutcome::NotUnderstood),
        }
    }

    fn water_break(&self, text: &str) -> IntakeOutcome {
        match parse_relative(text, self.scheduler.now()) {
            Some(at) => {
                self.scheduler.schedule_water_break_at(at);
                IntakeOutcome::WaterBreakScheduled { at }
            }
            None => IntakeOutcome::AskWaterTime,
        }
    }

    async fn resolve_deadline(
        &mut self,
        text: &str,
        title: String,
    ) -> Result<IntakeOutcome, AppError> {
        let now = self.scheduler.now();
        let Some(due) = self.extractor.extract(text, now, &self.locale).due() else {
            self.pending = Pending::Deadline { title };
            return Ok(IntakeOutcome::DeadlineNotUnderstood);
        };
        if due <= now {
            self.pending = Pending::Deadline { title };
            return Ok(IntakeOutcome::RejectedPastDue { due });
        }

        let task = TaskItem::new(title, now).with_due(due, DEFAULT_REMIND_BEFORE_MINUTES);
        self.tasks.upsert_task(&task).await?;
        let reminder = self.scheduler.schedule_task(&task).await?;
        Ok(IntakeOutcome::DeadlineSaved { task, reminder })
    }
}

fn strip_command_marker(text: &str) -> Option<&str> {
    let head = text.get(..COMMAND_MARKER.len())?;
    if head.eq_ignore_ascii_case(COMMAND_MARKER) {
        text.get(COMMAND_MARKER.len()..)
    } else {
        None
    }
}

pub fn is_water_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    WATER_INTENTS.iter().any(|intent| lower.contains(intent))
}

/// Rejects greetings, very short titles and bare numbers.
pub fn is_meaningful_title(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    if lower.is_empty() || GREETINGS.contains(&lower.as_str()) {
        return false;
    }
    if lower.chars().count() < 3 {
        return false;
    }
    !lower.chars().all(|c| c.is_ascii_digit() || c.is_whitespace())
}

fn clock(value: PrimitiveDateTime) -> String {
    value
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| value.to_string())
}

impl fmt::Display for IntakeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::WaterBreakScheduled { at } => write!(
                f,
                "✅ Ok, mình sẽ nhắc bạn uống nước lúc {}!",
                clock(*at)
            ),
            Self::AskWaterTime => write!(
                f,
                "⏰ Bạn muốn mình nhắc uống nước lúc nào? (ví dụ: sau 15 phút / trong 1 giờ)"
            ),
            Self::WaterTimeNotUnderstood => write!(
                f,
                "Mình chưa hiểu thời gian. Ví dụ: 'sau 10 phút' hoặc 'trong 2 giờ'."
            ),
            Self::RejectedPastDue { .. } => write!(
                f,
                "⛔ Lời nhắc không hợp lệ vì thời điểm đã qua. Bạn hãy nhập lại mốc thời gian ở tương lai nhé!"
            ),
            Self::Scheduled {
                task,
                now,
                minutes_until_due,
                ..
            } => {
                if task.remind_before_minutes > 0 {
                    writeln!(
                        f,
                        "✅ Đã lưu reminder '{}' và sẽ nhắc trước {} phút.",
                        task.title, task.remind_before_minutes
                    )?;
                } else {
                    writeln!(
                        f,
                        "✅ Đã lưu reminder '{}'. Vì thời gian rất gần, mình sẽ nhắc ngay nhé!",
                        task.title
                    )?;
                }
                writeln!(f)?;
                writeln!(f, "⏰ Hiện tại: {}", clock(*now))?;
                if let Some(due) = task.due_at {
                    writeln!(f, "📅 Deadline: {}", clock(due))?;
                }
                writeln!(f, "⏱️ Còn lại: {minutes_until_due} phút")?;
                write!(f, "🔔 Nhắc trước: {} phút", task.remind_before_minutes)
            }
            Self::AskDeadline { title } => write!(
                f,
                "⏰ Deadline cho '{title}' là lúc nào? (ví dụ: hôm nay 16:00)"
            ),
            Self::DeadlineNotUnderstood => write!(
                f,
                "Mình chưa hiểu thời gian. Bạn có thể nói dạng 'hôm nay 16:00' hoặc 'mai 9h'?"
            ),
            Self::DeadlineSaved { .. } => {
                write!(f, "Đã lưu task và đặt nhắc trước 30 phút. Cố lên nhé!")
            }
            Self::NotUnderstood => write!(
                f,
                "❌ Mình chưa hiểu thời gian. Ví dụ: '/r nhắc tôi đi họp sau 10 phút' hoặc '/r nhắc tôi gọi điện lúc 15:30'"
            ),
            Self::Chat { text } => write!(f, "{text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Intake, IntakeOutcome, is_meaningful_title, is_water_intent};
    use crate::clock::ManualClock;
    use crate::model::ReminderType;
    use crate::notify::NoopNotifier;
    use crate::scheduler::{BreakKind, ReminderScheduler};
    use crate::storage::MemoryStore;
    use std::sync::Arc;
    use time::macros::datetime;

    struct Fixture {
        store: Arc<MemoryStore>,
        scheduler: Arc<ReminderScheduler>,
        intake: Intake,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 09:00:00)));
        let scheduler = Arc::new(ReminderScheduler::new(
            store.clone(),
            store.clone(),
            Arc::new(NoopNotifier),
            clock,
        ));
        let intake = Intake::new(store.clone(), scheduler.clone());
        Fixture {
            store,
            scheduler,
            intake,
        }
    }

    #[tokio::test]
    async fn command_with_time_saves_and_schedules() {
        let mut f = fixture();

        let outcome = f.intake.handle("/r nhắc tôi họp sau 10 phút").await.unwrap();

        let IntakeOutcome::Scheduled {
            task,
            reminder,
            minutes_until_due,
            ..
        } = outcome
        else {
            panic!("expected a scheduled task, got {outcome:?}");
        };
        assert_eq!(task.title, "họp");
        assert_eq!(task.due_at, Some(datetime!(2024-01-01 09:10:00)));
        assert_eq!(minutes_until_due, 10);
        let reminder = reminder.unwrap();
        assert_eq!(reminder.trigger_at, datetime!(2024-01-01 09:01:00));
        assert_eq!(f.store.tasks().unwrap().len(), 1);
        assert_eq!(f.store.reminders().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn past_due_command_is_rejected() {
        let mut f = fixture();

        let outcome = f.intake.handle("/R nộp bài lúc 8:30").await.unwrap();

        assert_eq!(
            outcome,
            IntakeOutcome::RejectedPastDue {
                due: datetime!(2024-01-01 08:30:00)
            }
        );
        assert!(f.store.tasks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_deadline_is_asked_for_then_saved() {
        let mut f = fixture();

        let asked = f.intake.handle("/r nộp báo cáo").await.unwrap();
        assert_eq!(
            asked,
            IntakeOutcome::AskDeadline {
                title: "nộp báo cáo".to_string()
            }
        );
        assert!(f.intake.is_waiting());

        let again = f.intake.handle("chưa biết").await.unwrap();
        assert_eq!(again, IntakeOutcome::DeadlineNotUnderstood);

        let saved = f.intake.handle("hôm nay 16:00").await.unwrap();
        let IntakeOutcome::DeadlineSaved { task, reminder } = saved else {
            panic!("expected the pending task to be saved, got {saved:?}");
        };
        assert_eq!(task.title, "nộp báo cáo");
        assert_eq!(task.remind_before_minutes, 30);
        assert_eq!(
            reminder.map(|r| r.trigger_at),
            Some(datetime!(2024-01-01 15:30:00))
        );
        assert!(!f.intake.is_waiting());
    }

    #[tokio::test]
    async fn past_follow_up_deadline_is_rejected_and_still_awaited() {
        let mut f = fixture();

        f.intake.handle("/r nộp báo cáo").await.unwrap();
        let rejected = f.intake.handle("hôm nay 8:00").await.unwrap();

        assert_eq!(
            rejected,
            IntakeOutcome::RejectedPastDue {
                due: datetime!(2024-01-01 08:00:00)
            }
        );
        assert!(f.intake.is_waiting());
        assert!(f.store.tasks().unwrap().is_empty());
        assert!(f.store.reminders().unwrap().is_empty());

        let at_now = f.intake.handle("hôm nay 9:00").await.unwrap();
        assert!(matches!(at_now, IntakeOutcome::RejectedPastDue { .. }));

        let saved = f.intake.handle("mai 9:00").await.unwrap();
        let IntakeOutcome::DeadlineSaved { task, .. } = saved else {
            panic!("expected the pending task to be saved, got {saved:?}");
        };
        assert_eq!(task.title, "nộp báo cáo");
        assert_eq!(task.due_at, Some(datetime!(2024-01-02 09:00:00)));
    }

    #[tokio::test]
    async fn greeting_command_is_not_understood() {
        let mut f = fixture();
        assert_eq!(
            f.intake.handle("/r ok").await.unwrap(),
            IntakeOutcome::NotUnderstood
        );
        assert!(!f.intake.is_waiting());
    }

    #[tokio::test]
    async fn water_request_with_relative_time_moves_the_break() {
        let mut f = fixture();

        let outcome = f.intake.handle("sau 15 phút uống nước").await.unwrap();

        assert_eq!(
            outcome,
            IntakeOutcome::WaterBreakScheduled {
                at: datetime!(2024-01-01 09:15:00)
            }
        );
        let state = f.scheduler.break_state();
        assert_eq!(state.next_break_at, datetime!(2024-01-01 09:15:00));
        assert_eq!(state.next_kind, BreakKind::Water);
        assert!(
            f.store
                .reminders()
                .unwrap()
                .iter()
                .all(|r| r.kind != ReminderType::WaterBreak)
        );
    }

    #[tokio::test]
    async fn water_request_without_time_waits_for_the_next_line() {
        let mut f = fixture();

        assert_eq!(
            f.intake.handle("nhắc mình uống nước").await.unwrap(),
            IntakeOutcome::AskWaterTime
        );
        assert_eq!(
            f.intake.handle("lát nữa").await.unwrap(),
            IntakeOutcome::WaterTimeNotUnderstood
        );
        assert_eq!(
            f.intake.handle("trong 1 giờ").await.unwrap(),
            IntakeOutcome::WaterBreakScheduled {
                at: datetime!(2024-01-01 10:00:00)
            }
        );
    }

    #[tokio::test]
    async fn water_command_without_time_does_not_wait() {
        let mut f = fixture();
        assert_eq!(
            f.intake.handle("/r uống nước").await.unwrap(),
            IntakeOutcome::AskWaterTime
        );
        assert!(!f.intake.is_waiting());
    }

    #[tokio::test]
    async fn plain_chat_passes_through() {
        let mut f = fixture();
        assert_eq!(
            f.intake.handle("  hôm nay trời đẹp quá ").await.unwrap(),
            IntakeOutcome::Chat {
                text: "hôm nay trời đẹp quá".to_string()
            }
        );
        assert_eq!(f.intake.handle("   ").await.unwrap(), IntakeOutcome::Empty);
    }

    #[test]
    fn meaningful_titles() {
        assert!(is_meaningful_title("nộp báo cáo"));
        assert!(!is_meaningful_title("Chào"));
        assert!(!is_meaningful_title("ab"));
        assert!(!is_meaningful_title("12 34"));
    }

    #[test]
    fn water_intent_matches_both_spellings() {
        assert!(is_water_intent("Uống nước đi"));
        assert!(is_water_intent("uong nuoc"));
        assert!(is_water_intent("time to drink water"));
        assert!(!is_water_intent("uống cà phê"));
    }

    #[test]
    fn ask_deadline_reply_names_the_title() {
        let outcome = IntakeOutcome::AskDeadline {
            title: "họp".to_string(),
        };
        assert_eq!(
            outcome.to_string(),
            "⏰ Deadline cho 'họp' là lúc nào? (ví dụ: hôm nay 16:00)"
        );
    }
}

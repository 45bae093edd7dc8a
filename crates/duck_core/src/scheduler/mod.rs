//! Reminder scheduling and the background poll loop.
//!
//! A due reminder is marked sent and persisted before its notification goes
//! out, so a reminder is never dispatched twice. If that write fails the
//! reminder stays pending and the next tick retries it.

mod breaks;

pub use breaks::{BreakKind, BreakState, MIN_BREAK_INTERVAL_MINUTES, SNOOZE_MINUTES};

use crate::clock::Clock;
use crate::config::DEFAULT_BREAK_INTERVAL_MINUTES;
use crate::error::AppError;
use crate::model::{Reminder, ReminderType, TaskItem};
use crate::notify::{NotificationSink, WaterBreakAction};
use crate::storage::{ReminderStore, TaskStore};
use breaks::BreakCycle;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;
use time::{Duration, PrimitiveDateTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Lead applied to a trigger that would otherwise already be in the past.
pub const MIN_TRIGGER_LEAD_SECS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub reminder_id: Option<String>,
    pub error: AppError,
}

/// What a single poll did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub skipped: bool,
    pub deadlines: usize,
    pub water_breaks: usize,
    pub move_breaks: usize,
    pub retired: usize,
    pub failures: Vec<DispatchFailure>,
}

impl TickReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn dispatched(&self) -> usize {
        self.deadlines + self.water_breaks + self.move_breaks
    }

    fn fail(&mut self, reminder_id: Option<&str>, error: AppError) {
        log::warn!(
            "reminder {} failed: {error}",
            reminder_id.unwrap_or("<break cycle>")
        );
        self.failures.push(DispatchFailure {
            reminder_id: reminder_id.map(str::to_string),
            error,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub initial_delay: StdDuration,
    pub poll_interval: StdDuration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_delay: StdDuration::from_secs(5),
            poll_interval: StdDuration::from_secs(20),
        }
    }
}

pub struct ReminderScheduler {
    tasks: Arc<dyn TaskStore>,
    reminders: Arc<dyn ReminderStore>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    breaks: Mutex<BreakCycle>,
    tick_guard: tokio::sync::Mutex<()>,
}

impl ReminderScheduler {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        reminders: Arc<dyn ReminderStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        Self {
            tasks,
            reminders,
            sink,
            clock,
            breaks: Mutex::new(BreakCycle::new(now, DEFAULT_BREAK_INTERVAL_MINUTES)),
            tick_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn now(&self) -> PrimitiveDateTime {
        self.clock.now()
    }

    fn cycle(&self) -> MutexGuard<'_, BreakCycle> {
        match self.breaks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Persists a deadline reminder for `task`. Tasks without a due time are
    /// ignored. Each call adds a reminder; callers must not schedule twice.
    pub async fn schedule_task(&self, task: &TaskItem) -> Result<Option<Reminder>, AppError> {
        let Some(due_at) = task.due_at else {
            return Ok(None);
        };

        let now = self.clock.now();
        let mut trigger_at = due_at - Duration::minutes(i64::from(task.remind_before_minutes));
        if trigger_at <= now {
            trigger_at = now + Duration::seconds(MIN_TRIGGER_LEAD_SECS);
        }

        let reminder = Reminder::deadline(&task.id, trigger_at);
        self.reminders.upsert_reminder(&reminder).await?;
        log::info!(
            "scheduled reminder {} for task {} at {trigger_at}",
            reminder.id,
            task.id
        );
        Ok(Some(reminder))
    }

    /// Retires every pending reminder linked to `task_id` without dispatching
    /// it. Returns how many were retired.
    pub async fn cancel_for_task(&self, task_id: &str) -> Result<usize, AppError> {
        let pending = self.reminders.pending_for_task(task_id).await?;
        let mut retired = 0;
        for mut reminder in pending {
            reminder.sent = true;
            self.reminders.upsert_reminder(&reminder).await?;
            retired += 1;
        }
        if retired > 0 {
            log::info!("cancelled {retired} reminder(s) for task {task_id}");
        }
        Ok(retired)
    }

    pub fn schedule_water_break(&self, interval_minutes: u32) {
        let now = self.clock.now();
        self.cycle().reset(now, interval_minutes);
    }

    pub fn schedule_water_break_at(&self, when: PrimitiveDateTime) {
        self.cycle().schedule_at(when);
    }

    pub fn break_state(&self) -> BreakState {
        self.cycle().state()
    }

    /// Runs one poll. Returns a skipped report when another tick is running.
    pub async fn tick(&self) -> TickReport {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            log::debug!("tick already in flight; skipping");
            return TickReport::skipped();
        };

        let now = self.clock.now();
        let mut report = TickReport::default();

        match self.reminders.pending_before(now).await {
            Ok(due) => {
                for reminder in due {
                    self.dispatch_reminder(reminder, now, &mut report).await;
                }
            }
            Err(err) => report.fail(None, err),
        }

        self.run_break_cycle(now, &mut report);

        if report.dispatched() > 0 || !report.failures.is_empty() {
            log::info!(
                "tick at {now}: {} dispatched, {} retired, {} failed",
                report.dispatched(),
                report.retired,
                report.failures.len()
            );
        }
        report
    }

    async fn dispatch_reminder(
        &self,
        reminder: Reminder,
        now: PrimitiveDateTime,
        report: &mut TickReport,
    ) {
        let id = reminder.id.clone();

        let task = if reminder.kind == ReminderType::Deadline {
            match self.live_task(&reminder).await {
                Ok(Some(task)) => Some(task),
                Ok(None) => {
                    match self.mark_sent(&reminder).await {
                        Ok(()) => {
                            log::debug!("retired reminder {id}: task missing or done");
                            report.retired += 1;
                        }
                        Err(err) => report.fail(Some(&id), err),
                    }
                    return;
                }
                Err(err) => {
                    report.fail(Some(&id), err);
                    return;
                }
            }
        } else {
            None
        };

        if let Err(err) = self.mark_sent(&reminder).await {
            report.fail(Some(&id), err);
            return;
        }

        let outcome = match (reminder.kind, task) {
            (ReminderType::Deadline, Some(task)) => {
                self.sink.on_deadline(&task).map(|()| report.deadlines += 1)
            }
            (ReminderType::Deadline, None) => Ok(()),
            (ReminderType::WaterBreak, _) => match self.sink.on_water_break() {
                Ok(action) => {
                    report.water_breaks += 1;
                    self.snooze_reminder(action, now).await
                }
                Err(err) => Err(err),
            },
            (ReminderType::MoveBreak, _) => {
                self.sink.on_move_break().map(|()| report.move_breaks += 1)
            }
        };

        if let Err(err) = outcome {
            report.fail(Some(&id), err);
        }
    }

    async fn live_task(&self, reminder: &Reminder) -> Result<Option<TaskItem>, AppError> {
        let Some(task_id) = reminder.task_id.as_deref() else {
            return Ok(None);
        };
        let task = self.tasks.get_task(task_id).await?;
        Ok(task.filter(TaskItem::is_pending))
    }

    async fn mark_sent(&self, reminder: &Reminder) -> Result<(), AppError> {
        let mut sent = reminder.clone();
        sent.sent = true;
        self.reminders.upsert_reminder(&sent).await
    }

    async fn snooze_reminder(
        &self,
        action: WaterBreakAction,
        now: PrimitiveDateTime,
    ) -> Result<(), AppError> {
        if action != WaterBreakAction::Snooze15 {
            return Ok(());
        }
        let again = Reminder::water_break(now + Duration::minutes(SNOOZE_MINUTES));
        self.reminders.upsert_reminder(&again).await
    }

    fn run_break_cycle(&self, now: PrimitiveDateTime, report: &mut TickReport) {
        // The lock is released before the sink runs.
        let fired = self.cycle().fire_if_due(now);
        if let Some(kind) = fired {
            log::info!("{kind:?} break due at {now}");
        }
        match fired {
            Some(BreakKind::Water) => match self.sink.on_water_break() {
                Ok(action) => {
                    report.water_breaks += 1;
                    if action == WaterBreakAction::Snooze15 {
                        self.cycle().snooze(now);
                    }
                }
                Err(err) => report.fail(None, err),
            },
            Some(BreakKind::Move) => match self.sink.on_move_break() {
                Ok(()) => report.move_breaks += 1,
                Err(err) => report.fail(None, err),
            },
            None => {}
        }
    }

    /// Starts the poll loop: one tick after `initial_delay`, then every
    /// `poll_interval`. Late ticks are delayed, never bunched.
    pub fn spawn(self: Arc<Self>, settings: PollSettings) -> SchedulerHandle {
        let (shutdown, mut stopped) = watch::channel(false);
        let poll_interval = settings.poll_interval.max(StdDuration::from_secs(1));

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(settings.initial_delay) => {}
                _ = stopped.changed() => return,
            }

            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    _ = stopped.changed() => break,
                }
            }
            log::debug!("scheduler loop stopped");
        });

        SchedulerHandle { shutdown, task }
    }
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals the loop and waits for it. A tick already running completes.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            log::warn!("scheduler loop ended abnormally: {err}");
        }
    }
}

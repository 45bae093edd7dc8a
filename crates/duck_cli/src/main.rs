mod cli;

use clap::{CommandFactory, Parser};
use cli::{Cli, Command, collect_config_overrides};
use duck_core::clock::{Clock, SystemClock};
use duck_core::config::{Config, load_config_with_fallback, merge_overrides};
use duck_core::error::AppError;
use duck_core::extract::{ExtractResult, TaskExtractor};
use duck_core::intake::{COMMAND_MARKER, DEFAULT_LOCALE, Intake, IntakeOutcome};
use duck_core::model::{Reminder, TaskItem, TaskStatus};
use duck_core::notify::{
    MOVE_BREAK_MESSAGE, NotificationSink, WATER_BREAK_MESSAGE, WaterBreakAction,
    deadline_message, due_label, notifier_from_env,
};
use duck_core::scheduler::{PollSettings, ReminderScheduler, TickReport};
use duck_core::storage::{JsonStore, ReminderStore, TaskStore, json_store};
use std::sync::Arc;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::macros::format_description;
use time::{Duration, PrimitiveDateTime};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Echoes every notification into the terminal before handing it on.
struct ChatNotifier {
    inner: Arc<dyn NotificationSink>,
    echo: bool,
}

impl NotificationSink for ChatNotifier {
    fn on_deadline(&self, task: &TaskItem) -> Result<(), AppError> {
        if self.echo {
            println!("🔔 {}", deadline_message(task));
            if let Some(label) = due_label(task) {
                println!("{label}");
            }
        }
        self.inner.on_deadline(task)
    }

    fn on_water_break(&self) -> Result<WaterBreakAction, AppError> {
        if self.echo {
            println!("💧 {WATER_BREAK_MESSAGE}");
        }
        self.inner.on_water_break()
    }

    fn on_move_break(&self) -> Result<(), AppError> {
        if self.echo {
            println!("🤸 {MOVE_BREAK_MESSAGE}");
        }
        self.inner.on_move_break()
    }
}

struct App {
    config: Config,
    clock: Arc<dyn Clock>,
    store: Arc<JsonStore>,
    scheduler: Arc<ReminderScheduler>,
    json: bool,
}

impl App {
    fn new(config: Config, clock: SystemClock, json: bool) -> Result<Self, AppError> {
        let path = json_store::store_path(config.store_path.as_deref())?;
        let store = Arc::new(JsonStore::new(path));
        log::debug!("using store at {}", store.path().display());
        let clock: Arc<dyn Clock> = Arc::new(clock);
        let sink = Arc::new(ChatNotifier {
            inner: notifier_from_env(),
            echo: !json,
        });
        let scheduler = Arc::new(ReminderScheduler::new(
            store.clone(),
            store.clone(),
            sink,
            clock.clone(),
        ));
        scheduler.schedule_water_break(config.break_interval_minutes);

        Ok(Self {
            config,
            clock,
            store,
            scheduler,
            json,
        })
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Remind before")]
    remind_before: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl TaskRow {
    fn from_task(task: &TaskItem, now: PrimitiveDateTime) -> Self {
        let overdue = task.due_at.is_some_and(|due| due <= now);
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            due: task.due_at.map(format_datetime).unwrap_or_else(|| "-".to_string()),
            remind_before: format!("{} min", task.remind_before_minutes),
            status: if overdue {
                format!("{} (overdue)", status_label(task.status))
            } else {
                status_label(task.status).to_string()
            },
        }
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Done => "done",
    }
}

fn format_datetime(value: PrimitiveDateTime) -> String {
    value
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| value.to_string())
}

fn parse_now(raw: &str) -> Result<PrimitiveDateTime, AppError> {
    let trimmed = raw.trim();
    PrimitiveDateTime::parse(
        trimmed,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            trimmed,
            format_description!("[year]-[month]-[day] [hour]:[minute]"),
        )
    })
    .map_err(|_| {
        AppError::invalid_input(format!(
            "invalid --now '{trimmed}', expected YYYY-MM-DD HH:MM:SS"
        ))
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string(value)?)
}

fn print_extract(result: &ExtractResult, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", to_json(result)?);
        return Ok(());
    }

    println!("success: {}", result.success);
    if let Some(title) = result.title() {
        println!("title: {title}");
    }
    match (result.due(), result.missing_field) {
        (Some(due), _) => {
            println!("due: {}", format_datetime(due));
            if let Some(task) = result.task.as_ref() {
                println!("remind_before_minutes: {}", task.remind_before_minutes);
            }
        }
        (None, Some(missing)) => println!("missing: {}", missing.as_str()),
        (None, None) => {}
    }
    Ok(())
}

fn print_task_detail(task: &TaskItem, reminders: &[Reminder], json: bool) -> Result<(), AppError> {
    if json {
        let payload = serde_json::json!({
            "task": task,
            "pending_reminders": reminders,
        });
        println!("{payload}");
        return Ok(());
    }

    println!("ID: {}", task.id);
    println!("Title: {}", task.title);
    println!("Status: {}", status_label(task.status));
    println!(
        "Due: {}",
        task.due_at
            .map(format_datetime)
            .unwrap_or_else(|| "-".to_string())
    );
    println!("Remind before: {} min", task.remind_before_minutes);
    if let Some(notes) = task.notes.as_deref() {
        println!("Notes: {notes}");
    }
    println!("Created: {}", format_datetime(task.created_at));
    for reminder in reminders {
        println!(
            "Reminder: {} at {}",
            reminder.id,
            format_datetime(reminder.trigger_at)
        );
    }
    Ok(())
}

fn print_tick(report: &TickReport, json: bool) {
    if json {
        let failures: Vec<_> = report
            .failures
            .iter()
            .map(|failure| {
                serde_json::json!({
                    "reminder_id": failure.reminder_id,
                    "code": failure.error.code(),
                    "message": failure.error.message(),
                })
            })
            .collect();
        let payload = serde_json::json!({
            "skipped": report.skipped,
            "deadlines": report.deadlines,
            "water_breaks": report.water_breaks,
            "move_breaks": report.move_breaks,
            "retired": report.retired,
            "failures": failures,
        });
        println!("{payload}");
        return;
    }

    if report.skipped {
        println!("Tick skipped: another tick is running");
        return;
    }
    println!(
        "Dispatched {} (deadlines {}, water {}, move {}), retired {}",
        report.dispatched(),
        report.deadlines,
        report.water_breaks,
        report.move_breaks,
        report.retired
    );
    for failure in &report.failures {
        eprintln!(
            "ERROR: {}: {}",
            failure.reminder_id.as_deref().unwrap_or("break cycle"),
            failure.error
        );
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
    println!("In chat: '/r <lời nhắc>' saves a reminder, 'exit' or 'quit' stops.");
}

async fn remind(app: &App, text: &str) -> Result<(), AppError> {
    let request = if text.trim_start().to_lowercase().starts_with(COMMAND_MARKER) {
        text.to_string()
    } else {
        format!("{COMMAND_MARKER} {text}")
    };

    let mut intake = Intake::new(app.store.clone(), app.scheduler.clone());
    let outcome = intake.handle(&request).await?;

    match &outcome {
        IntakeOutcome::Scheduled {
            task,
            reminder,
            minutes_until_due,
            ..
        } => {
            if app.json {
                let payload = serde_json::json!({
                    "task": task,
                    "reminder": reminder,
                    "minutes_until_due": minutes_until_due,
                });
                println!("{payload}");
            } else {
                println!("{outcome}");
            }
            Ok(())
        }
        IntakeOutcome::WaterBreakScheduled { at } => {
            // A one-shot process has no break cycle to carry this.
            let reminder = Reminder::water_break(*at);
            app.store.upsert_reminder(&reminder).await?;
            if app.json {
                println!("{}", to_json(&reminder)?);
            } else {
                println!("{outcome}");
            }
            Ok(())
        }
        other => Err(AppError::invalid_input(other.to_string())),
    }
}

async fn run_command(app: &App, command: Command) -> Result<(), AppError> {
    match command {
        Command::Extract { text, now } => {
            let now = match now {
                Some(raw) => parse_now(&raw)?,
                None => app.clock.now(),
            };
            let result = TaskExtractor::new().extract(&text.join(" "), now, DEFAULT_LOCALE);
            print_extract(&result, app.json)?;
        }
        Command::Remind { text } => remind(app, &text.join(" ")).await?,
        Command::List { hours } => {
            let now = app.clock.now();
            let until = now
                .checked_add(Duration::hours(i64::from(hours)))
                .ok_or_else(|| {
                    AppError::invalid_input(format!("--hours {hours} is out of range"))
                })?;
            let tasks = app.store.upcoming_before(until).await?;
            if app.json {
                println!("{}", to_json(&tasks)?);
            } else if tasks.is_empty() {
                println!("No pending tasks in the next {hours} hour(s)");
            } else {
                let rows: Vec<TaskRow> = tasks
                    .iter()
                    .map(|task| TaskRow::from_task(task, now))
                    .collect();
                let mut table = Table::new(rows);
                table.with(Style::modern());
                println!("{table}");
            }
        }
        Command::Show { id } => {
            let task = app
                .store
                .get_task(&id)
                .await?
                .ok_or_else(|| AppError::invalid_input(format!("task not found: {id}")))?;
            let reminders = app.store.pending_for_task(&task.id).await?;
            print_task_detail(&task, &reminders, app.json)?;
        }
        Command::Cancel { id } => {
            let cancelled = app.scheduler.cancel_for_task(&id).await?;
            if app.json {
                println!(
                    "{}",
                    serde_json::json!({ "task_id": id, "cancelled": cancelled })
                );
            } else {
                println!("Cancelled {cancelled} reminder(s) for {id}");
            }
        }
        Command::Tick => {
            let report = app.scheduler.tick().await;
            print_tick(&report, app.json);
        }
        Command::Run { break_interval } => run_loop(app, break_interval).await?,
    }

    Ok(())
}

async fn run_loop(app: &App, break_interval: Option<u32>) -> Result<(), AppError> {
    if let Some(minutes) = break_interval {
        app.scheduler.schedule_water_break(minutes);
    }
    let state = app.scheduler.break_state();
    log::info!(
        "break cycle every {} min, next at {}",
        state.interval_minutes,
        state.next_break_at
    );

    let handle = app.scheduler.clone().spawn(PollSettings {
        initial_delay: app.config.initial_delay(),
        poll_interval: app.config.poll_interval(),
    });

    let mut intake = Intake::new(app.store.clone(), app.scheduler.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(err) => break Err(AppError::from(err)),
        };

        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break Ok(());
        }
        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        match intake.handle(line).await {
            Ok(IntakeOutcome::Empty) => {}
            Ok(IntakeOutcome::Chat { .. }) => {
                println!("🦆 Gõ '/r <lời nhắc>' để mình đặt nhắc nhở cho bạn nhé!");
            }
            Ok(outcome) => println!("🦆 {outcome}"),
            Err(err) => eprintln!("ERROR: {err}"),
        }
    };

    handle.stop().await;
    result
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    // The local offset can only be read while this is the only thread.
    let clock = SystemClock::detect();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) {
                err.exit();
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let overrides = match collect_config_overrides(&cli.config_override) {
        Ok(overrides) => overrides,
        Err(message) => {
            eprintln!("ERROR: {}", AppError::invalid_input(message));
            std::process::exit(1);
        }
    };

    let loaded = load_config_with_fallback();
    let config = merge_overrides(&loaded.config, &overrides);
    init_logging(config.log_level());
    if let Some(err) = loaded.error {
        log::warn!("falling back to default config: {err}");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("ERROR: {}", AppError::from(err));
            std::process::exit(1);
        }
    };

    let command = cli.command.unwrap_or(Command::Run {
        break_interval: None,
    });
    let result = runtime.block_on(async {
        let app = App::new(config, clock, cli.json)?;
        run_command(&app, command).await
    });

    if let Err(err) = result {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

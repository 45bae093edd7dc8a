use clap::{Parser, Subcommand};
use duck_core::config::ConfigOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show what would be extracted from a sentence, without saving
    ///
    /// Example: duck extract "nhắc tôi họp lúc 15:30"
    /// Example: duck extract "họp sau 10 phút" --now "2024-01-01 09:00:00"
    Extract {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[arg(long, value_name = "YYYY-MM-DD HH:MM:SS")]
        now: Option<String>,
    },
    /// Save a reminder from a sentence (the /r marker is optional)
    ///
    /// Example: duck remind nhắc tôi gọi điện lúc 15:30
    Remind {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List pending tasks due within the next hours
    ///
    /// Example: duck list --hours 48
    List {
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Show details of a task
    ///
    /// Example: duck show task-1
    Show { id: String },
    /// Retire the pending reminders of a task
    ///
    /// Example: duck cancel task-1
    Cancel { id: String },
    /// Dispatch everything that is due right now
    Tick,
    /// Run the reminder loop and chat on stdin until EOF, "exit" or "quit"
    ///
    /// Example: duck run --break-interval 45
    Run {
        #[arg(long, value_name = "MINUTES")]
        break_interval: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    BreakInterval(u32),
    PollInterval(u64),
    InitialDelay(u64),
    LogLevel(String),
    StorePath(PathBuf),
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ConfigOverrideTarget, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    match field.as_str() {
        "break_interval" | "break_interval_minutes" => {
            parse_number(&field, value).map(ConfigOverrideTarget::BreakInterval)
        }
        "poll_interval" | "poll_interval_secs" => {
            parse_number(&field, value).map(ConfigOverrideTarget::PollInterval)
        }
        "initial_delay" | "initial_delay_secs" => {
            parse_number(&field, value).map(ConfigOverrideTarget::InitialDelay)
        }
        "log_level" => {
            if value.is_empty() {
                Err("log_level override cannot be empty".to_string())
            } else {
                Ok(ConfigOverrideTarget::LogLevel(value.to_string()))
            }
        }
        "store_path" => {
            if value.is_empty() {
                Err("store_path override cannot be empty".to_string())
            } else {
                Ok(ConfigOverrideTarget::StorePath(PathBuf::from(value)))
            }
        }
        other => Err(format!("unknown config field '{other}'")),
    }
}

/// Fold every `--config-override` into one set; later values win.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        match parse_config_override(entry)? {
            ConfigOverrideTarget::BreakInterval(minutes) => {
                overrides.break_interval_minutes = Some(minutes)
            }
            ConfigOverrideTarget::PollInterval(secs) => overrides.poll_interval_secs = Some(secs),
            ConfigOverrideTarget::InitialDelay(secs) => overrides.initial_delay_secs = Some(secs),
            ConfigOverrideTarget::LogLevel(level) => overrides.log_level = Some(level),
            ConfigOverrideTarget::StorePath(path) => overrides.store_path = Some(path),
        }
    }
    Ok(overrides)
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{field} override must be a non-negative number"))
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

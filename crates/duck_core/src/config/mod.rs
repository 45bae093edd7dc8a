use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR_NAME: &str = "duckmode";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "DUCKMODE_CONFIG_PATH";

pub const DEFAULT_BREAK_INTERVAL_MINUTES: u32 = 60;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 5;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_break_interval")]
    pub break_interval_minutes: u32,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            break_interval_minutes: DEFAULT_BREAK_INTERVAL_MINUTES,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            initial_delay_secs: DEFAULT_INITIAL_DELAY_SECS,
            log_level: None,
            store_path: None,
        }
    }
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Poll cadence; zero is bumped to one second so the loop never spins.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }
}

fn default_break_interval() -> u32 {
    DEFAULT_BREAK_INTERVAL_MINUTES
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_initial_delay() -> u64 {
    DEFAULT_INITIAL_DELAY_SECS
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub break_interval_minutes: Option<u32>,
    pub poll_interval_secs: Option<u64>,
    pub initial_delay_secs: Option<u64>,
    pub log_level: Option<String>,
    pub store_path: Option<PathBuf>,
}

/// Per-user application directory holding the config and the default store.
pub fn app_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}

/// Never fails: problems come back in `ConfigLoad::error` next to defaults.
pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_log_level(config))
}

fn normalize_log_level(mut config: Config) -> Config {
    config.log_level = config
        .log_level
        .map(|level| level.trim().to_ascii_lowercase())
        .filter(|level| !level.is_empty());
    config
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(minutes) = overrides.break_interval_minutes {
        merged.break_interval_minutes = minutes;
    }
    if let Some(secs) = overrides.poll_interval_secs {
        merged.poll_interval_secs = secs;
    }
    if let Some(secs) = overrides.initial_delay_secs {
        merged.initial_delay_secs = secs;
    }
    if let Some(level) = overrides.log_level.as_ref() {
        merged.log_level = Some(level.clone());
    }
    if let Some(path) = overrides.store_path.as_ref() {
        merged.store_path = Some(path.clone());
    }

    normalize_log_level(merged)
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, load_config_from_path, load_config_with_fallback_from_path,
        merge_overrides,
    };
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("duckmode-{nanos}-{file_name}"))
    }

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let path = temp_path("missing-config.json");
        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let path = temp_path("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn load_config_reads_partial_file() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "break_interval_minutes": 45,
            "log_level": " INFO "
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.break_interval_minutes, 45);
        assert_eq!(loaded.poll_interval_secs, 20);
        assert_eq!(loaded.initial_delay_secs, 5);
        assert_eq!(loaded.log_level(), "info");
        assert_eq!(loaded.store_path, None);
    }

    #[test]
    fn merge_overrides_replaces_only_given_fields() {
        let base = Config {
            break_interval_minutes: 45,
            log_level: Some("info".into()),
            ..Config::default()
        };
        let overrides = ConfigOverrides {
            poll_interval_secs: Some(2),
            store_path: Some(PathBuf::from("/tmp/duck.json")),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(merged.break_interval_minutes, 45);
        assert_eq!(merged.poll_interval_secs, 2);
        assert_eq!(merged.log_level(), "info");
        assert_eq!(merged.store_path, Some(PathBuf::from("/tmp/duck.json")));
        assert_eq!(base.poll_interval_secs, 20);
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            break_interval_minutes: 30,
            ..Config::default()
        };

        let merged = merge_overrides(&base, &ConfigOverrides::default());

        assert_eq!(merged, base);
    }

    #[test]
    fn durations_are_derived_from_seconds() {
        let config = Config {
            poll_interval_secs: 0,
            initial_delay_secs: 3,
            ..Config::default()
        };

        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.initial_delay(), Duration::from_secs(3));
        assert_eq!(Config::default().log_level(), "warn");
    }
}

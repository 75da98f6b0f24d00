use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::error::SettingsError;
use crate::settings_path::settings_path;

/// Default delay between two reminders (20 minutes)
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(20 * 60);

/// Default time the popup stays locked (20 seconds)
pub const DEFAULT_LOOK_AWAY_TIME: Duration = Duration::from_secs(20);

const POSITIVE_VALUES_MESSAGE: &str = "Both Reminder Interval and Look Away Time must be positive numbers.";

/// The unit the reminder interval is entered and displayed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderUnit {
    #[default]
    Minutes,
    Seconds,
}

impl ReminderUnit {
    /// Milliseconds in one unit
    pub fn millis(self) -> i64 {
        match self {
            ReminderUnit::Minutes => 60_000,
            ReminderUnit::Seconds => 1_000,
        }
    }
}

fn default_interval_millis() -> i64 {
    DEFAULT_REMINDER_INTERVAL.as_millis() as i64
}

fn default_look_away_millis() -> i64 {
    DEFAULT_LOOK_AWAY_TIME.as_millis() as i64
}

/// Persisted reminder settings. Keys that are missing from the file fall back to their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_interval_millis")]
    reminder_interval: i64,
    #[serde(default = "default_look_away_millis")]
    look_away_time: i64,
    #[serde(default)]
    reminder_unit: ReminderUnit,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        return ReminderConfig {
            reminder_interval: default_interval_millis(),
            look_away_time: default_look_away_millis(),
            reminder_unit: ReminderUnit::Minutes,
        };
    }
}

impl ReminderConfig {
    /// Builds a config from durations, both must be non-zero
    pub fn new(interval: Duration, look_away: Duration, unit: ReminderUnit) -> Result<Self, SettingsError> {
        let config = ReminderConfig {
            reminder_interval: interval.as_millis().min(i64::MAX as u128) as i64,
            look_away_time: look_away.as_millis().min(i64::MAX as u128) as i64,
            reminder_unit: unit,
        };
        config.validate()?;
        return Ok(config);
    }

    /// Parses the raw text of the settings window.
    ///
    /// The interval is expressed in `unit`, the look away time in seconds. Decimal values are
    /// accepted and truncated to whole milliseconds.
    pub fn from_user_input(interval: &str, unit: ReminderUnit, look_away_seconds: &str) -> Result<Self, SettingsError> {
        let interval = parse_positive(interval, "Reminder Interval")?;
        let look_away = parse_positive(look_away_seconds, "Look Away Time")?;

        let config = ReminderConfig {
            reminder_interval: (interval * unit.millis() as f64) as i64,
            look_away_time: (look_away * 1000.0) as i64,
            reminder_unit: unit,
        };
        config.validate()?;
        return Ok(config);
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.reminder_interval <= 0 || self.look_away_time <= 0 {
            return Err(SettingsError::InvalidInput(POSITIVE_VALUES_MESSAGE.to_string()));
        }
        return Ok(());
    }

    /// Replaces non-positive values, returns the corrected config and one message per correction
    fn sanitized(mut self) -> (Self, Vec<String>) {
        let mut errors: Vec<String> = Vec::new();

        if self.reminder_interval <= 0 {
            self.reminder_interval = default_interval_millis();
            errors.push(format!(
                "The reminder interval was not positive, it has been reset to {}.", format_duration(DEFAULT_REMINDER_INTERVAL)
            ));
        }

        if self.look_away_time <= 0 {
            self.look_away_time = default_look_away_millis();
            errors.push(format!(
                "The look away time was not positive, it has been reset to {}.", format_duration(DEFAULT_LOOK_AWAY_TIME)
            ));
        }

        return (self, errors);
    }

    pub fn interval(&self) -> Duration {
        return Duration::from_millis(self.reminder_interval as u64);
    }

    pub fn look_away(&self) -> Duration {
        return Duration::from_millis(self.look_away_time as u64);
    }

    pub fn unit(&self) -> ReminderUnit {
        return self.reminder_unit;
    }

    /// The interval in whole units, as shown in the settings window
    pub fn interval_in_unit(&self) -> i64 {
        return self.reminder_interval / self.reminder_unit.millis();
    }

    /// The look away time in whole seconds
    pub fn look_away_seconds(&self) -> i64 {
        return self.look_away_time / 1000;
    }
}

fn parse_positive(text: &str, field: &str) -> Result<f64, SettingsError> {
    let text = text.trim();
    let value = text.parse::<f64>()
        .map_err(|_| SettingsError::InvalidInput(format!("{} must be a number, got '{}'.", field, text)))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(SettingsError::InvalidInput(POSITIVE_VALUES_MESSAGE.to_string()));
    }
    return Ok(value);
}

/// Formats a duration into a human readable string, e.g. "1 minute and 30 seconds"
pub fn format_duration(duration: Duration) -> String {
    let plural = |n: u64| if n == 1 { "" } else { "s" };

    let total_seconds = duration.as_secs();
    if total_seconds < 60 {
        return format!("{} second{}", total_seconds, plural(total_seconds));
    }

    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if seconds == 0 {
        return format!("{} minute{}", minutes, plural(minutes));
    }

    return format!("{} minute{} and {} second{}", minutes, plural(minutes), seconds, plural(seconds));
}


pub struct SettingsManager {
    path: PathBuf,
    config: ReminderConfig,
}

impl SettingsManager {
    /// Loads the settings from the default settings file, see [`settings_path`]
    pub fn new() -> Result<SettingsManager, (SettingsError, SettingsManager)> {
        return SettingsManager::open(settings_path().clone());
    }

    /// Loads the settings stored at `path`.
    ///
    /// A missing file is not an error, the defaults are used and nothing is written until the
    /// first save. On any other failure the error is returned together with a usable manager,
    /// holding either the defaults or the corrected values.
    pub fn open(path: impl Into<PathBuf>) -> Result<SettingsManager, (SettingsError, SettingsManager)> {
        let path = path.into();
        info!(path = %path.display(), "Loading settings");

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No settings file found, using the default settings");
                return Ok(SettingsManager::with_defaults(path));
            }
            Err(err) => {
                warn!(error = %err, "Failed to read the settings file");
                return Err((err.into(), SettingsManager::with_defaults(path)));
            }
        };

        let config = match serde_json::from_str::<ReminderConfig>(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "Failed to parse the settings file, using the default settings");
                return Err((err.into(), SettingsManager::with_defaults(path)));
            }
        };

        let (config, errors) = config.sanitized();
        let manager = SettingsManager { path, config };

        if !errors.is_empty() {
            warn!(count = errors.len(), "Found invalid values in the settings file");
            return Err((SettingsError::InvalidValue(errors.join("\n")), manager));
        }

        info!(?config, "Settings loaded successfully");
        return Ok(manager);
    }

    fn with_defaults(path: PathBuf) -> SettingsManager {
        return SettingsManager {
            path,
            config: ReminderConfig::default(),
        };
    }

    pub fn config(&self) -> ReminderConfig {
        return self.config;
    }

    pub fn path(&self) -> &Path {
        return &self.path;
    }

    /// Validates, serializes and saves the whole config.
    ///
    /// The file is replaced through a temporary sibling so a failed write never leaves a
    /// truncated file behind. The in-memory config only changes once the file is written.
    pub fn save(&mut self, config: ReminderConfig) -> Result<(), SettingsError> {
        config.validate()?;

        let serialized = serde_json::to_string_pretty(&config)?;
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, serialized)?;
        if let Err(err) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(err.into());
        }

        debug!(path = %self.path.display(), ?config, "Settings saved");
        self.config = config;
        return Ok(());
    }
}

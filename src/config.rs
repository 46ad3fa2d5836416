/// Settings persistence for the Pomodoro timer
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SETTINGS_FILE_NAME: &str = "pomodoro_settings.json";

/// Largest accepted value. Durations are counted in seconds as `u32`.
pub const MAX_SETTING: u32 = u32::MAX / 60;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {} is unreadable: {reason}", .path.display())]
    ConfigCorrupt { path: PathBuf, reason: String },

    #[error("could not write settings file {}: {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid value {input:?} for {field}: expected a whole number from 1 to {}", MAX_SETTING)]
    InvalidValue { field: Field, input: String },

    #[error("unknown setting {0:?} (expected work, break, long-break or until-long)")]
    UnknownField(String),
}

/// The four persisted values. Every field is strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Minutes
    pub work_duration: u32,
    /// Minutes
    pub break_duration: u32,
    /// Minutes
    pub long_break_duration: u32,
    pub pomodoros_until_long_break: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: 25,
            break_duration: 5,
            long_break_duration: 15,
            pomodoros_until_long_break: 4,
        }
    }
}

impl Settings {
    pub fn get(&self, field: Field) -> u32 {
        match field {
            Field::WorkDuration => self.work_duration,
            Field::BreakDuration => self.break_duration,
            Field::LongBreakDuration => self.long_break_duration,
            Field::PomodorosUntilLongBreak => self.pomodoros_until_long_break,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut u32 {
        match field {
            Field::WorkDuration => &mut self.work_duration,
            Field::BreakDuration => &mut self.break_duration,
            Field::LongBreakDuration => &mut self.long_break_duration,
            Field::PomodorosUntilLongBreak => &mut self.pomodoros_until_long_break,
        }
    }

    /// Builds settings from a parsed JSON object, falling back to the
    /// built-in default for every key that is missing or out of range.
    fn from_object(object: &Map<String, Value>) -> Self {
        let mut settings = Self::default();
        for field in Field::ALL {
            let Some(raw) = object.get(field.key()) else {
                debug!("{} missing from settings file, using default", field.key());
                continue;
            };
            match whole_setting(raw) {
                Some(value) => *settings.slot_mut(field) = value,
                None => warn!(
                    "ignoring invalid {} value {} in settings file, using default {}",
                    field.key(),
                    raw,
                    settings.get(field)
                ),
            }
        }
        settings
    }
}

/// Accepts integers and floats without a fractional part, e.g. `25.0`.
fn whole_setting(raw: &Value) -> Option<u32> {
    let value = match raw.as_u64() {
        Some(value) => value,
        None => {
            let float = raw.as_f64()?;
            if float.fract() != 0.0 || float < 1.0 || float > f64::from(MAX_SETTING) {
                return None;
            }
            float as u64
        }
    };
    u32::try_from(value)
        .ok()
        .filter(|value| (1..=MAX_SETTING).contains(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    WorkDuration,
    BreakDuration,
    LongBreakDuration,
    PomodorosUntilLongBreak,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::WorkDuration,
        Field::BreakDuration,
        Field::LongBreakDuration,
        Field::PomodorosUntilLongBreak,
    ];

    /// Key used in the settings file.
    pub fn key(self) -> &'static str {
        match self {
            Field::WorkDuration => "work_duration",
            Field::BreakDuration => "break_duration",
            Field::LongBreakDuration => "long_break_duration",
            Field::PomodorosUntilLongBreak => "pomodoros_until_long_break",
        }
    }

    /// Short name typed in the shell.
    pub fn short_name(self) -> &'static str {
        match self {
            Field::WorkDuration => "work",
            Field::BreakDuration => "break",
            Field::LongBreakDuration => "long-break",
            Field::PomodorosUntilLongBreak => "until-long",
        }
    }

    /// Menu label including the current value, e.g. `Work Duration: 25 min`.
    pub fn label(self, value: u32) -> String {
        match self {
            Field::WorkDuration => format!("Work Duration: {} min", value),
            Field::BreakDuration => format!("Break Duration: {} min", value),
            Field::LongBreakDuration => format!("Long Break Duration: {} min", value),
            Field::PomodorosUntilLongBreak => format!("Pomodoros until Long Break: {}", value),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Field::ALL
            .into_iter()
            .find(|field| field.short_name() == wanted || field.key() == wanted)
            .ok_or_else(|| SettingsError::UnknownField(s.trim().to_string()))
    }
}

/// Owns the in-memory settings and the file they are persisted to.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// `pomodoro_settings.json` next to the running executable, or in the
    /// current directory when the executable path cannot be resolved.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_FILE_NAME)
    }

    /// Reads the settings file, writing the defaults first when it is absent.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();

        if !path.exists() {
            info!("no settings file at {}, writing defaults", path.display());
            write_settings(&path, &Settings::default())?;
        }

        let content = fs::read_to_string(&path).map_err(|e| SettingsError::ConfigCorrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let parsed: Value =
            serde_json::from_str(&content).map_err(|e| SettingsError::ConfigCorrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let Value::Object(object) = parsed else {
            return Err(SettingsError::ConfigCorrupt {
                path,
                reason: "expected a JSON object".to_string(),
            });
        };

        let settings = Settings::from_object(&object);
        debug!("loaded settings {:?} from {}", settings, path.display());
        Ok(Self { path, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the file with the in-memory values.
    pub fn save(&self) -> Result<(), SettingsError> {
        write_settings(&self.path, &self.settings)
    }

    /// Validates `input` as an integer in `1..=MAX_SETTING` and stores it
    /// under `field`.
    ///
    /// Blank input keeps the current value and leaves the file alone. When
    /// the value is valid but cannot be written, the in-memory edit is kept
    /// and `ConfigWrite` is returned.
    pub fn set_field(&mut self, field: Field, input: &str) -> Result<u32, SettingsError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(self.settings.get(field));
        }

        let value = trimmed
            .parse::<u32>()
            .ok()
            .filter(|value| (1..=MAX_SETTING).contains(value))
            .ok_or_else(|| SettingsError::InvalidValue {
                field,
                input: input.to_string(),
            })?;

        *self.settings.slot_mut(field) = value;
        info!("{} set to {}", field.key(), value);
        self.save()?;
        Ok(value)
    }
}

fn write_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let write_error = |source: io::Error| SettingsError::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    fs::write(path, json).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_path(dir: &TempDir) -> PathBuf {
        dir.path().join(SETTINGS_FILE_NAME)
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);

        let store = SettingsStore::load(&path).unwrap();

        assert_eq!(*store.settings(), Settings::default());
        assert_eq!(
            read_json(&path),
            serde_json::json!({
                "work_duration": 25,
                "break_duration": 5,
                "long_break_duration": 15,
                "pomodoros_until_long_break": 4,
            })
        );
    }

    #[test]
    fn missing_parent_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);

        SettingsStore::load(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn partial_file_fills_missing_keys_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, r#"{"work_duration": 50, "pomodoros_until_long_break": 2}"#).unwrap();

        let store = SettingsStore::load(&path).unwrap();

        assert_eq!(
            *store.settings(),
            Settings {
                work_duration: 50,
                break_duration: 5,
                long_break_duration: 15,
                pomodoros_until_long_break: 2,
            }
        );
    }

    #[test]
    fn invalid_values_in_file_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(
            &path,
            r#"{"work_duration": 0, "break_duration": -3, "long_break_duration": "ten", "pomodoros_until_long_break": 6}"#,
        )
        .unwrap();

        let store = SettingsStore::load(&path).unwrap();

        assert_eq!(
            *store.settings(),
            Settings {
                pomodoros_until_long_break: 6,
                ..Settings::default()
            }
        );
    }

    #[test]
    fn unparseable_file_is_corrupt_and_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, "{not json").unwrap();

        let err = SettingsStore::load(&path).unwrap_err();

        assert!(matches!(err, SettingsError::ConfigCorrupt { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn non_object_json_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, "[25, 5, 15, 4]").unwrap();

        let err = SettingsStore::load(&path).unwrap_err();

        assert!(matches!(err, SettingsError::ConfigCorrupt { .. }));
    }

    #[test]
    fn set_field_updates_memory_and_disk() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let mut store = SettingsStore::load(&path).unwrap();

        let value = store.set_field(Field::LongBreakDuration, " 30 ").unwrap();

        assert_eq!(value, 30);
        assert_eq!(store.settings().long_break_duration, 30);
        assert_eq!(read_json(&path)["long_break_duration"], 30);
        assert_eq!(
            *SettingsStore::load(&path).unwrap().settings(),
            *store.settings()
        );
    }

    #[test]
    fn set_field_rejects_non_positive_and_non_numeric_input() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let mut store = SettingsStore::load(&path).unwrap();
        let on_disk = fs::read_to_string(&path).unwrap();

        for input in ["0", "-5", "abc", "2.5", "99999999999"] {
            let err = store.set_field(Field::WorkDuration, input).unwrap_err();
            assert!(
                matches!(err, SettingsError::InvalidValue { field: Field::WorkDuration, .. }),
                "{input} should be rejected"
            );
        }

        assert_eq!(store.settings().work_duration, 25);
        assert_eq!(fs::read_to_string(&path).unwrap(), on_disk);
    }

    #[test]
    fn blank_input_keeps_current_value() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let mut store = SettingsStore::load(&path).unwrap();

        assert_eq!(store.set_field(Field::BreakDuration, "   ").unwrap(), 5);
        assert_eq!(store.settings().break_duration, 5);
    }

    #[test]
    fn write_failure_keeps_the_edit_in_memory() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let mut store = SettingsStore::load(&path).unwrap();
        // Replacing the file with a directory makes every write fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let err = store.set_field(Field::WorkDuration, "40").unwrap_err();

        assert!(matches!(err, SettingsError::ConfigWrite { .. }));
        assert_eq!(store.settings().work_duration, 40);
    }

    #[test]
    fn field_names_parse_from_short_and_json_names() {
        assert_eq!("work".parse::<Field>().unwrap(), Field::WorkDuration);
        assert_eq!("Long-Break".parse::<Field>().unwrap(), Field::LongBreakDuration);
        assert_eq!(
            "pomodoros_until_long_break".parse::<Field>().unwrap(),
            Field::PomodorosUntilLongBreak
        );
        assert!(matches!(
            "lunch".parse::<Field>(),
            Err(SettingsError::UnknownField(name)) if name == "lunch"
        ));
    }

    #[test]
    fn labels_match_menu_text() {
        assert_eq!(Field::WorkDuration.label(25), "Work Duration: 25 min");
        assert_eq!(
            Field::PomodorosUntilLongBreak.label(4),
            "Pomodoros until Long Break: 4"
        );
    }

    #[test]
    fn whole_floats_in_file_are_kept() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(&path, r#"{"work_duration": 25.0, "break_duration": 7.5}"#).unwrap();

        let store = SettingsStore::load(&path).unwrap();

        assert_eq!(store.settings().work_duration, 25);
        assert_eq!(store.settings().break_duration, 5);
    }

    #[test]
    fn values_above_the_maximum_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        fs::write(
            &path,
            format!(r#"{{"long_break_duration": {}}}"#, u64::from(MAX_SETTING) + 1),
        )
        .unwrap();
        let mut store = SettingsStore::load(&path).unwrap();
        assert_eq!(store.settings().long_break_duration, 15);

        let too_big = (MAX_SETTING + 1).to_string();
        assert!(matches!(
            store.set_field(Field::WorkDuration, &too_big),
            Err(SettingsError::InvalidValue { .. })
        ));
        assert_eq!(store.settings().work_duration, 25);

        let largest = MAX_SETTING.to_string();
        assert_eq!(store.set_field(Field::WorkDuration, &largest).unwrap(), MAX_SETTING);
    }
}

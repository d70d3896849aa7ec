//! Per-user timer settings.
//!
//! Settings are owned by a [`SettingsStore`]; the timer only reads them.
//! Updates are partial: every field present in a [`SettingsPatch`] is
//! validated against its range, absent fields keep their previous value,
//! and a patch with any out-of-range field is rejected as a whole.

use serde::{Deserialize, Serialize};

use crate::error::{FieldViolation, Result, ValidationError};

pub const WORK_RANGE: (u32, u32) = (1, 60);
pub const BREAK_RANGE: (u32, u32) = (1, 30);
pub const LONG_BREAK_RANGE: (u32, u32) = (1, 60);
pub const CYCLES_RANGE: (u32, u32) = (1, 10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Work interval length in minutes.
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_break_duration")]
    pub break_duration: u32,
    #[serde(default = "default_long_break_duration")]
    pub long_break_duration: u32,
    /// Completed work sessions before a long break replaces a short one.
    #[serde(default = "default_cycles_until_long_break")]
    pub cycles_until_long_break: u32,
    #[serde(default = "default_true")]
    pub notifications: bool,
    #[serde(default = "default_true")]
    pub sound: bool,
}

fn default_work_duration() -> u32 {
    25
}
fn default_break_duration() -> u32 {
    5
}
fn default_long_break_duration() -> u32 {
    15
}
fn default_cycles_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            break_duration: default_break_duration(),
            long_break_duration: default_long_break_duration(),
            cycles_until_long_break: default_cycles_until_long_break(),
            notifications: true,
            sound: true,
        }
    }
}

/// Partial settings update. `None` leaves the field unchanged.
///
/// Numeric fields are signed so that negative input reaches validation
/// instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_break_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles_until_long_break: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }
}

fn check(
    field: &'static str,
    value: Option<i64>,
    (min, max): (u32, u32),
    violations: &mut Vec<FieldViolation>,
) -> Option<u32> {
    let value = value?;
    if value < i64::from(min) || value > i64::from(max) {
        violations.push(FieldViolation {
            field,
            value,
            min,
            max,
        });
        return None;
    }
    u32::try_from(value).ok()
}

impl Settings {
    /// Apply a patch, returning the merged settings.
    ///
    /// # Errors
    /// Returns [`ValidationError::Settings`] listing every out-of-range
    /// field. `self` is never modified.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<Settings, ValidationError> {
        let mut violations = Vec::new();
        let work = check("work_duration", patch.work_duration, WORK_RANGE, &mut violations);
        let brk = check("break_duration", patch.break_duration, BREAK_RANGE, &mut violations);
        let long = check(
            "long_break_duration",
            patch.long_break_duration,
            LONG_BREAK_RANGE,
            &mut violations,
        );
        let cycles = check(
            "cycles_until_long_break",
            patch.cycles_until_long_break,
            CYCLES_RANGE,
            &mut violations,
        );
        if !violations.is_empty() {
            return Err(ValidationError::Settings(violations));
        }

        Ok(Settings {
            work_duration: work.unwrap_or(self.work_duration),
            break_duration: brk.unwrap_or(self.break_duration),
            long_break_duration: long.unwrap_or(self.long_break_duration),
            cycles_until_long_break: cycles.unwrap_or(self.cycles_until_long_break),
            notifications: patch.notifications.unwrap_or(self.notifications),
            sound: patch.sound.unwrap_or(self.sound),
        })
    }

    /// Check an already-built settings value, e.g. one read back from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        Settings::default()
            .apply(&SettingsPatch::from(self))
            .map(|_| ())
    }
}

impl From<&Settings> for SettingsPatch {
    fn from(s: &Settings) -> Self {
        Self {
            work_duration: Some(s.work_duration.into()),
            break_duration: Some(s.break_duration.into()),
            long_break_duration: Some(s.long_break_duration.into()),
            cycles_until_long_break: Some(s.cycles_until_long_break.into()),
            notifications: Some(s.notifications),
            sound: Some(s.sound),
        }
    }
}

/// Source of per-user settings. One settings document per user.
pub trait SettingsStore: Send + Sync {
    /// Settings for `user`, or the defaults when none were saved.
    fn get(&self, user: &str) -> Result<Settings>;

    /// Merge `patch` into the user's settings and persist the result.
    fn update(&self, user: &str, patch: &SettingsPatch) -> Result<Settings>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_pomodoro() {
        let s = Settings::default();
        assert_eq!(s.work_duration, 25);
        assert_eq!(s.break_duration, 5);
        assert_eq!(s.long_break_duration, 15);
        assert_eq!(s.cycles_until_long_break, 4);
        assert!(s.notifications && s.sound);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn absent_fields_are_kept() {
        let base = Settings::default();
        let patch = SettingsPatch {
            break_duration: Some(10),
            sound: Some(false),
            ..Default::default()
        };
        let merged = base.apply(&patch).unwrap();
        assert_eq!(merged.break_duration, 10);
        assert!(!merged.sound);
        assert_eq!(merged.work_duration, 25);
        assert!(merged.notifications);
    }

    #[test]
    fn every_out_of_range_field_is_reported() {
        let patch = SettingsPatch {
            work_duration: Some(0),
            break_duration: Some(31),
            long_break_duration: Some(15),
            cycles_until_long_break: Some(11),
            ..Default::default()
        };
        let err = Settings::default().apply(&patch).unwrap_err();
        assert_eq!(
            err.fields(),
            vec!["work_duration", "break_duration", "cycles_until_long_break"]
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        let patch = SettingsPatch {
            work_duration: Some(60),
            break_duration: Some(1),
            long_break_duration: Some(60),
            cycles_until_long_break: Some(10),
            ..Default::default()
        };
        assert!(Settings::default().apply(&patch).is_ok());
    }

    #[test]
    fn negative_values_are_rejected() {
        let patch = SettingsPatch {
            long_break_duration: Some(-5),
            ..Default::default()
        };
        assert!(Settings::default().apply(&patch).is_err());
    }

    #[test]
    fn missing_toml_fields_take_defaults() {
        let s: Settings = toml::from_str("work_duration = 50").unwrap();
        assert_eq!(s.work_duration, 50);
        assert_eq!(s.cycles_until_long_break, 4);
    }
}

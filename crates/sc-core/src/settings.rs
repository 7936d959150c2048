//! User-facing settings.
//!
//! Settings are flat key/value pairs so any store can persist them. They are
//! not part of the aggregation core; the engine only reads them.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// Known setting keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    MonitoringEnabled,
    NotificationsEnabled,
    DetoxMessagesEnabled,
    HumorMessagesEnabled,
    NotificationTime,
}

impl SettingKey {
    pub const ALL: [Self; 5] = [
        Self::MonitoringEnabled,
        Self::NotificationsEnabled,
        Self::DetoxMessagesEnabled,
        Self::HumorMessagesEnabled,
        Self::NotificationTime,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MonitoringEnabled => "monitoring_enabled",
            Self::NotificationsEnabled => "notifications_enabled",
            Self::DetoxMessagesEnabled => "detox_messages_enabled",
            Self::HumorMessagesEnabled => "humor_messages_enabled",
            Self::NotificationTime => "notification_time",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownSetting { key: s.to_string() })
    }
}

/// The persisted user settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether foreground sessions are recorded.
    pub monitoring_enabled: bool,
    /// Whether the daily notification is scheduled.
    pub notifications_enabled: bool,
    /// Whether notifications use the health table instead of a plain summary.
    pub detox_messages_enabled: bool,
    /// Whether humor messages are shown.
    pub humor_messages_enabled: bool,
    /// Local time of the daily notification.
    pub notification_time: NaiveTime,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitoring_enabled: false,
            notifications_enabled: true,
            detox_messages_enabled: true,
            humor_messages_enabled: true,
            notification_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        }
    }
}

impl Settings {
    /// Current value of `key` in its persisted string form.
    pub fn get(&self, key: SettingKey) -> String {
        match key {
            SettingKey::MonitoringEnabled => self.monitoring_enabled.to_string(),
            SettingKey::NotificationsEnabled => self.notifications_enabled.to_string(),
            SettingKey::DetoxMessagesEnabled => self.detox_messages_enabled.to_string(),
            SettingKey::HumorMessagesEnabled => self.humor_messages_enabled.to_string(),
            SettingKey::NotificationTime => self.notification_time.format("%H:%M").to_string(),
        }
    }

    /// Parses and applies `value` for `key`.
    pub fn set(&mut self, key: SettingKey, value: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        let invalid = || ValidationError::InvalidSettingValue {
            key: key.as_str(),
            value: value.to_string(),
        };
        let flag = || parse_bool(value).ok_or_else(&invalid);
        match key {
            SettingKey::MonitoringEnabled => self.monitoring_enabled = flag()?,
            SettingKey::NotificationsEnabled => self.notifications_enabled = flag()?,
            SettingKey::DetoxMessagesEnabled => self.detox_messages_enabled = flag()?,
            SettingKey::HumorMessagesEnabled => self.humor_messages_enabled = flag()?,
            SettingKey::NotificationTime => {
                self.notification_time =
                    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| invalid())?;
            }
        }
        Ok(())
    }

    /// All settings as key/value pairs.
    pub fn to_pairs(&self) -> Vec<(SettingKey, String)> {
        SettingKey::ALL.into_iter().map(|k| (k, self.get(k))).collect()
    }

    /// Builds settings from stored pairs.
    ///
    /// Unknown keys and unparseable values are logged and ignored, leaving the
    /// default in place.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let result = key
                .parse::<SettingKey>()
                .and_then(|k| settings.set(k, value.as_ref()));
            if let Err(e) = result {
                tracing::warn!(key, error = %e, "ignoring stored setting");
            }
        }
        settings
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_run() {
        let settings = Settings::default();
        assert!(!settings.monitoring_enabled);
        assert!(settings.notifications_enabled);
        assert!(settings.detox_messages_enabled);
        assert_eq!(settings.get(SettingKey::NotificationTime), "21:00");
    }

    #[test]
    fn set_parses_flags_and_time() {
        let mut settings = Settings::default();
        settings.set(SettingKey::MonitoringEnabled, "on").unwrap();
        settings.set(SettingKey::HumorMessagesEnabled, "false").unwrap();
        settings.set(SettingKey::NotificationTime, "07:30").unwrap();
        assert!(settings.monitoring_enabled);
        assert!(!settings.humor_messages_enabled);
        assert_eq!(settings.get(SettingKey::NotificationTime), "07:30");
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(settings.set(SettingKey::NotificationTime, "25:00").is_err());
        assert!(settings.set(SettingKey::DetoxMessagesEnabled, "maybe").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn pairs_roundtrip() {
        let mut settings = Settings::default();
        settings.set(SettingKey::NotificationsEnabled, "no").unwrap();
        let pairs: Vec<(String, String)> = settings
            .to_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(Settings::from_pairs(pairs), settings);
    }

    #[test]
    fn from_pairs_ignores_unknown_and_invalid() {
        let settings = Settings::from_pairs([
            ("theme", "dark"),
            ("notification_time", "noon"),
            ("monitoring_enabled", "true"),
        ]);
        assert!(settings.monitoring_enabled);
        assert_eq!(settings.get(SettingKey::NotificationTime), "21:00");
    }

    #[test]
    fn unknown_key_errors() {
        assert!("volume".parse::<SettingKey>().is_err());
        assert_eq!(
            "notification_time".parse::<SettingKey>().unwrap(),
            SettingKey::NotificationTime
        );
    }
}

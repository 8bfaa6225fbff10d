//! Process configuration, read once from the environment at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_SCHEDULE_PATH: &str = "SCHEDULE_XLSX_PATH";
pub const ENV_REMARKS_PATH: &str = "REMARKS_XLSX_PATH";
pub const ENV_REMARKS_URL: &str = "REMARKS_URL";
pub const ENV_SYNC_TTL: &str = "REMARKS_SYNC_TTL_SECS";
pub const ENV_INSPECTOR_SHEET: &str = "INSPECTOR_SHEET";
pub const ENV_HISTORY_PATH: &str = "REMARKS_HISTORY_PATH";

pub const DEFAULT_SYNC_TTL_SECS: u64 = 3600;
pub const DEFAULT_INSPECTOR_SHEET: &str = "ПБ, АР,ММГН, АГО (2025)";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub schedule_path: PathBuf,
    pub remarks_path: PathBuf,
    /// `None` disables remote sync
    pub remarks_url: Option<String>,
    pub sync_ttl_secs: u64,
    pub inspector_sheet: String,
    /// SQLite file for the status-mark history
    pub history_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            schedule_path: PathBuf::from("schedule.xlsx"),
            remarks_path: PathBuf::from("remarks.xlsx"),
            remarks_url: None,
            sync_ttl_secs: DEFAULT_SYNC_TTL_SECS,
            inspector_sheet: DEFAULT_INSPECTOR_SHEET.to_string(),
            history_path: PathBuf::from("remarks_history.db"),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Config::default();

        let sync_ttl_secs = match get(ENV_SYNC_TTL) {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: ENV_SYNC_TTL,
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.sync_ttl_secs,
        };

        Ok(Config {
            schedule_path: get(ENV_SCHEDULE_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.schedule_path),
            remarks_path: get(ENV_REMARKS_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.remarks_path),
            remarks_url: get(ENV_REMARKS_URL),
            sync_ttl_secs,
            inspector_sheet: get(ENV_INSPECTOR_SHEET).unwrap_or(defaults.inspector_sheet),
            history_path: get(ENV_HISTORY_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.history_path),
        })
    }

    pub fn sync_ttl(&self) -> Duration {
        Duration::from_secs(self.sync_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sync_ttl(), Duration::from_secs(3600));
        assert!(config.remarks_url.is_none());
    }

    #[test]
    fn test_reads_all_keys() {
        let config = Config::from_lookup(lookup(&[
            (ENV_SCHEDULE_PATH, "/srv/bot/График.xlsx"),
            (ENV_REMARKS_PATH, "/srv/bot/ОНзС.xlsx"),
            (ENV_REMARKS_URL, "https://example.org/onzs.xlsx"),
            (ENV_SYNC_TTL, "600"),
            (ENV_INSPECTOR_SHEET, "Инспектор"),
            (ENV_HISTORY_PATH, "/srv/bot/history.db"),
        ]))
        .unwrap();

        assert_eq!(config.schedule_path, PathBuf::from("/srv/bot/График.xlsx"));
        assert_eq!(config.remarks_path, PathBuf::from("/srv/bot/ОНзС.xlsx"));
        assert_eq!(config.remarks_url.as_deref(), Some("https://example.org/onzs.xlsx"));
        assert_eq!(config.sync_ttl_secs, 600);
        assert_eq!(config.inspector_sheet, "Инспектор");
        assert_eq!(config.history_path, PathBuf::from("/srv/bot/history.db"));
    }

    #[test]
    fn test_blank_url_disables_sync() {
        let config = Config::from_lookup(lookup(&[(ENV_REMARKS_URL, "   ")])).unwrap();
        assert!(config.remarks_url.is_none());
    }

    #[test]
    fn test_bad_ttl_is_an_error() {
        let err = Config::from_lookup(lookup(&[(ENV_SYNC_TTL, "hourly")])).unwrap_err();
        assert!(err.to_string().contains(ENV_SYNC_TTL));
    }
}

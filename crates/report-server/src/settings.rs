//! User Settings
//!
//! Followed symbols plus free-form alert and report preferences, kept in
//! memory per user identifier.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};

/// Settings payload accepted and returned by the API
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub followed_cryptos: Vec<String>,

    #[serde(default)]
    pub alert_settings: Value,

    #[serde(default)]
    pub report_preferences: Value,
}

/// Stored preferences of one user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_identifier: String,
    pub settings: UserSettings,
    pub updated_at: DateTime<Utc>,
}

pub trait SettingsStore: Send + Sync {
    fn get(&self, user: &str) -> Result<Option<UserPreference>>;

    /// Replace the user's settings
    fn put(&self, user: &str, settings: UserSettings) -> Result<UserPreference>;
}

fn poisoned<T>(_: PoisonError<T>) -> ApiError {
    ApiError::Storage("settings store lock poisoned".into())
}

/// In-memory settings store
pub struct MemorySettingsStore {
    preferences: RwLock<HashMap<String, UserPreference>>,
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self {
            preferences: RwLock::new(HashMap::new()),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, user: &str) -> Result<Option<UserPreference>> {
        let prefs = self.preferences.read().map_err(poisoned)?;
        Ok(prefs.get(user).cloned())
    }

    fn put(&self, user: &str, mut settings: UserSettings) -> Result<UserPreference> {
        settings.followed_cryptos = settings
            .followed_cryptos
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        let preference = UserPreference {
            user_identifier: user.to_string(),
            settings,
            updated_at: Utc::now(),
        };

        let mut prefs = self.preferences.write().map_err(poisoned)?;
        prefs.insert(user.to_string(), preference.clone());
        Ok(preference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_replaces() {
        let store = MemorySettingsStore::new();
        assert!(store.get("u1").unwrap().is_none());

        store
            .put("u1", UserSettings { followed_cryptos: vec!["btc-usd".into()], ..Default::default() })
            .unwrap();
        let pref = store
            .put(
                "u1",
                UserSettings {
                    followed_cryptos: vec![" eth-usd ".into(), String::new()],
                    report_preferences: json!({"format": "md"}),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(pref.settings.followed_cryptos, vec!["ETH-USD"]);
        let stored = store.get("u1").unwrap().unwrap();
        assert_eq!(stored.settings, pref.settings);
    }

    #[test]
    fn test_settings_json_shape() {
        let settings: UserSettings =
            serde_json::from_value(json!({"followedCryptos": ["BTC-USD"], "alertSettings": {"email": true}}))
                .unwrap();
        assert_eq!(settings.followed_cryptos, vec!["BTC-USD"]);
        assert_eq!(settings.alert_settings["email"], true);
        assert_eq!(settings.report_preferences, Value::Null);
    }
}

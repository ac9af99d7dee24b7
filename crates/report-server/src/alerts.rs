//! Alert Subscriptions
//!
//! Per-user price alert subscriptions. Conditions are validated and stored;
//! nothing here evaluates them against market data or sends notifications.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, Result};

/// A supported alert condition, e.g. `price_drops_below_40000`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertCondition {
    PriceDropsBelow(Decimal),
    PriceExceeds(Decimal),
    PriceIncreasePercent(Decimal),
    PriceDecreasePercent(Decimal),
}

fn parse_threshold(s: &str) -> Option<Decimal> {
    let value = Decimal::from_str(s).ok()?;
    (value > Decimal::ZERO).then_some(value)
}

impl FromStr for AlertCondition {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();

        let percent = |prefix: &str| {
            s.strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix("_percent"))
                .and_then(parse_threshold)
        };

        let condition = if let Some(n) = s.strip_prefix("price_drops_below_") {
            parse_threshold(n).map(AlertCondition::PriceDropsBelow)
        } else if let Some(n) = s.strip_prefix("price_exceeds_") {
            parse_threshold(n).map(AlertCondition::PriceExceeds)
        } else if s.starts_with("price_increase_") {
            percent("price_increase_").map(AlertCondition::PriceIncreasePercent)
        } else if s.starts_with("price_decrease_") {
            percent("price_decrease_").map(AlertCondition::PriceDecreasePercent)
        } else {
            None
        };

        condition.ok_or_else(|| ApiError::BadRequest(format!("Unsupported alert condition: {s}")))
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertCondition::PriceDropsBelow(n) => write!(f, "price_drops_below_{}", n.normalize()),
            AlertCondition::PriceExceeds(n) => write!(f, "price_exceeds_{}", n.normalize()),
            AlertCondition::PriceIncreasePercent(n) => {
                write!(f, "price_increase_{}_percent", n.normalize())
            }
            AlertCondition::PriceDecreasePercent(n) => {
                write!(f, "price_decrease_{}_percent", n.normalize())
            }
        }
    }
}

/// A stored subscription
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertSubscription {
    pub id: Uuid,
    pub user_identifier: String,
    pub crypto_symbol: String,

    /// Canonical condition string
    pub alert_condition: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_alert_sent_at: Option<DateTime<Utc>>,
}

impl AlertSubscription {
    pub fn new(user: &str, symbol: &str, condition: AlertCondition) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_identifier: user.to_string(),
            crypto_symbol: symbol.to_uppercase(),
            alert_condition: condition.to_string(),
            is_active: true,
            created_at: Utc::now(),
            last_alert_sent_at: None,
        }
    }

    fn matches(&self, user: &str, symbol: &str, condition: &str) -> bool {
        self.user_identifier == user
            && self.crypto_symbol.eq_ignore_ascii_case(symbol)
            && self.alert_condition == condition
    }
}

/// Result of a subscribe call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Created,
    Reactivated,
    AlreadyActive,
}

/// Subscription storage
pub trait SubscriptionStore: Send + Sync {
    /// Subscribe, reusing an existing record for the same user/symbol/condition
    fn subscribe(
        &self,
        user: &str,
        symbol: &str,
        condition: AlertCondition,
    ) -> Result<(SubscribeOutcome, AlertSubscription)>;

    /// Mark the active subscription inactive; `None` when there is none
    fn unsubscribe(
        &self,
        user: &str,
        symbol: &str,
        condition: AlertCondition,
    ) -> Result<Option<AlertSubscription>>;

    /// Active subscriptions of a user, oldest first
    fn active_for_user(&self, user: &str) -> Result<Vec<AlertSubscription>>;
}

fn poisoned<T>(_: PoisonError<T>) -> ApiError {
    ApiError::Storage("subscription store lock poisoned".into())
}

/// In-memory subscription store
pub struct MemorySubscriptionStore {
    subscriptions: RwLock<HashMap<Uuid, AlertSubscription>>,
}

impl Default for MemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }
}

impl SubscriptionStore for MemorySubscriptionStore {
    fn subscribe(
        &self,
        user: &str,
        symbol: &str,
        condition: AlertCondition,
    ) -> Result<(SubscribeOutcome, AlertSubscription)> {
        let mut subs = self.subscriptions.write().map_err(poisoned)?;
        let condition_key = condition.to_string();

        if let Some(existing) = subs.values_mut().find(|s| s.matches(user, symbol, &condition_key)) {
            let outcome = if existing.is_active {
                SubscribeOutcome::AlreadyActive
            } else {
                existing.is_active = true;
                SubscribeOutcome::Reactivated
            };
            return Ok((outcome, existing.clone()));
        }

        let subscription = AlertSubscription::new(user, symbol, condition);
        subs.insert(subscription.id, subscription.clone());
        Ok((SubscribeOutcome::Created, subscription))
    }

    fn unsubscribe(
        &self,
        user: &str,
        symbol: &str,
        condition: AlertCondition,
    ) -> Result<Option<AlertSubscription>> {
        let mut subs = self.subscriptions.write().map_err(poisoned)?;
        let condition_key = condition.to_string();

        Ok(subs
            .values_mut()
            .find(|s| s.is_active && s.matches(user, symbol, &condition_key))
            .map(|s| {
                s.is_active = false;
                s.clone()
            }))
    }

    fn active_for_user(&self, user: &str) -> Result<Vec<AlertSubscription>> {
        let subs = self.subscriptions.read().map_err(poisoned)?;
        let mut active: Vec<AlertSubscription> = subs
            .values()
            .filter(|s| s.is_active && s.user_identifier == user)
            .cloned()
            .collect();
        active.sort_by_key(|s| s.created_at);
        Ok(active)
    }
}

/// Expiry tracking
///
/// Tracked items, alert configurations, status classification, the alert rule
/// engine and the client-side store the dashboards read from.

pub mod alerts;
pub mod backend;
pub mod classifier;
pub mod extension;
pub mod store;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use alerts::{AlertDecision, AlertRuleEngine};
pub use backend::{AlertAck, AlertUpdate, ExpiryBackend, ExpiryUpdate, NewAlert};
pub use classifier::{
    classify, classify_date, date_to_instant, days_text, days_until_expiry, format_display_date,
    ExpiryStatus, EXPIRING_SOON_WINDOW_DAYS,
};
pub use store::ExpiryStore;
pub use view::{ExpiryQuery, ExpiryTab, SortDirection, SortField};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Default alert threshold when the backend omits one
pub const DEFAULT_ALERT_DAYS: u32 = 30;

fn default_alert_days() -> u32 {
    DEFAULT_ALERT_DAYS
}

/// NULL columns come back as `null`, which `#[serde(default)]` alone rejects
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default_alert_days<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(DEFAULT_ALERT_DAYS))
}

/// Inventory item tracked for expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub batch_number: String,
    /// Base expiry date
    pub expiry_date: NaiveDate,
    /// Shelf-life extension, only present together with `notes`
    #[serde(default)]
    pub extended_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantity: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub supplier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(
        default = "default_alert_days",
        deserialize_with = "null_as_default_alert_days"
    )]
    pub alert_days: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alert_enabled: bool,
    #[serde(default)]
    pub notes: Option<String>,
    /// Server-computed status; informational only, recomputed locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_status: Option<ExpiryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl TrackedItem {
    /// Extension date if one is recorded, otherwise the base expiry date
    pub fn effective_expiry_date(&self) -> NaiveDate {
        self.extended_date.unwrap_or(self.expiry_date)
    }

    pub fn has_extension(&self) -> bool {
        self.extended_date.is_some()
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> ExpiryStatus {
        classify_date(self.effective_expiry_date(), now)
    }

    pub fn days_until_expiry_at(&self, now: DateTime<Utc>) -> i64 {
        days_until_expiry(date_to_instant(self.effective_expiry_date()), now)
    }

    /// Everything a row of the expiry table shows for this item
    pub fn summary_at(&self, now: DateTime<Utc>) -> ItemSummary {
        let status = self.status_at(now);
        let days = self.days_until_expiry_at(now);

        ItemSummary {
            item_id: self.id.clone(),
            status,
            days_until_expiry: days,
            days_text: days_text(days),
            effective_date_label: format_display_date(self.effective_expiry_date()),
            extended_from: self
                .extended_date
                .map(|_| format!("Extended from {}", format_display_date(self.expiry_date))),
            note: self.notes.clone(),
            alert_label: if self.alert_enabled {
                format!("{} days", self.alert_days)
            } else {
                "Off".to_string()
            },
            can_extend: status == ExpiryStatus::Expired && !self.has_extension(),
            proposed_extension: self.expiry_date + chrono::Duration::days(EXPIRING_SOON_WINDOW_DAYS),
        }
    }
}

/// Derived, display-ready view of a tracked item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub item_id: String,
    pub status: ExpiryStatus,
    pub days_until_expiry: i64,
    pub days_text: String,
    pub effective_date_label: String,
    pub extended_from: Option<String>,
    pub note: Option<String>,
    pub alert_label: String,
    /// Only expired items without an extension may be extended
    pub can_extend: bool,
    /// Suggested extension date: base expiry plus 30 days
    pub proposed_extension: NaiveDate,
}

/// Notification channel for an expiry alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    App,
    #[default]
    Both,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "email",
            NotificationType::App => "app",
            NotificationType::Both => "both",
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = crate::error::ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(NotificationType::Email),
            "app" => Ok(NotificationType::App),
            "both" => Ok(NotificationType::Both),
            other => Err(crate::error::ClientError::Validation(format!(
                "Unknown notification type: {}",
                other
            ))),
        }
    }
}

/// Alert configuration, one per tracked item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub id: String,
    /// Tracked item id
    pub medicine_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub medicine_name: String,
    pub days_before_expiry: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notification_type: NotificationType,
    pub enabled: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

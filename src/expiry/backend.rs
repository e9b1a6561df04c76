/// Backend seam for expiry data
///
/// The store and the alert rule engine talk to the REST API only through this
/// trait, so every mutation can be acknowledged before it is committed locally.
use super::{AlertConfig, NotificationType, TrackedItem};
use crate::error::ClientResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Payload for creating an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub medicine_id: String,
    pub days_before_expiry: u32,
    pub notification_type: NotificationType,
    pub enabled: bool,
}

/// Payload for updating an existing alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertUpdate {
    pub days_before_expiry: u32,
    pub notification_type: NotificationType,
    pub enabled: bool,
}

/// Backend acknowledgement of a created alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertAck {
    #[serde(alias = "alert_id")]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `PUT /api/inventory/items/{id}/expiry`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExpiryUpdate {
    /// Change the base expiry date
    BaseDate { expiry_date: NaiveDate },
    /// Record a shelf-life extension with its justification
    Extend {
        extended_date: NaiveDate,
        notes: String,
    },
    /// Drop the extension; both fields go out as null
    ClearExtension {
        extended_date: Option<NaiveDate>,
        notes: Option<String>,
    },
}

impl ExpiryUpdate {
    pub fn clear_extension() -> Self {
        ExpiryUpdate::ClearExtension {
            extended_date: None,
            notes: None,
        }
    }
}

/// Expiry operations offered by the backend
#[async_trait]
pub trait ExpiryBackend: Send + Sync {
    /// `GET /api/inventory/expiry`
    async fn fetch_items(&self) -> ClientResult<Vec<TrackedItem>>;

    /// `GET /api/inventory/expiry/alerts`
    async fn fetch_alerts(&self) -> ClientResult<Vec<AlertConfig>>;

    /// `POST /api/inventory/expiry/alerts`
    async fn create_alert(&self, alert: &NewAlert) -> ClientResult<AlertAck>;

    /// `PUT /api/inventory/expiry/alerts/{id}`
    async fn update_alert(&self, alert_id: &str, update: &AlertUpdate) -> ClientResult<()>;

    /// `PUT /api/inventory/items/{id}/expiry`
    async fn update_item_expiry(&self, item_id: &str, update: &ExpiryUpdate) -> ClientResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_extension_serializes_nulls() {
        let body = serde_json::to_value(ExpiryUpdate::clear_extension()).unwrap();
        assert_eq!(body, serde_json::json!({"extended_date": null, "notes": null}));
    }

    #[test]
    fn test_extend_payload() {
        let body = serde_json::to_value(ExpiryUpdate::Extend {
            extended_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            notes: "QC passed".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"extended_date": "2025-08-01", "notes": "QC passed"}));
    }

    #[test]
    fn test_ack_accepts_alert_id() {
        let ack: AlertAck =
            serde_json::from_str(r#"{"message":"Alert created","alert_id":"ALERT_17"}"#).unwrap();
        assert_eq!(ack.id, "ALERT_17");
        assert!(ack.created_at.is_none());
    }
}

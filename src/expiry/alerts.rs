/// Alert rule engine
///
/// Alert mutations follow one pattern: validate locally, send to the backend,
/// and only commit to the store once the backend has acknowledged. A failed
/// call leaves the store exactly as it was.
use super::{
    AlertConfig, AlertUpdate, ExpiryStore, NewAlert, NotificationType, TrackedItem,
    DEFAULT_ALERT_DAYS,
};
use crate::error::{ClientError, ClientResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Whether an item's alert should fire now, and on which channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertDecision {
    pub item_id: String,
    pub due: bool,
    pub enabled: bool,
    pub threshold_days: u32,
    pub days_until_expiry: i64,
    /// `None` while the alert is disabled
    pub channel: Option<NotificationType>,
}

/// Decide notification eligibility for one item.
///
/// The alert config wins over the item's own `alert_days`/`alert_enabled`
/// when both exist. Already-expired items stay due while enabled.
pub fn evaluate_alert(
    item: &TrackedItem,
    alert: Option<&AlertConfig>,
    now: DateTime<Utc>,
) -> AlertDecision {
    let (enabled, threshold, channel) = match alert {
        Some(alert) => (alert.enabled, alert.days_before_expiry, alert.notification_type),
        None => (item.alert_enabled, item.alert_days, NotificationType::Both),
    };
    let days = item.days_until_expiry_at(now);

    AlertDecision {
        item_id: item.id.clone(),
        due: enabled && days <= i64::from(threshold),
        enabled,
        threshold_days: threshold,
        days_until_expiry: days,
        channel: enabled.then_some(channel),
    }
}

/// Alert rule engine over the shared expiry store
pub struct AlertRuleEngine {
    store: Arc<ExpiryStore>,
}

impl AlertRuleEngine {
    pub fn new(store: Arc<ExpiryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ExpiryStore> {
        &self.store
    }

    /// Create or update the single alert for an item.
    ///
    /// A first call creates the config enabled; later calls update the same
    /// record, keeping its id and creation time.
    pub async fn upsert_alert(
        &self,
        item_id: &str,
        days_before_expiry: u32,
        notification_type: NotificationType,
    ) -> ClientResult<AlertConfig> {
        validate_threshold(days_before_expiry)?;

        let _guard = self.store.exclusive().await;
        let item = self.store.require_item(item_id)?;

        let alert = match self.store.alert_for(item_id) {
            Some(existing) => {
                self.push_update(&existing, days_before_expiry, notification_type, true)
                    .await?
            }
            None => {
                self.push_create(&item, days_before_expiry, notification_type, true)
                    .await?
            }
        };

        self.store.commit_alert(alert.clone());
        info!(
            "Alert set for {} ({}): {} days before expiry via {}",
            item.name,
            item.id,
            alert.days_before_expiry,
            alert.notification_type.as_str()
        );
        Ok(alert)
    }

    /// Disable an item's alert, keeping its threshold and channel on record
    pub async fn disable_alert(&self, item_id: &str) -> ClientResult<AlertConfig> {
        let _guard = self.store.exclusive().await;
        let item = self.store.require_item(item_id)?;
        let existing = self
            .store
            .alert_for(item_id)
            .ok_or_else(|| ClientError::NotFound(format!("Alert for item {}", item_id)))?;

        let alert = self
            .push_update(
                &existing,
                existing.days_before_expiry,
                existing.notification_type,
                false,
            )
            .await?;

        self.store.commit_alert(alert.clone());
        info!("Alert disabled for {} ({})", item.name, item.id);
        Ok(alert)
    }

    /// Flip an item's alert.
    ///
    /// Re-enabling reuses the last threshold and channel. Without a stored
    /// config the item's own flags are the starting point.
    pub async fn toggle_alert(&self, item_id: &str) -> ClientResult<AlertConfig> {
        let _guard = self.store.exclusive().await;
        let item = self.store.require_item(item_id)?;

        let alert = match self.store.alert_for(item_id) {
            Some(existing) => {
                let enable = !existing.enabled;
                self.push_update(
                    &existing,
                    existing.days_before_expiry,
                    existing.notification_type,
                    enable,
                )
                .await?
            }
            None => {
                let threshold = if item.alert_days >= 1 {
                    item.alert_days
                } else {
                    DEFAULT_ALERT_DAYS
                };
                self.push_create(&item, threshold, NotificationType::Both, !item.alert_enabled)
                    .await?
            }
        };

        self.store.commit_alert(alert.clone());
        info!(
            "Alert {} for {} ({})",
            if alert.enabled { "enabled" } else { "disabled" },
            item.name,
            item.id
        );
        Ok(alert)
    }

    /// Evaluate every tracked item against its alert
    pub fn due_alerts(&self, now: DateTime<Utc>) -> Vec<AlertDecision> {
        self.store
            .items()
            .iter()
            .map(|item| evaluate_alert(item, self.store.alert_for(&item.id).as_ref(), now))
            .filter(|decision| decision.due)
            .collect()
    }

    async fn push_create(
        &self,
        item: &TrackedItem,
        days_before_expiry: u32,
        notification_type: NotificationType,
        enabled: bool,
    ) -> ClientResult<AlertConfig> {
        let request = NewAlert {
            medicine_id: item.id.clone(),
            days_before_expiry,
            notification_type,
            enabled,
        };

        let ack = self
            .store
            .backend()
            .create_alert(&request)
            .await
            .map_err(|e| {
                warn!("Backend rejected alert creation for {}: {}", item.id, e);
                e
            })?;

        Ok(AlertConfig {
            id: ack.id,
            medicine_id: item.id.clone(),
            medicine_name: item.name.clone(),
            days_before_expiry,
            notification_type,
            enabled,
            created_at: ack.created_at.unwrap_or_else(Utc::now),
        })
    }

    async fn push_update(
        &self,
        existing: &AlertConfig,
        days_before_expiry: u32,
        notification_type: NotificationType,
        enabled: bool,
    ) -> ClientResult<AlertConfig> {
        let update = AlertUpdate {
            days_before_expiry,
            notification_type,
            enabled,
        };

        self.store
            .backend()
            .update_alert(&existing.id, &update)
            .await
            .map_err(|e| {
                warn!("Backend rejected alert update {}: {}", existing.id, e);
                e
            })?;

        Ok(AlertConfig {
            days_before_expiry,
            notification_type,
            enabled,
            ..existing.clone()
        })
    }
}

fn validate_threshold(days_before_expiry: u32) -> ClientResult<()> {
    if days_before_expiry < 1 {
        return Err(ClientError::Validation(
            "Alert threshold must be at least 1 day".to_string(),
        ));
    }
    Ok(())
}

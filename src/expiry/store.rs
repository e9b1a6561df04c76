/// Client-side expiry store
///
/// Holds the last fetched items and alert configs. Counts are always derived
/// from the snapshot; nothing is kept as a separately maintained counter.
use super::{AlertConfig, ExpiryBackend, ExpiryQuery, ExpiryStatus, TrackedItem};
use crate::{
    error::{ClientError, ClientResult},
    metrics,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

#[derive(Debug, Default, Clone)]
struct ExpirySnapshot {
    items: Vec<TrackedItem>,
    /// Keyed by item id
    alerts: HashMap<String, AlertConfig>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Expiry store shared by the dashboard, the poller and the alert engine
pub struct ExpiryStore {
    backend: Arc<dyn ExpiryBackend>,
    snapshot: RwLock<ExpirySnapshot>,
    last_error: RwLock<Option<String>>,
    /// Held while a fetch or a mutation is talking to the backend
    in_flight: Mutex<()>,
}

impl ExpiryStore {
    pub fn new(backend: Arc<dyn ExpiryBackend>) -> Self {
        Self {
            backend,
            snapshot: RwLock::new(ExpirySnapshot::default()),
            last_error: RwLock::new(None),
            in_flight: Mutex::new(()),
        }
    }

    pub(crate) fn backend(&self) -> &Arc<dyn ExpiryBackend> {
        &self.backend
    }

    /// Fetch items and alerts, replacing the snapshot.
    ///
    /// Waits for any in-flight fetch or mutation to finish first.
    pub async fn refresh(&self) -> ClientResult<Vec<TrackedItem>> {
        let _guard = self.in_flight.lock().await;
        self.refresh_locked().await
    }

    /// Like [`refresh`](Self::refresh) but returns `None` instead of queueing
    /// when another fetch or mutation is in flight.
    pub async fn try_refresh(&self) -> Option<ClientResult<Vec<TrackedItem>>> {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Expiry refresh skipped: previous request still in flight");
                return None;
            }
        };
        Some(self.refresh_locked().await)
    }

    async fn refresh_locked(&self) -> ClientResult<Vec<TrackedItem>> {
        let fetched = futures::future::try_join(
            self.backend.fetch_items(),
            self.backend.fetch_alerts(),
        )
        .await;

        let (items, alerts) = match fetched {
            Ok(pair) => pair,
            Err(e) => {
                error!("Failed to refresh expiry data: {}", e);
                *self.last_error.write() = Some(e.user_message());
                return Err(e);
            }
        };

        {
            let mut snapshot = self.snapshot.write();
            // The list endpoint carries no creation time, so a known alert
            // keeps the one it was first seen with
            let alerts: HashMap<String, AlertConfig> = alerts
                .into_iter()
                .map(|mut alert| {
                    if let Some(previous) = snapshot
                        .alerts
                        .get(&alert.medicine_id)
                        .filter(|previous| previous.id == alert.id)
                    {
                        alert.created_at = previous.created_at;
                    }
                    (alert.medicine_id.clone(), alert)
                })
                .collect();

            snapshot.items = items.clone();
            snapshot.alerts = alerts;
            snapshot.refreshed_at = Some(Utc::now());
        }
        *self.last_error.write() = None;
        self.publish_counts();

        debug!("Expiry snapshot refreshed with {} items", items.len());
        Ok(items)
    }

    fn publish_counts(&self) {
        let now = Utc::now();
        metrics::set_expiry_counts(
            self.expired_count_at(now),
            self.expiring_soon_count_at(now),
            self.alerts_enabled_count(),
        );
    }

    /// Exclusive access for a mutation; polls skip while it is held
    pub(crate) async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.in_flight.lock().await
    }

    pub fn items(&self) -> Vec<TrackedItem> {
        self.snapshot.read().items.clone()
    }

    pub fn item(&self, item_id: &str) -> Option<TrackedItem> {
        self.snapshot
            .read()
            .items
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
    }

    pub(crate) fn require_item(&self, item_id: &str) -> ClientResult<TrackedItem> {
        self.item(item_id)
            .ok_or_else(|| ClientError::NotFound(format!("Tracked item {}", item_id)))
    }

    pub fn alerts(&self) -> Vec<AlertConfig> {
        let snapshot = self.snapshot.read();
        let mut alerts: Vec<AlertConfig> = snapshot.alerts.values().cloned().collect();
        alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        alerts
    }

    pub fn alert_for(&self, item_id: &str) -> Option<AlertConfig> {
        self.snapshot.read().alerts.get(item_id).cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().refreshed_at
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<String> {
        let snapshot = self.snapshot.read();
        let mut categories: Vec<String> = Vec::new();
        for item in &snapshot.items {
            if !categories.contains(&item.category) {
                categories.push(item.category.clone());
            }
        }
        categories
    }

    fn count_status(&self, status: ExpiryStatus, now: DateTime<Utc>) -> usize {
        self.snapshot
            .read()
            .items
            .iter()
            .filter(|item| item.status_at(now) == status)
            .count()
    }

    pub fn expired_count(&self) -> usize {
        self.expired_count_at(Utc::now())
    }

    pub fn expired_count_at(&self, now: DateTime<Utc>) -> usize {
        self.count_status(ExpiryStatus::Expired, now)
    }

    pub fn expiring_soon_count(&self) -> usize {
        self.expiring_soon_count_at(Utc::now())
    }

    pub fn expiring_soon_count_at(&self, now: DateTime<Utc>) -> usize {
        self.count_status(ExpiryStatus::ExpiringSoon, now)
    }

    pub fn alerts_enabled_count(&self) -> usize {
        self.snapshot
            .read()
            .items
            .iter()
            .filter(|item| item.alert_enabled)
            .count()
    }

    /// Filtered and sorted rows for the expiry table
    pub fn view(&self, query: &ExpiryQuery, now: DateTime<Utc>) -> Vec<TrackedItem> {
        let snapshot = self.snapshot.read();
        query.apply(&snapshot.items, now)
    }

    /// Commit an acknowledged alert and mirror it onto its item
    pub(crate) fn commit_alert(&self, alert: AlertConfig) {
        {
            let mut snapshot = self.snapshot.write();
            if let Some(item) = snapshot
                .items
                .iter_mut()
                .find(|item| item.id == alert.medicine_id)
            {
                item.alert_enabled = alert.enabled;
                item.alert_days = alert.days_before_expiry;
            }
            snapshot.alerts.insert(alert.medicine_id.clone(), alert);
        }
        self.publish_counts();
    }

    /// Apply an acknowledged change to one item under a single write lock
    pub(crate) fn commit_item<F>(&self, item_id: &str, change: F) -> ClientResult<TrackedItem>
    where
        F: FnOnce(&mut TrackedItem),
    {
        let committed = {
            let mut snapshot = self.snapshot.write();
            let item = snapshot
                .items
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| ClientError::NotFound(format!("Tracked item {}", item_id)))?;
            change(item);
            item.clone()
        };
        self.publish_counts();
        Ok(committed)
    }
}

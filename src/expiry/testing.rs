/// In-memory backend used by the expiry unit tests
use super::{
    AlertAck, AlertConfig, AlertUpdate, ExpiryBackend, ExpiryUpdate, NewAlert, TrackedItem,
};
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap()
}

pub(crate) fn days_from_today(days: i64) -> NaiveDate {
    fixed_now().date_naive() + chrono::Duration::days(days)
}

pub(crate) fn sample_item(id: &str, name: &str, expiry: NaiveDate) -> TrackedItem {
    TrackedItem {
        id: id.to_string(),
        name: name.to_string(),
        category: "General".to_string(),
        batch_number: format!("BATCH-{}", id),
        expiry_date: expiry,
        extended_date: None,
        quantity: 10,
        supplier: "MediSupply".to_string(),
        location: "Store Room".to_string(),
        alert_days: 30,
        alert_enabled: false,
        notes: None,
        expiry_status: None,
        price: None,
        reorder_level: None,
        updated_at: None,
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub items: Mutex<Vec<TrackedItem>>,
    pub alerts: Mutex<Vec<AlertConfig>>,
    pub fail_fetch: AtomicBool,
    pub fail_mutations: AtomicBool,
    pub fetch_delay: Mutex<Option<Duration>>,
    pub fetch_calls: AtomicUsize,
    /// Highest number of fetches observed running at the same time
    pub max_concurrent_fetches: AtomicUsize,
    active_fetches: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub expiry_updates: Mutex<Vec<(String, ExpiryUpdate)>>,
    next_id: AtomicUsize,
}

impl FakeBackend {
    pub fn with_items(items: Vec<TrackedItem>) -> Self {
        let backend = Self::default();
        *backend.items.lock() = items;
        backend
    }

    fn check_mutation(&self) -> ClientResult<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ExpiryBackend for FakeBackend {
    async fn fetch_items(&self) -> ClientResult<Vec<TrackedItem>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_fetches.fetch_max(active, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active_fetches.fetch_sub(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: StatusCode::BAD_GATEWAY,
                detail: "upstream timeout".to_string(),
            });
        }
        Ok(self.items.lock().clone())
    }

    async fn fetch_alerts(&self) -> ClientResult<Vec<AlertConfig>> {
        Ok(self.alerts.lock().clone())
    }

    async fn create_alert(&self, alert: &NewAlert) -> ClientResult<AlertAck> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_mutation()?;
        let id = format!("ALERT{:03}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.alerts.lock().push(AlertConfig {
            id: id.clone(),
            medicine_id: alert.medicine_id.clone(),
            medicine_name: String::new(),
            days_before_expiry: alert.days_before_expiry,
            notification_type: alert.notification_type,
            enabled: alert.enabled,
            created_at: fixed_now(),
        });
        Ok(AlertAck {
            id,
            created_at: Some(fixed_now()),
        })
    }

    async fn update_alert(&self, alert_id: &str, update: &AlertUpdate) -> ClientResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_mutation()?;
        if let Some(alert) = self.alerts.lock().iter_mut().find(|a| a.id == alert_id) {
            alert.days_before_expiry = update.days_before_expiry;
            alert.notification_type = update.notification_type;
            alert.enabled = update.enabled;
        }
        Ok(())
    }

    async fn update_item_expiry(&self, item_id: &str, update: &ExpiryUpdate) -> ClientResult<()> {
        self.check_mutation()?;
        self.expiry_updates
            .lock()
            .push((item_id.to_string(), update.clone()));
        if let Some(item) = self.items.lock().iter_mut().find(|i| i.id == item_id) {
            match update {
                ExpiryUpdate::BaseDate { expiry_date } => item.expiry_date = *expiry_date,
                ExpiryUpdate::Extend {
                    extended_date,
                    notes,
                } => {
                    item.extended_date = Some(*extended_date);
                    item.notes = Some(notes.clone());
                }
                ExpiryUpdate::ClearExtension { .. } => {
                    item.extended_date = None;
                    item.notes = None;
                }
            }
        }
        Ok(())
    }
}

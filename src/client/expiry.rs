/// REST-backed implementation of the expiry backend
use super::{endpoints, ApiRequest};
use crate::{
    error::ClientResult,
    expiry::{AlertAck, AlertConfig, AlertUpdate, ExpiryBackend, ExpiryUpdate, NewAlert, TrackedItem},
    session::SessionManager,
};
use async_trait::async_trait;
use serde::{de::IgnoredAny, Deserialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<TrackedItem>,
}

#[derive(Debug, Deserialize)]
struct AlertsResponse {
    #[serde(default)]
    alerts: Vec<AlertConfig>,
}

/// Expiry backend that goes through the authenticated session
pub struct HttpExpiryBackend {
    session: Arc<SessionManager>,
}

impl HttpExpiryBackend {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ExpiryBackend for HttpExpiryBackend {
    async fn fetch_items(&self) -> ClientResult<Vec<TrackedItem>> {
        let request = ApiRequest::get("expiry.items", endpoints::EXPIRY_ITEMS);
        let response: ItemsResponse = self.session.execute(request).await?;
        Ok(response.items)
    }

    async fn fetch_alerts(&self) -> ClientResult<Vec<AlertConfig>> {
        let request = ApiRequest::get("expiry.alerts", endpoints::EXPIRY_ALERTS);
        let response: AlertsResponse = self.session.execute(request).await?;
        Ok(response.alerts)
    }

    async fn create_alert(&self, alert: &NewAlert) -> ClientResult<AlertAck> {
        let request = ApiRequest::post("expiry.alerts.create", endpoints::EXPIRY_ALERTS, alert)?;
        self.session.execute(request).await
    }

    async fn update_alert(&self, alert_id: &str, update: &AlertUpdate) -> ClientResult<()> {
        let request = ApiRequest::put(
            "expiry.alerts.update",
            endpoints::expiry_alert(alert_id),
            update,
        )?;
        let _: IgnoredAny = self.session.execute(request).await?;
        Ok(())
    }

    async fn update_item_expiry(&self, item_id: &str, update: &ExpiryUpdate) -> ClientResult<()> {
        let request = ApiRequest::put("items.expiry", endpoints::item_expiry(item_id), update)?;
        let _: IgnoredAny = self.session.execute(request).await?;
        Ok(())
    }
}

/// Expiry date edits and shelf-life extensions
use super::{AlertRuleEngine, ExpiryUpdate, TrackedItem};
use crate::error::{ClientError, ClientResult};
use chrono::NaiveDate;
use tracing::info;

impl AlertRuleEngine {
    /// Record a shelf-life extension.
    ///
    /// A justification note is mandatory; blank notes are rejected before any
    /// backend call.
    pub async fn record_extension(
        &self,
        item_id: &str,
        extended_date: NaiveDate,
        notes: &str,
    ) -> ClientResult<TrackedItem> {
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(ClientError::Validation(
                "A quality-check note is required to extend shelf life".to_string(),
            ));
        }

        let _guard = self.store().exclusive().await;
        self.store().require_item(item_id)?;

        let update = ExpiryUpdate::Extend {
            extended_date,
            notes: notes.to_string(),
        };
        self.store()
            .backend()
            .update_item_expiry(item_id, &update)
            .await?;

        let item = self.store().commit_item(item_id, |item| {
            item.extended_date = Some(extended_date);
            item.notes = Some(notes.to_string());
        })?;
        info!(
            "Shelf life for {} ({}) extended to {}",
            item.name, item.id, extended_date
        );
        Ok(item)
    }

    /// Remove an extension; the date and its note are cleared together
    pub async fn remove_extension(&self, item_id: &str) -> ClientResult<TrackedItem> {
        let _guard = self.store().exclusive().await;
        self.store().require_item(item_id)?;

        self.store()
            .backend()
            .update_item_expiry(item_id, &ExpiryUpdate::clear_extension())
            .await?;

        let item = self.store().commit_item(item_id, |item| {
            item.extended_date = None;
            item.notes = None;
        })?;
        info!("Extended expiry removed for {} ({})", item.name, item.id);
        Ok(item)
    }

    /// Change the base expiry date
    pub async fn update_expiry_date(
        &self,
        item_id: &str,
        expiry_date: NaiveDate,
    ) -> ClientResult<TrackedItem> {
        let _guard = self.store().exclusive().await;
        self.store().require_item(item_id)?;

        self.store()
            .backend()
            .update_item_expiry(item_id, &ExpiryUpdate::BaseDate { expiry_date })
            .await?;

        let item = self.store().commit_item(item_id, |item| {
            item.expiry_date = expiry_date;
        })?;
        info!(
            "Expiry date for {} ({}) updated to {}",
            item.name, item.id, expiry_date
        );
        Ok(item)
    }
}

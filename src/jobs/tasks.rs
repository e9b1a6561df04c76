/// Background task implementations
use crate::expiry::{AlertRuleEngine, ExpiryStatus};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Log every alert that is due at `now`. Returns how many were due.
pub fn report_due_alerts(engine: &AlertRuleEngine, now: DateTime<Utc>) -> usize {
    let due = engine.due_alerts(now);

    for decision in &due {
        let Some(item) = engine.store().item(&decision.item_id) else {
            continue;
        };
        let channel = decision
            .channel
            .map(|channel| channel.as_str())
            .unwrap_or("none");

        match item.status_at(now) {
            ExpiryStatus::Expired => warn!(
                "Expiry alert [{}]: {} (batch {}) expired, {}",
                channel,
                item.name,
                item.batch_number,
                item.summary_at(now).days_text
            ),
            _ => info!(
                "Expiry alert [{}]: {} (batch {}) has {} (threshold {} days)",
                channel,
                item.name,
                item.batch_number,
                item.summary_at(now).days_text,
                decision.threshold_days
            ),
        }
    }

    if !due.is_empty() {
        info!("{} expiry alerts due", due.len());
    }
    due.len()
}

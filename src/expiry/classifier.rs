/// Expiry status classification
///
/// Pure functions of (effective expiry, now). Nothing here is cached; callers
/// pass a fresh `now` on every read.
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive lookahead for the expiring-soon window
pub const EXPIRING_SOON_WINDOW_DAYS: i64 = 30;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Derived expiry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryStatus {
    Expired,
    ExpiringSoon,
    Ok,
}

impl ExpiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryStatus::Expired => "expired",
            ExpiryStatus::ExpiringSoon => "expiring-soon",
            ExpiryStatus::Ok => "ok",
        }
    }

    /// Badge text shown next to an item
    pub fn label(&self) -> &'static str {
        match self {
            ExpiryStatus::Expired => "Expired",
            ExpiryStatus::ExpiringSoon => "Expiring Soon",
            ExpiryStatus::Ok => "Good",
        }
    }
}

impl std::fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A calendar date compared against "now" means midnight UTC of that day
pub fn date_to_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Classify an effective expiry instant
pub fn classify(effective: DateTime<Utc>, now: DateTime<Utc>) -> ExpiryStatus {
    if effective < now {
        return ExpiryStatus::Expired;
    }

    if effective <= now + Duration::days(EXPIRING_SOON_WINDOW_DAYS) {
        return ExpiryStatus::ExpiringSoon;
    }

    ExpiryStatus::Ok
}

/// Classify an effective expiry date
pub fn classify_date(effective: NaiveDate, now: DateTime<Utc>) -> ExpiryStatus {
    classify(date_to_instant(effective), now)
}

/// Whole days until expiry, rounded up in magnitude.
///
/// Remaining time rounds up (4.2 days -> 5). Overdue time rounds away from
/// zero as well (0.3 days overdue -> -1), so every expired instant yields a
/// negative count.
pub fn days_until_expiry(effective: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (effective - now).num_milliseconds();
    if millis >= 0 {
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    } else {
        -((-millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY)
    }
}

/// User-facing day count; overdue counts are shown as positive numbers
pub fn days_text(days: i64) -> String {
    if days < 0 {
        format!("{} days overdue", days.unsigned_abs())
    } else {
        format!("{} days remaining", days)
    }
}

/// "Mar 05, 2025"
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

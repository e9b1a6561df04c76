/// Filtering and sorting over a fetched item set
///
/// View-layer only: nothing here touches the backend or mutates items.
use super::{ExpiryStatus, TrackedItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Dashboard tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryTab {
    #[default]
    All,
    Expired,
    ExpiringSoon,
    WithAlerts,
}

/// Sortable column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    /// Sorts by the effective expiry date
    #[default]
    ExpiryDate,
    Category,
    BatchNumber,
    Quantity,
    Supplier,
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Filter and sort selection of the expiry table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpiryQuery {
    /// Case-insensitive substring over name, batch number and supplier
    pub search: String,
    /// `None` means all categories
    pub category: Option<String>,
    /// `None` means all statuses
    pub status: Option<ExpiryStatus>,
    pub tab: ExpiryTab,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl ExpiryQuery {
    /// Clicking the current column flips direction; a new column starts ascending
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_field = field;
            self.sort_direction = SortDirection::Asc;
        }
    }

    pub fn matches(&self, item: &TrackedItem, now: DateTime<Utc>) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = needle.is_empty()
            || item.name.to_lowercase().contains(&needle)
            || item.batch_number.to_lowercase().contains(&needle)
            || item.supplier.to_lowercase().contains(&needle);
        if !matches_search {
            return false;
        }

        if let Some(category) = &self.category {
            if &item.category != category {
                return false;
            }
        }

        let status = item.status_at(now);
        if let Some(wanted) = self.status {
            if status != wanted {
                return false;
            }
        }

        match self.tab {
            ExpiryTab::All => true,
            ExpiryTab::Expired => status == ExpiryStatus::Expired,
            ExpiryTab::ExpiringSoon => status == ExpiryStatus::ExpiringSoon,
            ExpiryTab::WithAlerts => item.alert_enabled,
        }
    }

    /// Filter then stable-sort a copy of `items`
    pub fn apply(&self, items: &[TrackedItem], now: DateTime<Utc>) -> Vec<TrackedItem> {
        let mut selected: Vec<TrackedItem> = items
            .iter()
            .filter(|item| self.matches(item, now))
            .cloned()
            .collect();

        selected.sort_by(|a, b| {
            let ordering = compare_by(self.sort_field, a, b);
            match self.sort_direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        selected
    }
}

fn compare_by(field: SortField, a: &TrackedItem, b: &TrackedItem) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::ExpiryDate => a.effective_expiry_date().cmp(&b.effective_expiry_date()),
        SortField::Category => a.category.cmp(&b.category),
        SortField::BatchNumber => a.batch_number.cmp(&b.batch_number),
        SortField::Quantity => a.quantity.cmp(&b.quantity),
        SortField::Supplier => a.supplier.cmp(&b.supplier),
        SortField::Location => a.location.cmp(&b.location),
    }
}

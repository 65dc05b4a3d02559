use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted daily usage counter.
///
/// `last_reset_date` is the logical trial day (see `ledger::logical_day`)
/// that was in effect when the record was last written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub daily_seconds_used: u64,
    pub last_reset_date: NaiveDate,
}

impl UsageRecord {
    pub fn fresh(day: NaiveDate) -> Self {
        Self {
            daily_seconds_used: 0,
            last_reset_date: day,
        }
    }
}

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;

use crate::{clock::Clock, models::UsageRecord, store::JsonStore};

const USAGE_KEY: &str = "usage";

/// Trial day a local wall-clock time belongs to. Times before
/// `cutoff_hour` count toward the previous calendar date.
pub fn logical_day(local: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    (local - Duration::hours(i64::from(cutoff_hour))).date()
}

fn day_start(day: NaiveDate, cutoff_hour: u32) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(cutoff_hour, 0, 0).unwrap_or(NaiveTime::MIN))
}

struct LedgerInner {
    record: UsageRecord,
    anchor: Option<DateTime<Local>>,
}

/// Daily seconds-of-viewing counter, persisted after every mutation.
///
/// `start`/`tick`/`stop` share one mutex around the read-modify-persist
/// sequence, so a ticker racing a `stop` cannot double count.
pub struct UsageLedger {
    store: JsonStore,
    clock: Arc<dyn Clock>,
    cutoff_hour: u32,
    inner: Mutex<LedgerInner>,
}

impl UsageLedger {
    /// Loads the stored record. A record from an earlier trial day is
    /// zeroed in memory; the reset reaches disk with the next write.
    pub fn load(store: JsonStore, clock: Arc<dyn Clock>, cutoff_hour: u32) -> Self {
        let today = logical_day(clock.now().naive_local(), cutoff_hour);
        let stored = match store.read::<UsageRecord>(USAGE_KEY) {
            Ok(record) => record,
            Err(err) => {
                warn!("Usage ledger unreadable, starting empty: {err:#}");
                None
            }
        };

        let record = match stored {
            Some(record) if record.last_reset_date == today => record,
            _ => UsageRecord::fresh(today),
        };

        Self {
            store,
            clock,
            cutoff_hour,
            inner: Mutex::new(LedgerInner {
                record,
                anchor: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current record, rolled over if the trial day changed while idle.
    pub fn snapshot(&self) -> UsageRecord {
        let mut inner = self.lock();
        let today = logical_day(self.clock.now().naive_local(), self.cutoff_hour);
        if inner.record.last_reset_date != today {
            inner.record = UsageRecord::fresh(today);
        }
        inner.record.clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().anchor.is_some()
    }

    /// Anchors metering at the current time. Already running is a no-op.
    pub fn start(&self) {
        let mut inner = self.lock();
        if inner.anchor.is_none() {
            inner.anchor = Some(self.clock.now());
        }
    }

    /// Accounts the whole seconds elapsed since the anchor and persists.
    /// Returns the seconds added; zero when not running.
    pub fn tick(&self) -> u64 {
        let mut inner = self.lock();
        self.tick_locked(&mut inner)
    }

    /// Final tick, then clears the anchor. Repeated calls are no-ops.
    pub fn stop(&self) -> u64 {
        let mut inner = self.lock();
        let added = self.tick_locked(&mut inner);
        inner.anchor = None;
        added
    }

    fn tick_locked(&self, inner: &mut LedgerInner) -> u64 {
        let Some(anchor) = inner.anchor else {
            return 0;
        };
        let now = self.clock.now();
        let mut span = now - anchor;
        if span < Duration::zero() {
            // Wall clock moved backwards; re-anchor without counting.
            inner.anchor = Some(now);
            return 0;
        }

        let local_now = now.naive_local();
        let today = logical_day(local_now, self.cutoff_hour);
        if inner.record.last_reset_date != today {
            inner.record = UsageRecord::fresh(today);
        }
        // A `snapshot` may already have rolled the record over, so the
        // boundary is checked against the anchor, not the record date.
        let boundary = day_start(today, self.cutoff_hour);
        if anchor.naive_local() < boundary {
            span = span.min((local_now - boundary).max(Duration::zero()));
        }

        let whole = span.num_seconds().max(0);
        let remainder = span - Duration::seconds(whole);
        inner.record.daily_seconds_used = inner
            .record
            .daily_seconds_used
            .saturating_add(whole as u64);
        inner.anchor = Some(now - remainder);

        if let Err(err) = self.store.write(USAGE_KEY, &inner.record) {
            warn!("Failed to persist usage ledger: {err:#}");
        }

        whole as u64
    }
}

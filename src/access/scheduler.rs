use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{info, warn};

use crate::access::format::format_remaining;
use crate::access::record::{GrantRecord, SubjectKey, HUMAN_TIME_FORMAT};
use crate::access::store::AccessStore;
use crate::catalog::ContentCatalog;
use crate::clock::{Clock, SystemClock};

/// Whether a subject may receive a new content unit right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Eligible,
    Waiting,
}

/// Outcome of an eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: WindowState,
    /// Next instant at which a fresh window opens
    pub next_reset: DateTime<Local>,
}

impl Decision {
    pub fn granted(&self) -> bool {
        self.state == WindowState::Eligible
    }
}

/// Read-only aggregate of a subject's access status
#[derive(Debug, Clone)]
pub struct AccessDescription {
    pub granted: bool,
    pub last_day: Option<u32>,
    pub last_access_human: Option<String>,
    pub next_reset: DateTime<Local>,
    pub remaining_seconds: i64,
    pub remaining_text: String,
}

/// Boundary-based access-window scheduler
///
/// One window runs from each occurrence of the configured reset hour to
/// the next, and a subject gets at most one grant per window. All reset
/// instants are computed lazily from the stored last-grant record when
/// a caller asks - no background timers.
pub struct AccessScheduler<C: Clock = SystemClock> {
    store: AccessStore,
    reset_time: NaiveTime,
    min_day: u32,
    max_day: u32,
    clock: C,
}

impl AccessScheduler<SystemClock> {
    pub fn new(store: AccessStore, reset_hour: u32, catalog: &dyn ContentCatalog) -> Result<Self> {
        Self::with_clock(store, reset_hour, catalog, SystemClock)
    }
}

impl<C: Clock> AccessScheduler<C> {
    pub fn with_clock(
        store: AccessStore,
        reset_hour: u32,
        catalog: &dyn ContentCatalog,
        clock: C,
    ) -> Result<Self> {
        let reset_time = NaiveTime::from_hms_opt(reset_hour, 0, 0)
            .with_context(|| format!("Reset hour must be in 0..=23, got {reset_hour}"))?;
        let (min_day, max_day) = catalog.day_bounds();

        Ok(Self {
            store,
            reset_time,
            min_day,
            max_day,
            clock,
        })
    }

    /// Decide whether `key` may be granted a new unit now
    pub fn evaluate(&self, key: &SubjectKey) -> Decision {
        self.evaluate_at(key, self.clock.now())
    }

    /// Decide whether `key` may be granted a new unit at `now`
    ///
    /// Data-layer faults degrade to the bootstrap decision; this never
    /// fails.
    pub fn evaluate_at(&self, key: &SubjectKey, now: DateTime<Local>) -> Decision {
        let record = self.store.load().get(&key.storage_key()).cloned();
        self.decide(record.as_ref(), now)
    }

    fn decide(&self, record: Option<&GrantRecord>, now: DateTime<Local>) -> Decision {
        // Never granted (or unrepresentable timestamp): bootstrap case.
        let Some(last_access) = record.and_then(|r| r.last_access_instant()) else {
            return Decision {
                state: WindowState::Eligible,
                next_reset: self.next_reset_after(now),
            };
        };

        let boundary_today = self.boundary_on(now.date_naive());

        if last_access < boundary_today {
            // Last grant belongs to an earlier window. The comparison is
            // inclusive on the boundary instant itself.
            if now >= boundary_today {
                Decision {
                    state: WindowState::Eligible,
                    next_reset: self.next_reset_after(now),
                }
            } else {
                Decision {
                    state: WindowState::Waiting,
                    next_reset: boundary_today,
                }
            }
        } else {
            // Today's window is already consumed.
            Decision {
                state: WindowState::Waiting,
                next_reset: self.boundary_on(now.date_naive() + Duration::days(1)),
            }
        }
    }

    /// Record a successful grant now
    pub fn record_grant(&self, key: &SubjectKey, day_number: u32) -> Result<()> {
        self.record_grant_at(key, day_number, self.clock.now())
    }

    /// Record a successful grant at `now`
    ///
    /// Does not check eligibility: callers are expected to `evaluate`
    /// first, and administrative grants may bypass the window entirely.
    /// A day number outside the catalog bounds is clamped, never
    /// rejected.
    pub fn record_grant_at(
        &self,
        key: &SubjectKey,
        day_number: u32,
        now: DateTime<Local>,
    ) -> Result<()> {
        let day = day_number.clamp(self.min_day, self.max_day);
        if day != day_number {
            warn!(
                "Day {day_number} outside catalog bounds [{}, {}] for {key}; clamped to {day}",
                self.min_day, self.max_day
            );
        }

        let next_reset = self.next_reset_after(now);
        let storage_key = key.storage_key();

        self.store.update(|map| {
            let record = map.entry(storage_key).or_default();
            record.last_access = now.timestamp();
            record.last_day = day;
            record.next_reset_at = next_reset.timestamp();
            record.last_access_human = Some(now.format(HUMAN_TIME_FORMAT).to_string());
            record.next_reset_human = Some(next_reset.format(HUMAN_TIME_FORMAT).to_string());
        })?;

        info!("Recorded grant of day {day} for {key}; next window opens at {next_reset}");
        Ok(())
    }

    /// Remaining wait until the next window, with presentation text
    pub fn remaining_time(&self, key: &SubjectKey) -> (i64, String) {
        self.remaining_time_at(key, self.clock.now())
    }

    pub fn remaining_time_at(&self, key: &SubjectKey, now: DateTime<Local>) -> (i64, String) {
        let decision = self.evaluate_at(key, now);
        if decision.granted() {
            return (0, "now".to_string());
        }

        let remaining = (decision.next_reset - now).num_seconds().max(0);
        (remaining, format_remaining(remaining))
    }

    /// Forget a subject entirely, restoring the bootstrap state
    ///
    /// Unknown subjects are a no-op. Used when a subject restarts the
    /// content sequence from its first unit.
    pub fn reset(&self, key: &SubjectKey) -> Result<()> {
        self.store.delete(key)?;
        Ok(())
    }

    /// Full access status for a subject, for display
    pub fn describe(&self, key: &SubjectKey) -> AccessDescription {
        self.describe_at(key, self.clock.now())
    }

    pub fn describe_at(&self, key: &SubjectKey, now: DateTime<Local>) -> AccessDescription {
        let record = self.store.load().get(&key.storage_key()).cloned();
        let decision = self.decide(record.as_ref(), now);

        let (remaining_seconds, remaining_text) = if decision.granted() {
            (0, "now".to_string())
        } else {
            let remaining = (decision.next_reset - now).num_seconds().max(0);
            (remaining, format_remaining(remaining))
        };

        AccessDescription {
            granted: decision.granted(),
            last_day: record.as_ref().filter(|r| r.has_grant()).map(|r| r.last_day),
            last_access_human: record.as_ref().and_then(|r| r.last_access_human.clone()),
            next_reset: decision.next_reset,
            remaining_seconds,
            remaining_text,
        }
    }

    /// The given date's reset boundary, minutes and seconds zeroed
    fn boundary_on(&self, date: NaiveDate) -> DateTime<Local> {
        localize(date.and_time(self.reset_time))
    }

    /// Next occurrence of the reset hour strictly after `now`
    fn next_reset_after(&self, now: DateTime<Local>) -> DateTime<Local> {
        let today = self.boundary_on(now.date_naive());
        if now >= today {
            self.boundary_on(now.date_naive() + Duration::days(1))
        } else {
            today
        }
    }
}

/// Map a wall-clock time to an instant
///
/// DST transitions can make a wall-clock time ambiguous or nonexistent;
/// ambiguity resolves to the earlier instant, a gap to the first valid
/// time after it.
fn localize(naive: NaiveDateTime) -> DateTime<Local> {
    match naive.and_local_timezone(Local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let mut probe = naive + Duration::minutes(30);
            loop {
                match probe.and_local_timezone(Local) {
                    LocalResult::Single(dt) => break dt,
                    LocalResult::Ambiguous(earliest, _) => break earliest,
                    LocalResult::None => probe += Duration::minutes(30),
                }
            }
        }
    }
}

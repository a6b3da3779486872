use std::sync::Arc;
use time::{macros::time, Date, OffsetDateTime, UtcOffset};

/// Source of "now" for billing arithmetic.
///
/// Services take the clock from `AppState` instead of reading the wall clock,
/// so proration can be tested against any calendar date.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    /// Current UTC calendar date
    fn today(&self) -> Date {
        self.now().to_offset(UtcOffset::UTC).date()
    }
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: OffsetDateTime,
}

impl FixedClock {
    pub fn new(instant: OffsetDateTime) -> Self {
        Self { instant }
    }

    /// Noon UTC on `date`
    pub fn on(date: Date) -> Self {
        Self::new(date.with_time(time!(12:00)).assume_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.instant
    }
}

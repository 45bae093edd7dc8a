use std::sync::Mutex;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Source of the naive local "now" every scheduling decision is made against.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

/// Wall clock in the machine's local offset.
///
/// The offset is resolved once in `detect`, which must run before any other
/// threads exist; `time` refuses to read the local offset afterwards on most
/// Unix platforms.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn detect() -> Self {
        Self {
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }

    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let local = OffsetDateTime::now_utc().to_offset(self.offset);
        truncate_to_second(PrimitiveDateTime::new(local.date(), local.time()))
    }
}

/// Settable clock for tests and dry runs.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<PrimitiveDateTime>,
}

impl ManualClock {
    pub fn new(now: PrimitiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: PrimitiveDateTime) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> PrimitiveDateTime {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

fn truncate_to_second(value: PrimitiveDateTime) -> PrimitiveDateTime {
    value - Duration::nanoseconds(i64::from(value.nanosecond()))
}

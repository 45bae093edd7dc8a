use time::{Duration, PrimitiveDateTime};

pub const MIN_BREAK_INTERVAL_MINUTES: u32 = 10;
pub const SNOOZE_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Water,
    Move,
}

/// Snapshot of the break cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakState {
    pub next_break_at: PrimitiveDateTime,
    pub next_kind: BreakKind,
    pub interval_minutes: u32,
}

/// Alternating water/move cycle. Only the scheduler owns one, behind its lock.
#[derive(Debug, Clone)]
pub(crate) struct BreakCycle {
    interval_minutes: u32,
    next_break_at: PrimitiveDateTime,
    next_is_move: bool,
}

impl BreakCycle {
    pub fn new(now: PrimitiveDateTime, interval_minutes: u32) -> Self {
        let mut cycle = Self {
            interval_minutes: MIN_BREAK_INTERVAL_MINUTES,
            next_break_at: now,
            next_is_move: false,
        };
        cycle.reset(now, interval_minutes);
        cycle
    }

    pub fn reset(&mut self, now: PrimitiveDateTime, interval_minutes: u32) {
        self.interval_minutes = interval_minutes.max(MIN_BREAK_INTERVAL_MINUTES);
        self.next_break_at = now + self.interval();
        self.next_is_move = false;
    }

    pub fn schedule_at(&mut self, when: PrimitiveDateTime) {
        self.next_break_at = when;
        self.next_is_move = false;
    }

    /// Returns the kind to fire when the cycle is due, then flips it and
    /// pushes the next fire one interval past `now`.
    pub fn fire_if_due(&mut self, now: PrimitiveDateTime) -> Option<BreakKind> {
        if now < self.next_break_at {
            return None;
        }

        let kind = if self.next_is_move {
            BreakKind::Move
        } else {
            BreakKind::Water
        };
        self.next_is_move = !self.next_is_move;
        self.next_break_at = now + self.interval();
        Some(kind)
    }

    pub fn snooze(&mut self, now: PrimitiveDateTime) {
        self.next_break_at = now + Duration::minutes(SNOOZE_MINUTES);
        self.next_is_move = false;
    }

    pub fn state(&self) -> BreakState {
        BreakState {
            next_break_at: self.next_break_at,
            next_kind: if self.next_is_move {
                BreakKind::Move
            } else {
                BreakKind::Water
            },
            interval_minutes: self.interval_minutes,
        }
    }

    fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }
}

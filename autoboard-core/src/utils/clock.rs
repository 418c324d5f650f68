//! Wall-clock source for time-deferred behaviour.
//!
//! Timestamps are UTC `PrimitiveDateTime`s, matching the `TIMESTAMP`
//! columns they are stored in.

use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> time::PrimitiveDateTime;
}

/// Current UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> time::PrimitiveDateTime {
        let now = time::OffsetDateTime::now_utc();
        time::PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<time::PrimitiveDateTime>,
}

impl ManualClock {
    pub fn new(start: time::PrimitiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: time::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }

    pub fn set(&self, to: time::PrimitiveDateTime) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> time::PrimitiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

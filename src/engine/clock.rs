use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::error::Error;

/// Source of wall-clock time for transaction records.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hands out strictly increasing timestamps on top of a [`Clock`].
///
/// If the clock stalls or steps backwards, the next stamp is one microsecond
/// after the previous one. This keeps ledger ordering total.
#[derive(Debug, Default)]
pub(crate) struct Stamper {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl Stamper {
    /// Continue after `last`, typically the newest stamp already in the ledger
    pub(crate) fn resume_after(last: Option<DateTime<Utc>>) -> Self {
        Self {
            last: Mutex::new(last),
        }
    }

    pub(crate) fn next(&self, clock: &dyn Clock) -> Result<DateTime<Utc>, Error> {
        let mut last = self.last.lock().map_err(|_| Error::LockPoisoned)?;
        let now = clock.now();
        let stamp = match *last {
            Some(previous) if now <= previous => previous + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(stamp);
        Ok(stamp)
    }
}

//! Time source shared by the session manager and the entity services.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Settable clock. Clones share the same instant, so a test can keep one
/// handle and advance the time seen by the `Crm` it handed the other to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    at: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self { Self { at: Arc::new(Mutex::new(start)) } }

    pub fn set(&self, at: DateTime<Utc>) { *self.at.lock() = at; }

    pub fn advance(&self, by: Duration) {
        let mut g = self.at.lock();
        *g += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self { Self::new(Utc::now()) }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> { *self.at.lock() }
}

pub fn system() -> Arc<dyn Clock> { Arc::new(SystemClock) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let c = ManualClock::default();
        let other = c.clone();
        let t0 = c.now();
        other.advance(Duration::minutes(16));
        assert_eq!(c.now() - t0, Duration::minutes(16));
    }
}

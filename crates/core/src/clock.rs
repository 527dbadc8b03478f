//! Timestamp policy.
//!
//! All audit timestamps are UTC with microsecond precision. Anything finer is
//! dropped at the source so a timestamp survives every storage backend
//! unchanged (Postgres `timestamptz` stores microseconds).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Source of "now" for lifecycle transitions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<C> Clock for Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Drop sub-microsecond precision.
pub fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

/// Wall clock that never goes backwards and never repeats.
///
/// If the wall clock has not moved past the previous reading (coarse clock,
/// NTP step back), the previous reading plus one microsecond is returned.
/// The ordering guarantee holds per instance; share one instance (e.g. via
/// `Arc`) across everything that must observe a single order.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_micros: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut prev = self.last_micros.load(Ordering::Acquire);
        loop {
            let next = if wall > prev { wall } else { prev + 1 };
            match self
                .last_micros
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    return DateTime::<Utc>::from_timestamp_micros(next)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC);
                }
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Hand-driven clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(truncate_to_micros(start)),
        }
    }

    /// Starts at the current wall time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn set(&self, at: DateTime<Utc>) {
        if let Ok(mut current) = self.current.lock() {
            *current = truncate_to_micros(at);
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current = truncate_to_micros(*current + by);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

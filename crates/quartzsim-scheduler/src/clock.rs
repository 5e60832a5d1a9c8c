//! Time sources for the engine.
//!
//! The engine never reads the wall clock directly; it asks its [`Clock`].
//! Tests drive a [`ManualClock`], the actor runs on a [`MonotonicClock`] so
//! that engine time and tokio timer time always agree.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time anchored once, then advanced by `tokio::time::Instant`.
///
/// Immune to wall-clock jumps, and follows virtual time when the tokio
/// runtime is paused.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin_wall: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    pub fn anchored_at(origin_wall: DateTime<Utc>) -> Self {
        Self {
            origin_wall,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_wall + elapsed
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(at.timestamp_millis())),
        }
    }

    /// A clock at the Unix epoch, convenient for "t = 0" scenarios.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::default())
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
            .single()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::at_epoch();
        let other = clock.clone();
        clock.advance_ms(1_500);
        assert_eq!(other.now().timestamp_millis(), 1_500);
    }

    #[tokio::test(start_paused = true)]
    async fn monotonic_clock_follows_paused_time() {
        let origin = Utc.timestamp_millis_opt(10_000).single().unwrap();
        let clock = MonotonicClock::anchored_at(origin);
        tokio::time::advance(std::time::Duration::from_millis(250)).await;
        assert_eq!(clock.now().timestamp_millis(), 10_250);
    }
}

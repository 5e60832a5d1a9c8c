use std::fmt;

use chrono::{DateTime, Utc};
use quartzsim_core::ActivityStatus;
use serde::{Deserialize, Serialize};

use crate::schedule::{first_fire_at, offset, TriggerSpec};

/// Stable arena handle of a trigger. Never reused within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerId(pub u64);

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A schedulable recurrence rule plus its runtime firing state.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub id: TriggerId,
    pub name: String,
    /// Owning group and job names.
    pub group: String,
    pub job: String,
    pub spec: TriggerSpec,
    /// Inherited from the owning job when the trigger is created.
    pub execution_duration_ms: u64,
    pub status: ActivityStatus,
    /// Effective start, resolved on initialization.
    pub start_at: Option<DateTime<Utc>>,
    pub next_fire_at: Option<DateTime<Utc>>,
    pub previous_fire_at: Option<DateTime<Utc>>,
    pub executed_count: u64,
}

impl Trigger {
    pub fn new(
        id: TriggerId,
        name: impl Into<String>,
        group: impl Into<String>,
        job: impl Into<String>,
        spec: TriggerSpec,
        execution_duration_ms: u64,
    ) -> Self {
        let status = if spec.paused {
            ActivityStatus::Paused
        } else {
            ActivityStatus::Active
        };
        Self {
            id,
            name: name.into(),
            group: group.into(),
            job: job.into(),
            start_at: spec.start_at,
            spec,
            execution_duration_ms,
            status,
            next_fire_at: None,
            previous_fire_at: None,
            executed_count: 0,
        }
    }

    /// No further firings: repeat count exhausted or end date passed.
    pub fn is_done(&self, now: DateTime<Utc>) -> bool {
        if self
            .spec
            .repeat_count
            .is_some_and(|n| self.executed_count >= u64::from(n))
        {
            return true;
        }
        self.spec.end_at.is_some_and(|end| end < now)
    }

    pub fn is_initialized(&self) -> bool {
        self.next_fire_at.is_some()
    }

    /// Resolve the start date and first fire time.
    pub fn initialize(&mut self, now: DateTime<Utc>) {
        let (start, next) = first_fire_at(&self.spec, now);
        self.start_at = Some(start);
        self.next_fire_at = Some(next);
    }

    /// Active, not done, and its next fire time has arrived.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ActivityStatus::Active
            && !self.is_done(now)
            && self.next_fire_at.is_some_and(|at| at <= now)
    }

    /// Advance the fire timestamps for a firing that starts at `now`.
    pub fn record_fire(&mut self, now: DateTime<Utc>) {
        self.previous_fire_at = Some(now);
        self.next_fire_at = Some(offset(now, self.spec.repeat_interval_ms));
    }

    /// Operator status change. `Complete` is terminal, so the change is
    /// refused (and `false` returned) once the trigger has completed.
    pub fn set_status(&mut self, status: ActivityStatus) -> bool {
        if self.status == ActivityStatus::Complete {
            return false;
        }
        self.status = status;
        true
    }

    /// When an execution starting at `now` completes. Never sooner than
    /// 1 ms, so a fire and its completion always land in different ticks.
    pub fn completes_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        offset(now, self.execution_duration_ms.max(1))
    }

    /// Count one finished execution.
    pub fn record_completion(&mut self) {
        self.executed_count = self.executed_count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    fn trigger(spec: TriggerSpec) -> Trigger {
        Trigger::new(TriggerId(1), "t", "g", "j", spec, 100)
    }

    #[test]
    fn paused_spec_creates_paused_trigger() {
        let t = trigger(TriggerSpec {
            paused: true,
            ..TriggerSpec::every(1_000)
        });
        assert_eq!(t.status, ActivityStatus::Paused);
        assert!(!t.is_initialized());
    }

    #[test]
    fn repeat_count_bounds_completion() {
        let mut t = trigger(TriggerSpec {
            repeat_count: Some(2),
            ..TriggerSpec::every(1_000)
        });
        assert!(!t.is_done(at(0)));
        t.executed_count = 1;
        assert!(!t.is_done(at(0)));
        t.executed_count = 2;
        assert!(t.is_done(at(0)));
    }

    #[test]
    fn end_date_bounds_completion() {
        let t = trigger(TriggerSpec {
            end_at: Some(at(5_000)),
            ..TriggerSpec::every(1_000)
        });
        assert!(!t.is_done(at(5_000)));
        assert!(t.is_done(at(5_001)));
    }

    #[test]
    fn is_done_is_monotone_in_time_and_count() {
        let mut t = trigger(TriggerSpec {
            repeat_count: Some(3),
            end_at: Some(at(10_000)),
            ..TriggerSpec::every(1_000)
        });
        let mut was_done = false;
        for step in 0..40 {
            let now = at(step * 500);
            if step % 7 == 0 {
                t.executed_count += 1;
            }
            let done = t.is_done(now);
            assert!(!was_done || done, "is_done regressed at step {step}");
            was_done = done;
        }
        assert!(was_done);
    }

    #[test]
    fn firing_advances_timestamps() {
        let mut t = trigger(TriggerSpec::every(1_000));
        t.initialize(at(0));
        assert!(t.is_due(at(0)));
        t.record_fire(at(0));
        assert_eq!(t.previous_fire_at, Some(at(0)));
        assert_eq!(t.next_fire_at, Some(at(1_000)));
        assert!(!t.is_due(at(999)));
        assert!(t.is_due(at(1_000)));
    }

    #[test]
    fn paused_trigger_is_never_due() {
        let mut t = trigger(TriggerSpec::every(1_000));
        t.initialize(at(0));
        t.set_status(ActivityStatus::Paused);
        assert!(!t.is_due(at(5_000)));
        assert_eq!(t.next_fire_at, Some(at(0)), "pausing keeps the fire time");
    }

    #[test]
    fn completion_count_saturates() {
        let mut t = trigger(TriggerSpec::every(1_000));
        t.executed_count = u64::MAX - 1;
        t.record_completion();
        t.record_completion();
        assert_eq!(t.executed_count, u64::MAX);
    }

    #[test]
    fn firing_near_the_end_of_time_does_not_overflow() {
        let mut t = trigger(TriggerSpec::every(1_000));
        let end = DateTime::<Utc>::MAX_UTC;
        t.record_fire(end);
        assert_eq!(t.next_fire_at, Some(end));
        assert_eq!(t.completes_at(end), end);
    }

    #[test]
    fn zero_duration_still_takes_a_millisecond() {
        let t = Trigger::new(TriggerId(1), "t", "g", "j", TriggerSpec::every(10), 0);
        assert_eq!(t.completes_at(at(5_000)), at(5_001));
    }

    #[test]
    fn complete_is_terminal() {
        let mut t = trigger(TriggerSpec::every(1_000));
        t.status = ActivityStatus::Complete;
        assert!(!t.set_status(ActivityStatus::Active));
        assert_eq!(t.status, ActivityStatus::Complete);
    }
}

use chrono::{DateTime, Duration, Utc};
use quartzsim_core::config::{JobConfig, ScheduleConfig, TriggerConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Upper bound for every millisecond quantity in a schedule (~100 years).
pub const MAX_SPAN_MS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// Latest start or end date a trigger may carry: chrono's maximum minus
/// enough headroom for one delay plus one interval.
pub fn latest_schedulable() -> DateTime<Utc> {
    DateTime::<Utc>::MAX_UTC - millis(MAX_SPAN_MS) - millis(MAX_SPAN_MS)
}

/// Immutable schedule parameters of a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Gap between the start of one firing and the next, in milliseconds.
    pub repeat_interval_ms: u64,
    /// Total number of executions; unlimited when `None`.
    pub repeat_count: Option<u32>,
    pub initial_delay_ms: u64,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub persist_after_completion: bool,
    /// Create the trigger paused.
    pub paused: bool,
}

impl TriggerSpec {
    /// Unbounded repetition every `repeat_interval_ms`.
    pub fn every(repeat_interval_ms: u64) -> Self {
        Self {
            repeat_interval_ms,
            repeat_count: None,
            initial_delay_ms: 0,
            start_at: None,
            end_at: None,
            persist_after_completion: false,
            paused: false,
        }
    }

    /// One immediate execution.
    pub fn once() -> Self {
        Self {
            repeat_count: Some(1),
            ..Self::every(1)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.repeat_interval_ms == 0 {
            return Err(invalid("repeat interval must be at least 1 ms"));
        }
        if self.repeat_count == Some(0) {
            return Err(invalid("repeat count must be at least 1 when set"));
        }
        if self.repeat_interval_ms > MAX_SPAN_MS || self.initial_delay_ms > MAX_SPAN_MS {
            return Err(invalid("interval or delay exceeds the supported span"));
        }
        let latest = latest_schedulable();
        if self.start_at.is_some_and(|at| at > latest) || self.end_at.is_some_and(|at| at > latest) {
            return Err(invalid(format!("start and end dates must not be later than {latest}")));
        }
        if let (Some(start), Some(end)) = (self.start_at, self.end_at) {
            if end < start {
                return Err(invalid(format!("end {end} precedes start {start}")));
            }
        }
        Ok(())
    }
}

impl From<&TriggerConfig> for TriggerSpec {
    fn from(c: &TriggerConfig) -> Self {
        Self {
            repeat_interval_ms: c.repeat_interval_ms,
            repeat_count: c.repeat_count,
            initial_delay_ms: c.initial_delay_ms,
            start_at: c.start_at,
            end_at: c.end_at,
            persist_after_completion: c.persist_after_execution,
            paused: c.paused,
        }
    }
}

/// Convert a validated millisecond quantity to a chrono duration.
pub fn millis(ms: u64) -> Duration {
    Duration::milliseconds(ms.min(MAX_SPAN_MS) as i64)
}

/// `at + ms`, saturating at chrono's maximum instead of panicking.
pub fn offset(at: DateTime<Utc>, ms: u64) -> DateTime<Utc> {
    at.checked_add_signed(millis(ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Resolve the effective start and the first fire time of a trigger that is
/// being initialized at `now`. An unset start means "now".
pub fn first_fire_at(spec: &TriggerSpec, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = spec.start_at.unwrap_or(now);
    (start, offset(start, spec.initial_delay_ms))
}

pub fn validate_job(group: &str, name: &str, job: &JobConfig) -> Result<()> {
    if group.is_empty() || name.is_empty() {
        return Err(invalid("group and job names must not be empty"));
    }
    if job.duration_ms > MAX_SPAN_MS {
        return Err(invalid(format!("job {group}.{name}: duration exceeds the supported span")));
    }
    for (trigger, config) in &job.triggers {
        if trigger.is_empty() {
            return Err(invalid(format!("job {group}.{name}: empty trigger name")));
        }
        TriggerSpec::from(config)
            .validate()
            .map_err(|e| invalid(format!("trigger {group}.{name}.{trigger}: {e}")))?;
    }
    Ok(())
}

/// Check a whole static schedule before any of it is installed.
pub fn validate_schedule(schedule: &ScheduleConfig) -> Result<()> {
    for (group, jobs) in schedule {
        for (name, job) in jobs {
            validate_job(group, name, job)?;
        }
    }
    Ok(())
}

fn invalid(reason: impl Into<String>) -> SchedulerError {
    SchedulerError::InvalidSchedule(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    #[test]
    fn unset_start_defaults_to_now_plus_delay() {
        let spec = TriggerSpec {
            initial_delay_ms: 500,
            ..TriggerSpec::every(1_000)
        };
        let (start, next) = first_fire_at(&spec, at(2_000));
        assert_eq!(start, at(2_000));
        assert_eq!(next, at(2_500));
    }

    #[test]
    fn explicit_start_wins_over_now() {
        let spec = TriggerSpec {
            start_at: Some(at(10_000)),
            ..TriggerSpec::every(1_000)
        };
        let (start, next) = first_fire_at(&spec, at(2_000));
        assert_eq!(start, at(10_000));
        assert_eq!(next, at(10_000));
    }

    #[test]
    fn once_is_a_single_immediate_execution() {
        let spec = TriggerSpec::once();
        assert_eq!(spec.repeat_count, Some(1));
        assert_eq!(spec.repeat_interval_ms, 1);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = TriggerSpec::every(0).validate().unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidSchedule(_)));
    }

    #[test]
    fn zero_repeat_count_is_rejected() {
        let spec = TriggerSpec {
            repeat_count: Some(0),
            ..TriggerSpec::every(10)
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let spec = TriggerSpec {
            start_at: Some(at(5_000)),
            end_at: Some(at(1_000)),
            ..TriggerSpec::every(10)
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn dates_beyond_the_supported_range_are_rejected() {
        let spec = TriggerSpec {
            start_at: Some(DateTime::<Utc>::MAX_UTC),
            initial_delay_ms: 1,
            ..TriggerSpec::every(1_000)
        };
        assert!(matches!(spec.validate(), Err(SchedulerError::InvalidSchedule(_))));

        let spec = TriggerSpec {
            end_at: Some(DateTime::<Utc>::MAX_UTC),
            ..TriggerSpec::every(1_000)
        };
        assert!(spec.validate().is_err());

        let spec = TriggerSpec {
            start_at: Some(latest_schedulable()),
            initial_delay_ms: MAX_SPAN_MS,
            ..TriggerSpec::every(MAX_SPAN_MS)
        };
        assert!(spec.validate().is_ok());
        let (_, next) = first_fire_at(&spec, at(0));
        assert!(next < DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn offset_saturates_at_the_end_of_time() {
        assert_eq!(offset(at(1_000), 500), at(1_500));
        assert_eq!(
            offset(DateTime::<Utc>::MAX_UTC, 1),
            DateTime::<Utc>::MAX_UTC
        );
    }

    #[test]
    fn schedule_validation_names_the_offending_trigger() {
        let mut bad = TriggerConfig::every(1_000);
        bad.repeat_interval_ms = 0;
        let schedule = ScheduleConfig::from([(
            "G".to_string(),
            BTreeMap::from([(
                "J".to_string(),
                JobConfig {
                    duration_ms: 10,
                    triggers: BTreeMap::from([("T".to_string(), bad)]),
                },
            )]),
        )]);
        let err = validate_schedule(&schedule).unwrap_err();
        assert!(err.to_string().contains("G.J.T"), "{err}");
    }
}

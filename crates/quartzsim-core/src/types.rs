use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an activity: a trigger, or a composite (job, group, scheduler).
///
/// `Mixed` only ever appears as an aggregate; a trigger is always one of the
/// other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Active,
    Paused,
    Complete,
    Mixed,
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityStatus::Active => write!(f, "active"),
            ActivityStatus::Paused => write!(f, "paused"),
            ActivityStatus::Complete => write!(f, "complete"),
            ActivityStatus::Mixed => write!(f, "mixed"),
        }
    }
}

impl std::str::FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(ActivityStatus::Active),
            "paused" => Ok(ActivityStatus::Paused),
            "complete" => Ok(ActivityStatus::Complete),
            "mixed" => Ok(ActivityStatus::Mixed),
            other => Err(format!("unknown activity status: {other}")),
        }
    }
}

/// Combine the statuses of a composite's immediate children.
///
/// Any `Mixed` child makes the parent `Mixed`; a uniform set of children
/// yields that status; anything else is `Mixed`. No children means `Complete`.
pub fn aggregate_status<I>(children: I) -> ActivityStatus
where
    I: IntoIterator<Item = ActivityStatus>,
{
    let mut seen: Option<ActivityStatus> = None;
    for status in children {
        if status == ActivityStatus::Mixed {
            return ActivityStatus::Mixed;
        }
        match seen {
            None => seen = Some(status),
            Some(prev) if prev != status => return ActivityStatus::Mixed,
            Some(_) => {}
        }
    }
    seen.unwrap_or(ActivityStatus::Complete)
}

/// Lifecycle of the scheduler engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerStatus {
    /// Created or in standby: nothing fires.
    #[default]
    Ready,
    Started,
    /// Started, but no in-flight execution and no upcoming fire.
    Empty,
    /// Terminal.
    Shutdown,
}

impl SchedulerStatus {
    /// Whether the firing pass may start executions in this state.
    pub fn is_running(&self) -> bool {
        matches!(self, SchedulerStatus::Started | SchedulerStatus::Empty)
    }
}

impl fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerStatus::Ready => write!(f, "ready"),
            SchedulerStatus::Started => write!(f, "started"),
            SchedulerStatus::Empty => write!(f, "empty"),
            SchedulerStatus::Shutdown => write!(f, "shutdown"),
        }
    }
}

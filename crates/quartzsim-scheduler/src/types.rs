use chrono::{DateTime, Utc};
use quartzsim_core::{ActivityStatus, SchedulerStatus};
use serde::Serialize;

/// Operator command that targets existing activities. Commands whose target
/// is missing are silent no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Start,
    Standby,
    Shutdown,
    PauseScheduler,
    ResumeScheduler,
    PauseGroup(String),
    ResumeGroup(String),
    DeleteGroup(String),
    PauseJob { group: String, job: String },
    ResumeJob { group: String, job: String },
    DeleteJob { group: String, job: String },
    PauseTrigger(String),
    ResumeTrigger(String),
    DeleteTrigger(String),
}

/// Point-in-time view of the whole engine.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    pub name: String,
    pub status: SchedulerStatus,
    /// Aggregate of all groups.
    pub activity_status: ActivityStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub jobs_executed: u64,
    pub jobs_count: usize,
    pub groups: Vec<GroupSnapshot>,
    pub in_progress: Vec<InFlightSnapshot>,
}

impl SchedulerSnapshot {
    pub fn group(&self, name: &str) -> Option<&GroupSnapshot> {
        self.groups.iter().find(|g| g.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSnapshot {
    pub name: String,
    pub status: ActivityStatus,
    pub jobs: Vec<JobSnapshot>,
}

impl GroupSnapshot {
    pub fn job(&self, name: &str) -> Option<&JobSnapshot> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub name: String,
    pub status: ActivityStatus,
    pub duration_ms: u64,
    pub triggers: Vec<TriggerSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerSnapshot {
    pub name: String,
    pub status: ActivityStatus,
    pub repeat_interval_ms: u64,
    pub repeat_count: Option<u32>,
    pub executed_count: u64,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    /// Only reported while the trigger is active.
    pub next_fire_at: Option<DateTime<Utc>>,
    pub previous_fire_at: Option<DateTime<Utc>>,
    pub persist_after_completion: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InFlightSnapshot {
    pub trigger: String,
    pub fire_instance_id: u64,
    pub started_at: DateTime<Utc>,
    pub completes_at: DateTime<Utc>,
}

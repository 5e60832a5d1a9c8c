use std::sync::Arc;

use chrono::{DateTime, Utc};
use quartzsim_core::config::{ScheduleConfig, SimConfig};
use quartzsim_core::{aggregate_status, ActivityStatus, SchedulerStatus};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    activity::{Group, Job, TriggerArena},
    clock::Clock,
    error::{Result, SchedulerError},
    fault::{FaultPolicy, NoFaults, RandomFaults},
    journal::{EventDraft, EventJournal, EventScope, EventType, SchedulerEvent},
    schedule::{validate_schedule, TriggerSpec},
    trigger::{Trigger, TriggerId},
    types::{
        GroupSnapshot, InFlightSnapshot, JobSnapshot, Operation, SchedulerSnapshot,
        TriggerSnapshot,
    },
};

/// Group used by fire-now when the caller names none.
pub const DEFAULT_GROUP_NAME: &str = "Default";
/// Execution duration of jobs created on the fly by fire-now.
pub const ADHOC_JOB_DURATION_MS: u64 = 10_000;

/// The single pending wake-up of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeUp {
    /// Nothing scheduled; the next command will re-evaluate.
    Idle,
    /// Run [`SchedulerEngine::state_check`] at this instant.
    At(DateTime<Utc>),
    /// Shut down with no work left; the engine never ticks again.
    Disposed,
}

/// One execution between its firing and its completion.
#[derive(Debug, Clone)]
struct InFlight {
    trigger: TriggerId,
    trigger_name: String,
    fire_instance_id: u64,
    started_at: DateTime<Utc>,
    completes_at: DateTime<Utc>,
}

/// Discrete-event scheduler simulator.
///
/// All state is owned here and mutated through `&mut self`; wrap it in a
/// [`crate::actor::SchedulerActor`] to share it between tasks.
pub struct SchedulerEngine {
    name: String,
    status: SchedulerStatus,
    started_at: Option<DateTime<Utc>>,
    groups: Vec<Group>,
    triggers: TriggerArena,
    in_flight: Vec<InFlight>,
    journal: EventJournal,
    next_trigger_id: u64,
    next_fire_instance_id: u64,
    jobs_executed: u64,
    wake_up: WakeUp,
    clock: Arc<dyn Clock>,
    faults: Box<dyn FaultPolicy>,
}

impl SchedulerEngine {
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            status: SchedulerStatus::Ready,
            started_at: None,
            groups: Vec::new(),
            triggers: TriggerArena::new(),
            in_flight: Vec::new(),
            journal: EventJournal::new(),
            next_trigger_id: 1,
            next_fire_instance_id: 1,
            jobs_executed: 0,
            wake_up: WakeUp::Idle,
            clock,
            faults: Box::new(NoFaults),
        }
    }

    /// Build an engine with the configured name, fault policy and static
    /// schedule. Nothing fires until [`start`](Self::start).
    pub fn from_config(config: &SimConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let mut engine = Self::new(config.scheduler.name.clone(), clock);
        if config.scheduler.fault_probability > 0.0 {
            engine = engine.with_fault_policy(RandomFaults::new(config.scheduler.fault_probability));
        }
        engine.add_schedule(&config.schedule)?;
        Ok(engine)
    }

    pub fn with_fault_policy(mut self, policy: impl FaultPolicy + 'static) -> Self {
        self.faults = Box::new(policy);
        self
    }

    /// Install a static schedule. The whole tree is validated first, so an
    /// invalid schedule installs nothing.
    pub fn add_schedule(&mut self, schedule: &ScheduleConfig) -> Result<()> {
        if self.status == SchedulerStatus::Shutdown {
            return Err(SchedulerError::ShutDown);
        }
        validate_schedule(schedule)?;
        for (group_name, jobs) in schedule {
            for (job_name, job) in jobs {
                for trigger_name in job.triggers.keys() {
                    if self.job_has_trigger(group_name, job_name, trigger_name) {
                        return Err(SchedulerError::TriggerExists {
                            group: group_name.clone(),
                            job: job_name.clone(),
                            trigger: trigger_name.clone(),
                        });
                    }
                }
            }
        }
        for (group_name, jobs) in schedule {
            for (job_name, job) in jobs {
                self.ensure_job(group_name, job_name, job.duration_ms);
                for (trigger_name, trigger) in &job.triggers {
                    self.insert_trigger(group_name, job_name, trigger_name, trigger.into());
                }
            }
        }
        if self.status.is_running() {
            let now = self.clock.now();
            for trigger in self.triggers.values_mut().filter(|t| !t.is_initialized()) {
                trigger.initialize(now);
            }
            self.state_check();
        }
        info!(
            scheduler = %self.name,
            groups = self.groups.len(),
            triggers = self.triggers.len(),
            "schedule installed"
        );
        Ok(())
    }

    // --- queries -----------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn wake_up(&self) -> WakeUp {
        self.wake_up
    }

    pub fn jobs_executed(&self) -> u64 {
        self.jobs_executed
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    /// Journal entries with an id greater than `cursor`.
    pub fn events_since(&self, cursor: u64) -> Vec<SchedulerEvent> {
        self.journal.since(cursor)
    }

    /// First trigger (in creation order) with this name.
    pub fn trigger(&self, name: &str) -> Option<&Trigger> {
        self.triggers.values().find(|t| t.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Aggregate status of every group.
    pub fn activity_status(&self) -> ActivityStatus {
        aggregate_status(self.groups.iter().map(|g| g.status(&self.triggers)))
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let groups = self
            .groups
            .iter()
            .map(|g| GroupSnapshot {
                name: g.name.clone(),
                status: g.status(&self.triggers),
                jobs: g.jobs.iter().map(|j| self.job_snapshot(j)).collect(),
            })
            .collect();
        SchedulerSnapshot {
            name: self.name.clone(),
            status: self.status,
            activity_status: self.activity_status(),
            started_at: self.started_at,
            jobs_executed: self.jobs_executed,
            jobs_count: self.groups.iter().map(|g| g.jobs.len()).sum(),
            groups,
            in_progress: self
                .in_flight
                .iter()
                .map(|f| InFlightSnapshot {
                    trigger: f.trigger_name.clone(),
                    fire_instance_id: f.fire_instance_id,
                    started_at: f.started_at,
                    completes_at: f.completes_at,
                })
                .collect(),
        }
    }

    fn job_snapshot(&self, job: &Job) -> JobSnapshot {
        JobSnapshot {
            name: job.name.clone(),
            status: job.status(&self.triggers),
            duration_ms: job.duration_ms,
            triggers: job
                .triggers
                .iter()
                .filter_map(|id| self.triggers.get(id))
                .map(|t| TriggerSnapshot {
                    name: t.name.clone(),
                    status: t.status,
                    repeat_interval_ms: t.spec.repeat_interval_ms,
                    repeat_count: t.spec.repeat_count,
                    executed_count: t.executed_count,
                    start_at: t.start_at,
                    end_at: t.spec.end_at,
                    next_fire_at: t
                        .next_fire_at
                        .filter(|_| t.status == ActivityStatus::Active),
                    previous_fire_at: t.previous_fire_at,
                    persist_after_completion: t.spec.persist_after_completion,
                })
                .collect(),
        }
    }

    // --- tick --------------------------------------------------------------

    /// Recompute the engine state at the current instant.
    ///
    /// Completes finished executions, fires due triggers, retires done
    /// triggers and schedules the single next wake-up. Calling it again
    /// without time passing changes nothing.
    pub fn state_check(&mut self) {
        if self.wake_up == WakeUp::Disposed {
            return;
        }
        self.wake_up = WakeUp::Idle;
        let now = self.clock.now();

        self.complete_due(now);
        if self.status.is_running() {
            self.fire_due(now);
        }
        self.retire_done(now);

        match self.next_wake_up_at() {
            None => match self.status {
                SchedulerStatus::Shutdown => {
                    self.wake_up = WakeUp::Disposed;
                    info!(scheduler = %self.name, "scheduler timer disposed");
                }
                SchedulerStatus::Started => {
                    self.status = SchedulerStatus::Empty;
                    debug!(scheduler = %self.name, "no pending work, scheduler idle");
                }
                // Ready stays Ready: going Empty here would silently undo a standby.
                SchedulerStatus::Ready | SchedulerStatus::Empty => {}
            },
            Some(at) => {
                if self.status == SchedulerStatus::Empty {
                    self.status = SchedulerStatus::Started;
                }
                self.wake_up = WakeUp::At(at);
                debug!(
                    scheduler = %self.name,
                    in_ms = (at - now).num_milliseconds(),
                    "next state check scheduled"
                );
            }
        }
    }

    fn complete_due(&mut self, now: DateTime<Utc>) {
        let (done, pending): (Vec<InFlight>, Vec<InFlight>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|f| f.completes_at <= now);
        self.in_flight = pending;

        for item in done {
            self.jobs_executed = self.jobs_executed.saturating_add(1);
            if let Some(trigger) = self.triggers.get_mut(&item.trigger) {
                trigger.record_completion();
            }
            info!(
                trigger = %item.trigger_name,
                fire_instance_id = item.fire_instance_id,
                "execution completed"
            );
            self.push_event(
                EventDraft::trigger(
                    EventType::Completed,
                    &item.trigger_name,
                    Some(item.fire_instance_id),
                ),
                now,
            );
        }
    }

    fn fire_due(&mut self, now: DateTime<Utc>) {
        let due: Vec<TriggerId> = self
            .triggers
            .values()
            .filter(|t| t.is_due(now) && !self.is_in_flight(t.id))
            .map(|t| t.id)
            .collect();

        for id in due {
            let Some(trigger) = self.triggers.get_mut(&id) else {
                continue;
            };
            let fire_instance_id = self.next_fire_instance_id;
            self.next_fire_instance_id += 1;

            trigger.record_fire(now);
            let trigger_name = trigger.name.clone();
            let completes_at = trigger.completes_at(now);
            self.in_flight.push(InFlight {
                trigger: id,
                trigger_name: trigger_name.clone(),
                fire_instance_id,
                started_at: now,
                completes_at,
            });
            info!(trigger = %trigger_name, fire_instance_id, "trigger fired");
            self.push_event(
                EventDraft::trigger(EventType::Fired, &trigger_name, Some(fire_instance_id)),
                now,
            );
        }
    }

    fn retire_done(&mut self, now: DateTime<Utc>) {
        let done: Vec<TriggerId> = self
            .triggers
            .values()
            .filter(|t| t.status != ActivityStatus::Complete && t.is_done(now))
            .map(|t| t.id)
            .collect();

        for id in done {
            let persistent = self
                .triggers
                .get(&id)
                .is_some_and(|t| t.spec.persist_after_completion);
            if persistent {
                if let Some(trigger) = self.triggers.get_mut(&id) {
                    trigger.status = ActivityStatus::Complete;
                    info!(trigger = %trigger.name, "trigger complete");
                }
            } else if let Some(trigger) = self.remove_trigger(id) {
                info!(trigger = %trigger.name, "finished trigger removed");
            }
        }
    }

    /// Earliest completion, and (while running) the earliest fire time of an
    /// active trigger that is not already executing.
    fn next_wake_up_at(&self) -> Option<DateTime<Utc>> {
        let completion = self.in_flight.iter().map(|f| f.completes_at).min();
        let firing = if self.status.is_running() {
            self.triggers
                .values()
                .filter(|t| t.status == ActivityStatus::Active && !self.is_in_flight(t.id))
                .filter_map(|t| t.next_fire_at)
                .min()
        } else {
            None
        };
        completion.into_iter().chain(firing).min()
    }

    fn is_in_flight(&self, id: TriggerId) -> bool {
        self.in_flight.iter().any(|f| f.trigger == id)
    }

    // --- commands ----------------------------------------------------------

    /// Dispatch an [`Operation`]. Returns whether it was applied.
    pub fn apply(&mut self, op: Operation) -> bool {
        match op {
            Operation::Start => self.start(),
            Operation::Standby => self.standby(),
            Operation::Shutdown => self.shutdown(),
            Operation::PauseScheduler => self.pause_scheduler(),
            Operation::ResumeScheduler => self.resume_scheduler(),
            Operation::PauseGroup(group) => self.pause_group(&group),
            Operation::ResumeGroup(group) => self.resume_group(&group),
            Operation::DeleteGroup(group) => self.delete_group(&group),
            Operation::PauseJob { group, job } => self.pause_job(&group, &job),
            Operation::ResumeJob { group, job } => self.resume_job(&group, &job),
            Operation::DeleteJob { group, job } => self.delete_job(&group, &job),
            Operation::PauseTrigger(trigger) => self.pause_trigger(&trigger),
            Operation::ResumeTrigger(trigger) => self.resume_trigger(&trigger),
            Operation::DeleteTrigger(trigger) => self.delete_trigger(&trigger),
        }
    }

    /// Start (or resume from standby). Idempotent while running.
    pub fn start(&mut self) -> bool {
        if self.rejects_commands("start") {
            return false;
        }
        let now = self.clock.now();
        self.started_at.get_or_insert(now);
        for trigger in self.triggers.values_mut() {
            if !trigger.is_initialized() {
                trigger.initialize(now);
            }
        }
        if !self.status.is_running() {
            self.status = SchedulerStatus::Started;
            info!(scheduler = %self.name, "scheduler started");
            self.push_event(EventDraft::scheduler(EventType::Resumed), now);
        }
        self.state_check();
        true
    }

    /// Stop firing without touching triggers; in-flight executions still
    /// complete.
    pub fn standby(&mut self) -> bool {
        if self.rejects_commands("standby") {
            return false;
        }
        self.status = SchedulerStatus::Ready;
        info!(scheduler = %self.name, "scheduler in standby");
        self.state_check();
        self.push_event(EventDraft::scheduler(EventType::Standby), self.clock.now());
        true
    }

    /// Terminal: drops every group and trigger. Executions already in flight
    /// are still completed, after which the timer is disposed.
    pub fn shutdown(&mut self) -> bool {
        if self.rejects_commands("shutdown") {
            return false;
        }
        self.status = SchedulerStatus::Shutdown;
        self.groups.clear();
        self.triggers.clear();
        info!(
            scheduler = %self.name,
            in_flight = self.in_flight.len(),
            "scheduler shutting down"
        );
        self.state_check();
        self.push_event(EventDraft::scheduler(EventType::Shutdown), self.clock.now());
        true
    }

    pub fn pause_scheduler(&mut self) -> bool {
        self.change_scheduler_status(ActivityStatus::Paused)
    }

    pub fn resume_scheduler(&mut self) -> bool {
        self.change_scheduler_status(ActivityStatus::Active)
    }

    pub fn pause_group(&mut self, group: &str) -> bool {
        self.change_group_status(group, ActivityStatus::Paused)
    }

    pub fn resume_group(&mut self, group: &str) -> bool {
        self.change_group_status(group, ActivityStatus::Active)
    }

    pub fn pause_job(&mut self, group: &str, job: &str) -> bool {
        self.change_job_status(group, job, ActivityStatus::Paused)
    }

    pub fn resume_job(&mut self, group: &str, job: &str) -> bool {
        self.change_job_status(group, job, ActivityStatus::Active)
    }

    pub fn pause_trigger(&mut self, trigger: &str) -> bool {
        self.change_trigger_status(trigger, ActivityStatus::Paused)
    }

    pub fn resume_trigger(&mut self, trigger: &str) -> bool {
        self.change_trigger_status(trigger, ActivityStatus::Active)
    }

    pub fn delete_trigger(&mut self, name: &str) -> bool {
        if self.rejects_commands("delete trigger") {
            return false;
        }
        let Some(id) = self.find_trigger(name) else {
            debug!(trigger = %name, "delete: trigger not found");
            return false;
        };
        self.remove_trigger(id);
        info!(trigger = %name, "trigger deleted");
        self.state_check();
        true
    }

    pub fn delete_job(&mut self, group: &str, job: &str) -> bool {
        if self.rejects_commands("delete job") {
            return false;
        }
        let Some(owner) = self.groups.iter_mut().find(|g| g.name == group) else {
            debug!(%group, %job, "delete: group not found");
            return false;
        };
        let Some(index) = owner.jobs.iter().position(|j| j.name == job) else {
            debug!(%group, %job, "delete: job not found");
            return false;
        };
        let removed = owner.jobs.remove(index);
        for id in &removed.triggers {
            self.triggers.remove(id);
        }
        info!(%group, %job, triggers = removed.triggers.len(), "job deleted");
        self.state_check();
        true
    }

    pub fn delete_group(&mut self, group: &str) -> bool {
        if self.rejects_commands("delete group") {
            return false;
        }
        let Some(index) = self.groups.iter().position(|g| g.name == group) else {
            debug!(%group, "delete: group not found");
            return false;
        };
        let removed = self.groups.remove(index);
        let ids: Vec<TriggerId> = removed.trigger_ids().collect();
        for id in &ids {
            self.triggers.remove(id);
        }
        info!(%group, jobs = removed.jobs.len(), triggers = ids.len(), "group deleted");
        self.state_check();
        true
    }

    /// Schedule an ad-hoc trigger, creating the group and job when missing.
    ///
    /// An unnamed group is [`DEFAULT_GROUP_NAME`]; unnamed jobs and triggers
    /// get a generated name. New jobs run for [`ADHOC_JOB_DURATION_MS`].
    pub fn fire_now(
        &mut self,
        group: Option<&str>,
        job: Option<&str>,
        trigger: Option<&str>,
        spec: TriggerSpec,
    ) -> Result<TriggerId> {
        if self.status == SchedulerStatus::Shutdown {
            warn!(scheduler = %self.name, "fire-now rejected: scheduler is shut down");
            return Err(SchedulerError::ShutDown);
        }
        spec.validate()?;
        let group_name = group.unwrap_or(DEFAULT_GROUP_NAME).to_string();
        let job_name = job
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let trigger_name = trigger
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if group_name.is_empty() || job_name.is_empty() || trigger_name.is_empty() {
            return Err(SchedulerError::InvalidSchedule(
                "group, job and trigger names must not be empty".to_string(),
            ));
        }
        if self.job_has_trigger(&group_name, &job_name, &trigger_name) {
            return Err(SchedulerError::TriggerExists {
                group: group_name,
                job: job_name,
                trigger: trigger_name,
            });
        }

        self.ensure_job(&group_name, &job_name, ADHOC_JOB_DURATION_MS);
        let id = self.insert_trigger(&group_name, &job_name, &trigger_name, spec);
        let now = self.clock.now();
        if let Some(t) = self.triggers.get_mut(&id) {
            t.initialize(now);
        }
        info!(
            group = %group_name,
            job = %job_name,
            trigger = %trigger_name,
            "ad-hoc trigger scheduled"
        );
        self.state_check();
        Ok(id)
    }

    /// Run a job once, right away.
    pub fn execute_now(&mut self, group: Option<&str>, job: Option<&str>) -> Result<TriggerId> {
        self.fire_now(group, job, None, TriggerSpec::once())
    }

    // --- command helpers ---------------------------------------------------

    fn rejects_commands(&self, command: &str) -> bool {
        if self.status == SchedulerStatus::Shutdown {
            warn!(scheduler = %self.name, %command, "command rejected: scheduler is shut down");
            return true;
        }
        false
    }

    fn change_trigger_status(&mut self, name: &str, status: ActivityStatus) -> bool {
        if self.rejects_commands("change trigger status") {
            return false;
        }
        let Some(trigger) = self.triggers.values_mut().find(|t| t.name == name) else {
            debug!(trigger = %name, "status change: trigger not found");
            return false;
        };
        if !trigger.set_status(status) {
            debug!(trigger = %name, "status change ignored: trigger is complete");
            return false;
        }
        info!(trigger = %name, %status, "trigger status changed");
        self.state_check();
        self.push_status_event(EventScope::Trigger, status, Some(name.to_string()));
        true
    }

    fn change_job_status(&mut self, group: &str, job: &str, status: ActivityStatus) -> bool {
        if self.rejects_commands("change job status") {
            return false;
        }
        let Some(ids) = self
            .group(group)
            .and_then(|g| g.job(job))
            .map(|j| j.triggers.clone())
        else {
            debug!(%group, %job, "status change: job not found");
            return false;
        };
        self.set_trigger_statuses(&ids, status);
        info!(%group, %job, %status, "job status changed");
        self.state_check();
        self.push_status_event(EventScope::Job, status, Some(format!("{group}.{job}")));
        true
    }

    fn change_group_status(&mut self, group: &str, status: ActivityStatus) -> bool {
        if self.rejects_commands("change group status") {
            return false;
        }
        let Some(ids) = self
            .group(group)
            .map(|g| g.trigger_ids().collect::<Vec<_>>())
        else {
            debug!(%group, "status change: group not found");
            return false;
        };
        self.set_trigger_statuses(&ids, status);
        info!(%group, %status, "group status changed");
        self.state_check();
        self.push_status_event(EventScope::Group, status, Some(group.to_string()));
        true
    }

    fn change_scheduler_status(&mut self, status: ActivityStatus) -> bool {
        if self.rejects_commands("change scheduler status") {
            return false;
        }
        let ids: Vec<TriggerId> = self.triggers.keys().copied().collect();
        self.set_trigger_statuses(&ids, status);
        info!(scheduler = %self.name, %status, "all triggers status changed");
        self.state_check();
        self.push_status_event(EventScope::Scheduler, status, None);
        true
    }

    /// Cascade a status to leaf triggers; completed triggers keep theirs.
    fn set_trigger_statuses(&mut self, ids: &[TriggerId], status: ActivityStatus) {
        for id in ids {
            if let Some(trigger) = self.triggers.get_mut(id) {
                trigger.set_status(status);
            }
        }
    }

    fn push_status_event(&mut self, scope: EventScope, status: ActivityStatus, key: Option<String>) {
        let event_type = EventType::for_status(status);
        self.push_event(EventDraft::new(scope, event_type, key), self.clock.now());
    }

    fn push_event(&mut self, draft: EventDraft, now: DateTime<Utc>) {
        let errors = self.faults.assess(&draft);
        if errors.is_some() {
            debug!(event = %draft.event_type, key = ?draft.item_key, "event reported as faulted");
        }
        self.journal.push(draft, now, errors);
    }

    // --- tree maintenance --------------------------------------------------

    fn find_trigger(&self, name: &str) -> Option<TriggerId> {
        self.trigger(name).map(|t| t.id)
    }

    fn job_has_trigger(&self, group: &str, job: &str, trigger: &str) -> bool {
        self.group(group)
            .and_then(|g| g.job(job))
            .is_some_and(|j| {
                j.triggers
                    .iter()
                    .filter_map(|id| self.triggers.get(id))
                    .any(|t| t.name == trigger)
            })
    }

    /// Find or create `group.job`. An existing job keeps its duration.
    fn ensure_job(&mut self, group: &str, job: &str, duration_ms: u64) {
        let index = match self.groups.iter().position(|g| g.name == group) {
            Some(i) => i,
            None => {
                debug!(%group, "group created");
                self.groups.push(Group::new(group));
                self.groups.len() - 1
            }
        };
        let owner = &mut self.groups[index];
        if owner.job(job).is_none() {
            debug!(%group, %job, duration_ms, "job created");
            owner.jobs.push(Job::new(job, duration_ms));
        }
    }

    /// Attach a new trigger to an existing `group.job`.
    fn insert_trigger(&mut self, group: &str, job: &str, name: &str, spec: TriggerSpec) -> TriggerId {
        let id = TriggerId(self.next_trigger_id);
        self.next_trigger_id += 1;
        let duration_ms = self
            .groups
            .iter_mut()
            .find(|g| g.name == group)
            .and_then(|g| g.job_mut(job))
            .map(|j| {
                j.triggers.push(id);
                j.duration_ms
            })
            .unwrap_or(ADHOC_JOB_DURATION_MS);
        self.triggers
            .insert(id, Trigger::new(id, name, group, job, spec, duration_ms));
        id
    }

    /// Hard delete from the arena and from the owning job.
    fn remove_trigger(&mut self, id: TriggerId) -> Option<Trigger> {
        let trigger = self.triggers.remove(&id)?;
        let detached = self
            .groups
            .iter_mut()
            .find(|g| g.name == trigger.group)
            .and_then(|g| g.job_mut(&trigger.job))
            .is_some_and(|j| j.detach(id));
        if !detached {
            // Owner lookup by name failed; fall back to a full scan.
            for job in self.groups.iter_mut().flat_map(|g| g.jobs.iter_mut()) {
                job.detach(id);
            }
        }
        Some(trigger)
    }
}

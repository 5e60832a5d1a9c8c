//! The composite part of the activity tree: groups own jobs, jobs own
//! trigger handles. Triggers themselves live in the engine's arena, so a
//! composite's status is always computed against that arena.

use std::collections::BTreeMap;

use quartzsim_core::{aggregate_status, ActivityStatus};

use crate::trigger::{Trigger, TriggerId};

pub type TriggerArena = BTreeMap<TriggerId, Trigger>;

#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    /// Execution duration handed to every trigger created for this job.
    pub duration_ms: u64,
    pub triggers: Vec<TriggerId>,
}

impl Job {
    pub fn new(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            triggers: Vec::new(),
        }
    }

    pub fn status(&self, arena: &TriggerArena) -> ActivityStatus {
        aggregate_status(
            self.triggers
                .iter()
                .filter_map(|id| arena.get(id))
                .map(|t| t.status),
        )
    }

    /// Drop a trigger handle. Returns whether it was present.
    pub fn detach(&mut self, id: TriggerId) -> bool {
        let before = self.triggers.len();
        self.triggers.retain(|t| *t != id);
        self.triggers.len() < before
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub jobs: Vec<Job>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            jobs: Vec::new(),
        }
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn job_mut(&mut self, name: &str) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.name == name)
    }

    pub fn status(&self, arena: &TriggerArena) -> ActivityStatus {
        aggregate_status(self.jobs.iter().map(|j| j.status(arena)))
    }

    /// Every trigger handle under this group.
    pub fn trigger_ids(&self) -> impl Iterator<Item = TriggerId> + '_ {
        self.jobs.iter().flat_map(|j| j.triggers.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::TriggerSpec;

    fn arena_with(statuses: &[ActivityStatus]) -> (TriggerArena, Vec<TriggerId>) {
        let mut arena = TriggerArena::new();
        let mut ids = Vec::new();
        for (i, status) in statuses.iter().enumerate() {
            let id = TriggerId(i as u64);
            let mut t = Trigger::new(id, format!("t{i}"), "g", "j", TriggerSpec::every(10), 0);
            t.status = *status;
            arena.insert(id, t);
            ids.push(id);
        }
        (arena, ids)
    }

    #[test]
    fn empty_job_and_group_are_complete() {
        let arena = TriggerArena::new();
        assert_eq!(Job::new("j", 0).status(&arena), ActivityStatus::Complete);
        assert_eq!(Group::new("g").status(&arena), ActivityStatus::Complete);
    }

    #[test]
    fn group_aggregates_job_aggregates() {
        use ActivityStatus::*;
        let (arena, ids) = arena_with(&[Active, Active, Paused, Paused]);
        let mut group = Group::new("g");
        let mut a = Job::new("a", 0);
        a.triggers = ids[..2].to_vec();
        let mut b = Job::new("b", 0);
        b.triggers = ids[2..].to_vec();
        group.jobs = vec![a, b];

        assert_eq!(group.job("a").unwrap().status(&arena), Active);
        assert_eq!(group.job("b").unwrap().status(&arena), Paused);
        assert_eq!(group.status(&arena), Mixed);
        assert_eq!(group.trigger_ids().count(), 4);
    }

    #[test]
    fn detach_reports_presence() {
        let mut job = Job::new("j", 0);
        job.triggers = vec![TriggerId(1), TriggerId(2)];
        assert!(job.detach(TriggerId(1)));
        assert!(!job.detach(TriggerId(1)));
        assert_eq!(job.triggers, vec![TriggerId(2)]);
    }
}

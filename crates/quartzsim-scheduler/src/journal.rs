//! Bounded, cursor-queryable log of scheduler events.
//!
//! Ids start at 1 and strictly increase. Once [`JOURNAL_CAPACITY`] entries
//! are held the oldest is evicted on every push; a client whose cursor falls
//! below [`EventJournal::oldest_id`] has missed events for good.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use quartzsim_core::ActivityStatus;
use serde::{Deserialize, Serialize};

pub const JOURNAL_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventScope {
    Scheduler,
    Group,
    Job,
    Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Fired,
    Completed,
    Paused,
    Resumed,
    Standby,
    Shutdown,
}

impl EventType {
    /// Event emitted when an operator moves an activity to `status`.
    ///
    /// # Panics
    ///
    /// Only `Paused` and `Active` are operator targets; any other status here
    /// means the status model is broken.
    pub fn for_status(status: ActivityStatus) -> Self {
        match status {
            ActivityStatus::Paused => EventType::Paused,
            ActivityStatus::Active => EventType::Resumed,
            other => panic!("unsupported activity status for a status change: {other}"),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Fired => "fired",
            EventType::Completed => "completed",
            EventType::Paused => "paused",
            EventType::Resumed => "resumed",
            EventType::Standby => "standby",
            EventType::Shutdown => "shutdown",
        };
        write!(f, "{s}")
    }
}

/// One error line attached to a faulted event; `level` 0 is the outermost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub level: u32,
    pub text: String,
}

/// An event before it receives its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub scope: EventScope,
    pub event_type: EventType,
    pub item_key: Option<String>,
    pub fire_instance_id: Option<u64>,
}

impl EventDraft {
    pub fn scheduler(event_type: EventType) -> Self {
        Self {
            scope: EventScope::Scheduler,
            event_type,
            item_key: None,
            fire_instance_id: None,
        }
    }

    pub fn trigger(event_type: EventType, name: &str, fire_instance_id: Option<u64>) -> Self {
        Self {
            scope: EventScope::Trigger,
            event_type,
            item_key: Some(name.to_string()),
            fire_instance_id,
        }
    }

    pub fn new(scope: EventScope, event_type: EventType, item_key: Option<String>) -> Self {
        Self {
            scope,
            event_type,
            item_key,
            fire_instance_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerEvent {
    pub id: u64,
    pub date: DateTime<Utc>,
    pub scope: EventScope,
    pub event_type: EventType,
    /// Trigger name, group name, or `"group.job"`; absent for scheduler scope.
    pub item_key: Option<String>,
    pub fire_instance_id: Option<u64>,
    pub faulted: bool,
    pub errors: Option<Vec<ErrorMessage>>,
}

#[derive(Debug, Clone)]
pub struct EventJournal {
    events: VecDeque<SchedulerEvent>,
    next_id: u64,
}

impl EventJournal {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(JOURNAL_CAPACITY),
            next_id: 1,
        }
    }

    /// Append an event; `errors` marks it faulted. Returns the assigned id.
    pub fn push(
        &mut self,
        draft: EventDraft,
        date: DateTime<Utc>,
        errors: Option<Vec<ErrorMessage>>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push_back(SchedulerEvent {
            id,
            date,
            scope: draft.scope,
            event_type: draft.event_type,
            item_key: draft.item_key,
            fire_instance_id: draft.fire_instance_id,
            faulted: errors.is_some(),
            errors,
        });
        while self.events.len() > JOURNAL_CAPACITY {
            self.events.pop_front();
        }
        id
    }

    /// All retained events with an id greater than `cursor`, oldest first.
    pub fn since(&self, cursor: u64) -> Vec<SchedulerEvent> {
        let start = self.events.partition_point(|e| e.id <= cursor);
        self.events.range(start..).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn oldest_id(&self) -> Option<u64> {
        self.events.front().map(|e| e.id)
    }

    pub fn latest_id(&self) -> Option<u64> {
        self.events.back().map(|e| e.id)
    }
}

impl Default for EventJournal {
    fn default() -> Self {
        Self::new()
    }
}

//! `quartzsim-scheduler`: discrete-event simulator of a Quartz-style job
//! scheduler.
//!
//! # Overview
//!
//! Triggers are grouped under jobs, and jobs under groups. A single
//! [`SchedulerEngine`] owns the whole tree and advances it in ticks
//! ([`SchedulerEngine::state_check`]) driven by one coalesced wake-up. Every
//! fire, completion and operator command is recorded in a bounded
//! [`EventJournal`] that clients read incrementally with a cursor.
//!
//! Executions are simulated: a fired trigger occupies the engine for its
//! job's duration and is then reported completed, optionally faulted by a
//! [`FaultPolicy`].
//!
//! | Status    | Meaning                                              |
//! |-----------|------------------------------------------------------|
//! | `Ready`   | Created or in standby; nothing fires                 |
//! | `Started` | Running with pending work                            |
//! | `Empty`   | Running with nothing scheduled                       |
//! | `Shutdown`| Terminal; drains in-flight executions, then disposes |
//!
//! Use [`actor::spawn`] to run the engine on a Tokio task and talk to it
//! through a cloneable [`SchedulerHandle`].

pub mod activity;
pub mod actor;
pub mod clock;
pub mod engine;
pub mod error;
pub mod fault;
pub mod journal;
pub mod schedule;
pub mod trigger;
pub mod types;

pub use actor::{spawn, SchedulerHandle};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use engine::{SchedulerEngine, WakeUp};
pub use error::{Result, SchedulerError};
pub use fault::{FaultPolicy, NoFaults, RandomFaults};
pub use journal::{EventJournal, EventScope, EventType, SchedulerEvent};
pub use schedule::TriggerSpec;
pub use trigger::TriggerId;
pub use types::{Operation, SchedulerSnapshot};

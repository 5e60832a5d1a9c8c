//! `quartzsim-core`: vocabulary shared by the simulator engine and its
//! consumers: activity/scheduler status types, configuration and errors.

pub mod config;
pub mod error;
pub mod types;

pub use error::{Result, SimError};
pub use types::{aggregate_status, ActivityStatus, SchedulerStatus};

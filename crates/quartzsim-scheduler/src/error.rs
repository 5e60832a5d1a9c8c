use quartzsim_core::SimError;
use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The provided schedule definition is invalid or unsupported.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// fire-now asked for a trigger name that its job already holds.
    #[error("Trigger already exists: {group}.{job}.{trigger}")]
    TriggerExists {
        group: String,
        job: String,
        trigger: String,
    },

    /// The engine has been shut down and accepts no further commands.
    #[error("Scheduler has been shut down")]
    ShutDown,

    /// The actor task owning the engine is gone.
    #[error("Scheduler engine is not running")]
    EngineStopped,

    #[error(transparent)]
    Core(#[from] SimError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

//! Single-writer task that owns a [`SchedulerEngine`] and drives its timer.
//!
//! Every mutation arrives as a [`Command`] over an mpsc channel and is applied
//! in arrival order, so commands and ticks never interleave. The task keeps
//! exactly one sleep armed for the engine's [`WakeUp`] instant.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info};

use crate::{
    engine::{SchedulerEngine, WakeUp},
    error::{Result, SchedulerError},
    journal::SchedulerEvent,
    schedule::TriggerSpec,
    trigger::TriggerId,
    types::{Operation, SchedulerSnapshot},
};

/// Queue depth between handles and the actor.
pub const COMMAND_BUFFER: usize = 256;

/// Far-future deadline used while no wake-up is pending.
const PARKED: Duration = Duration::from_secs(60 * 60 * 24 * 365);

pub enum Command {
    Apply {
        op: Operation,
        reply: oneshot::Sender<bool>,
    },
    FireNow {
        group: Option<String>,
        job: Option<String>,
        trigger: Option<String>,
        spec: TriggerSpec,
        reply: oneshot::Sender<Result<TriggerId>>,
    },
    Snapshot {
        reply: oneshot::Sender<SchedulerSnapshot>,
    },
    EventsSince {
        cursor: u64,
        reply: oneshot::Sender<Vec<SchedulerEvent>>,
    },
}

pub struct SchedulerActor {
    engine: SchedulerEngine,
    rx: mpsc::Receiver<Command>,
}

impl SchedulerActor {
    pub fn new(engine: SchedulerEngine, rx: mpsc::Receiver<Command>) -> Self {
        Self { engine, rx }
    }

    /// Process commands and wake-ups until every handle is dropped or the
    /// shutdown signal flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SchedulerEngine {
        info!(scheduler = %self.engine.name(), "scheduler actor started");

        let timer = sleep_until(Instant::now() + PARKED);
        tokio::pin!(timer);
        let mut armed = self.rearm(timer.as_mut());
        let mut watching = true;

        loop {
            tokio::select! {
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle(cmd),
                        None => {
                            debug!("all scheduler handles dropped");
                            break;
                        }
                    }
                    armed = self.rearm(timer.as_mut());
                }
                () = &mut timer, if armed => {
                    self.engine.state_check();
                    armed = self.rearm(timer.as_mut());
                }
                changed = shutdown.changed(), if watching => {
                    match changed {
                        Ok(()) if *shutdown.borrow() => {
                            info!("scheduler actor received shutdown signal");
                            break;
                        }
                        Ok(()) => {}
                        // Sender gone: nobody can signal shutdown any more.
                        Err(_) => watching = false,
                    }
                }
            }
        }

        info!(
            scheduler = %self.engine.name(),
            jobs_executed = self.engine.jobs_executed(),
            "scheduler actor stopped"
        );
        self.engine
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Apply { op, reply } => {
                debug!(?op, "applying operation");
                let _ = reply.send(self.engine.apply(op));
            }
            Command::FireNow {
                group,
                job,
                trigger,
                spec,
                reply,
            } => {
                let result = self.engine.fire_now(
                    group.as_deref(),
                    job.as_deref(),
                    trigger.as_deref(),
                    spec,
                );
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.engine.snapshot());
            }
            Command::EventsSince { cursor, reply } => {
                let _ = reply.send(self.engine.events_since(cursor));
            }
        }
    }

    /// Point the timer at the engine's wake-up. Returns whether it is armed.
    fn rearm(&self, timer: std::pin::Pin<&mut tokio::time::Sleep>) -> bool {
        match self.engine.wake_up() {
            WakeUp::At(at) => {
                let wait = (at - self.engine.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                timer.reset(Instant::now() + wait);
                true
            }
            WakeUp::Idle | WakeUp::Disposed => {
                timer.reset(Instant::now() + PARKED);
                false
            }
        }
    }
}

/// Cloneable front door to a running [`SchedulerActor`].
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<Command>,
}

impl SchedulerHandle {
    pub fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| SchedulerError::EngineStopped)?;
        rx.await.map_err(|_| SchedulerError::EngineStopped)
    }

    pub async fn apply(&self, op: Operation) -> Result<bool> {
        self.request(|reply| Command::Apply { op, reply }).await
    }

    pub async fn start(&self) -> Result<bool> {
        self.apply(Operation::Start).await
    }

    pub async fn standby(&self) -> Result<bool> {
        self.apply(Operation::Standby).await
    }

    pub async fn shutdown(&self) -> Result<bool> {
        self.apply(Operation::Shutdown).await
    }

    pub async fn pause_scheduler(&self) -> Result<bool> {
        self.apply(Operation::PauseScheduler).await
    }

    pub async fn resume_scheduler(&self) -> Result<bool> {
        self.apply(Operation::ResumeScheduler).await
    }

    pub async fn pause_group(&self, group: &str) -> Result<bool> {
        self.apply(Operation::PauseGroup(group.to_string())).await
    }

    pub async fn resume_group(&self, group: &str) -> Result<bool> {
        self.apply(Operation::ResumeGroup(group.to_string())).await
    }

    pub async fn delete_group(&self, group: &str) -> Result<bool> {
        self.apply(Operation::DeleteGroup(group.to_string())).await
    }

    pub async fn pause_job(&self, group: &str, job: &str) -> Result<bool> {
        self.apply(Operation::PauseJob {
            group: group.to_string(),
            job: job.to_string(),
        })
        .await
    }

    pub async fn resume_job(&self, group: &str, job: &str) -> Result<bool> {
        self.apply(Operation::ResumeJob {
            group: group.to_string(),
            job: job.to_string(),
        })
        .await
    }

    pub async fn delete_job(&self, group: &str, job: &str) -> Result<bool> {
        self.apply(Operation::DeleteJob {
            group: group.to_string(),
            job: job.to_string(),
        })
        .await
    }

    pub async fn pause_trigger(&self, trigger: &str) -> Result<bool> {
        self.apply(Operation::PauseTrigger(trigger.to_string())).await
    }

    pub async fn resume_trigger(&self, trigger: &str) -> Result<bool> {
        self.apply(Operation::ResumeTrigger(trigger.to_string())).await
    }

    pub async fn delete_trigger(&self, trigger: &str) -> Result<bool> {
        self.apply(Operation::DeleteTrigger(trigger.to_string())).await
    }

    pub async fn fire_now(
        &self,
        group: Option<&str>,
        job: Option<&str>,
        trigger: Option<&str>,
        spec: TriggerSpec,
    ) -> Result<TriggerId> {
        let (group, job, trigger) = (
            group.map(String::from),
            job.map(String::from),
            trigger.map(String::from),
        );
        self.request(|reply| Command::FireNow {
            group,
            job,
            trigger,
            spec,
            reply,
        })
        .await?
    }

    pub async fn execute_now(&self, group: Option<&str>, job: Option<&str>) -> Result<TriggerId> {
        self.fire_now(group, job, None, TriggerSpec::once()).await
    }

    pub async fn snapshot(&self) -> Result<SchedulerSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn events_since(&self, cursor: u64) -> Result<Vec<SchedulerEvent>> {
        self.request(|reply| Command::EventsSince { cursor, reply })
            .await
    }
}

/// Spawn the actor on the current runtime. The task yields the engine back
/// once it stops.
pub fn spawn(
    engine: SchedulerEngine,
    shutdown: watch::Receiver<bool>,
) -> (SchedulerHandle, JoinHandle<SchedulerEngine>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(SchedulerActor::new(engine, rx).run(shutdown));
    (SchedulerHandle::new(tx), task)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::MonotonicClock;
    use crate::journal::EventType;
    use quartzsim_core::SchedulerStatus;

    fn spawn_engine() -> (SchedulerHandle, JoinHandle<SchedulerEngine>, watch::Sender<bool>) {
        let engine = SchedulerEngine::new("actor-test", Arc::new(MonotonicClock::new()));
        let (stop_tx, stop_rx) = watch::channel(false);
        let (handle, task) = spawn(engine, stop_rx);
        (handle, task, stop_tx)
    }

    #[tokio::test(start_paused = true)]
    async fn timer_drives_completion() {
        let (handle, task, stop) = spawn_engine();
        handle.start().await.unwrap();
        handle.execute_now(Some("G"), Some("J")).await.unwrap();

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.in_progress.len(), 1);

        tokio::time::sleep(Duration::from_millis(10_001)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.jobs_executed, 1);
        assert!(snap.in_progress.is_empty());
        assert_eq!(snap.status, SchedulerStatus::Empty);

        let kinds: Vec<EventType> = handle
            .events_since(0)
            .await
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            kinds,
            vec![EventType::Resumed, EventType::Fired, EventType::Completed]
        );

        stop.send(true).unwrap();
        let engine = task.await.unwrap();
        assert_eq!(engine.jobs_executed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handles_stops_the_actor() {
        let (handle, task, _stop) = spawn_engine();
        assert!(handle.start().await.unwrap());
        drop(handle);
        let engine = task.await.unwrap();
        assert_eq!(engine.status(), SchedulerStatus::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_actor_reports_engine_stopped() {
        let (handle, task, stop) = spawn_engine();
        stop.send(true).unwrap();
        task.await.unwrap();
        assert!(matches!(
            handle.start().await,
            Err(SchedulerError::EngineStopped)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_fire_now_keeps_the_actor_alive() {
        let (handle, _task, _stop) = spawn_engine();
        handle.start().await.unwrap();
        let spec = TriggerSpec {
            start_at: Some(chrono::DateTime::<chrono::Utc>::MAX_UTC),
            initial_delay_ms: 1,
            ..TriggerSpec::every(1_000)
        };
        assert!(matches!(
            handle.fire_now(Some("G"), Some("J"), Some("T"), spec).await,
            Err(SchedulerError::InvalidSchedule(_))
        ));
        let snap = handle.snapshot().await.unwrap();
        assert!(snap.group("G").is_none());
        assert!(handle.execute_now(Some("G"), Some("J")).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn operations_return_engine_verdicts() {
        let (handle, _task, _stop) = spawn_engine();
        assert!(!handle.pause_group("missing").await.unwrap());
        handle
            .fire_now(Some("G"), Some("J"), Some("T"), TriggerSpec::every(1_000))
            .await
            .unwrap();
        assert!(handle.pause_group("G").await.unwrap());
        assert!(handle.shutdown().await.unwrap());
        assert!(!handle.start().await.unwrap());
        assert!(matches!(
            handle.execute_now(None, Some("J")).await,
            Err(SchedulerError::ShutDown)
        ));
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCHEDULER_NAME: &str = "quartzsim";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Top-level config (quartzsim.toml + QUARTZSIM_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    /// Static schedule: group name → job name → job definition.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

pub type ScheduleConfig = BTreeMap<String, GroupConfig>;
pub type GroupConfig = BTreeMap<String, JobConfig>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_name")]
    pub name: String,
    /// Call `start` as soon as the engine is spawned (default: true).
    #[serde(default = "bool_true")]
    pub auto_start: bool,
    /// Probability in `[0, 1]` that a completed execution is reported as
    /// faulted. `0` disables fault injection.
    #[serde(default)]
    pub fault_probability: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: default_scheduler_name(),
            auto_start: true,
            fault_probability: 0.0,
        }
    }
}

/// How the demo runner renders the event journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Emit one JSON object per event on stdout instead of log lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// How long one execution of this job takes, in milliseconds.
    pub duration_ms: u64,
    #[serde(default)]
    pub triggers: BTreeMap<String, TriggerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub repeat_interval_ms: u64,
    /// Total number of executions; unlimited when absent.
    #[serde(default)]
    pub repeat_count: Option<u32>,
    #[serde(default)]
    pub initial_delay_ms: u64,
    /// Create the trigger in the paused state.
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    /// Keep the trigger (as complete) once it has no more firings.
    #[serde(default)]
    pub persist_after_execution: bool,
}

impl TriggerConfig {
    /// Repeating trigger with no bounds.
    pub fn every(repeat_interval_ms: u64) -> Self {
        Self {
            repeat_interval_ms,
            repeat_count: None,
            initial_delay_ms: 0,
            paused: false,
            start_at: None,
            end_at: None,
            persist_after_execution: false,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_scheduler_name() -> String {
    DEFAULT_SCHEDULER_NAME.to_string()
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl SimConfig {
    /// Load config from a TOML file with QUARTZSIM_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. $QUARTZSIM_CONFIG
    ///   3. ~/.quartzsim/quartzsim.toml
    ///
    /// Nested keys use a double underscore, e.g.
    /// `QUARTZSIM_SCHEDULER__FAULT_PROBABILITY=0.5`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(%path, "loading configuration");

        let config: SimConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("QUARTZSIM_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but make no sense.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(0.0..=1.0).contains(&self.scheduler.fault_probability) {
            return Err(crate::error::SimError::Config(format!(
                "scheduler.fault_probability must be within [0, 1], got {}",
                self.scheduler.fault_probability
            )));
        }
        Ok(())
    }

    /// A small schedule that exercises every trigger shape: unbounded,
    /// bounded, delayed, paused and persistent.
    pub fn demo_schedule() -> ScheduleConfig {
        let mut reports = GroupConfig::new();
        reports.insert(
            "nightly-report".to_string(),
            JobConfig {
                duration_ms: 4_000,
                triggers: BTreeMap::from([
                    ("every-10s".to_string(), TriggerConfig::every(10_000)),
                    (
                        "backfill".to_string(),
                        TriggerConfig {
                            repeat_count: Some(3),
                            initial_delay_ms: 2_000,
                            persist_after_execution: true,
                            ..TriggerConfig::every(6_000)
                        },
                    ),
                ]),
            },
        );
        reports.insert(
            "cleanup".to_string(),
            JobConfig {
                duration_ms: 1_500,
                triggers: BTreeMap::from([(
                    "hourly".to_string(),
                    TriggerConfig {
                        paused: true,
                        ..TriggerConfig::every(15_000)
                    },
                )]),
            },
        );

        let mut maintenance = GroupConfig::new();
        maintenance.insert(
            "reindex".to_string(),
            JobConfig {
                duration_ms: 7_000,
                triggers: BTreeMap::from([(
                    "twice".to_string(),
                    TriggerConfig {
                        repeat_count: Some(2),
                        initial_delay_ms: 5_000,
                        ..TriggerConfig::every(20_000)
                    },
                )]),
            },
        );

        ScheduleConfig::from([
            ("Reports".to_string(), reports),
            ("Maintenance".to_string(), maintenance),
        ])
    }
}

fn default_config_path() -> String {
    if let Ok(path) = std::env::var("QUARTZSIM_CONFIG") {
        return path;
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.quartzsim/quartzsim.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("absent.toml");
            let config = SimConfig::load(path.to_str()).expect("defaults");
            assert_eq!(config.scheduler.name, DEFAULT_SCHEDULER_NAME);
            assert!(config.scheduler.auto_start);
            assert_eq!(config.timeline.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
            assert!(config.schedule.is_empty());
            Ok(())
        });
    }

    #[test]
    fn schedule_tree_parses_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "quartzsim.toml",
                r#"
                [scheduler]
                name = "Ops"
                auto_start = false

                [schedule.Reports.nightly]
                duration_ms = 250

                [schedule.Reports.nightly.triggers.hourly]
                repeat_interval_ms = 1000
                repeat_count = 3
                persist_after_execution = true

                [schedule.Reports.nightly.triggers.once]
                repeat_interval_ms = 1
                repeat_count = 1
                paused = true
                end_at = "2030-01-01T00:00:00Z"
                "#,
            )?;
            let config = SimConfig::load(Some("quartzsim.toml")).expect("config");
            assert_eq!(config.scheduler.name, "Ops");
            assert!(!config.scheduler.auto_start);

            let job = &config.schedule["Reports"]["nightly"];
            assert_eq!(job.duration_ms, 250);
            let hourly = &job.triggers["hourly"];
            assert_eq!(hourly.repeat_count, Some(3));
            assert!(hourly.persist_after_execution);
            assert_eq!(hourly.initial_delay_ms, 0);
            let once = &job.triggers["once"];
            assert!(once.paused);
            assert!(once.end_at.is_some());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_nested_keys() {
        Jail::expect_with(|jail| {
            jail.create_file("quartzsim.toml", "[scheduler]\nname = \"file\"\n")?;
            jail.set_env("QUARTZSIM_SCHEDULER__NAME", "env");
            jail.set_env("QUARTZSIM_TIMELINE__POLL_INTERVAL_MS", "250");
            let config = SimConfig::load(Some("quartzsim.toml")).expect("config");
            assert_eq!(config.scheduler.name, "env");
            assert_eq!(config.timeline.poll_interval_ms, 250);
            Ok(())
        });
    }

    #[test]
    fn out_of_range_fault_probability_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("quartzsim.toml", "[scheduler]\nfault_probability = 1.5\n")?;
            let err = SimConfig::load(Some("quartzsim.toml")).unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR");
            Ok(())
        });
    }

    #[test]
    fn validate_rejects_nan_probability() {
        let mut config = SimConfig::default();
        assert!(config.validate().is_ok());
        config.scheduler.fault_probability = f64::NAN;
        assert_eq!(config.validate().unwrap_err().code(), "CONFIG_ERROR");
    }

    #[test]
    fn demo_schedule_is_non_trivial() {
        let schedule = SimConfig::demo_schedule();
        let triggers: usize = schedule
            .values()
            .flat_map(|g| g.values())
            .map(|j| j.triggers.len())
            .sum();
        assert_eq!(schedule.len(), 2);
        assert_eq!(triggers, 4);
    }
}

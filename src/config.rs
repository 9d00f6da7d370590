//! Configuration loading.
//!
//! The configuration is a JSON object read once at startup. Raw keys are
//! deserialized into `RawConfig` and then validated into a
//! [`SchedulerConfig`], which is passed explicitly to the generator and the
//! engine.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::Ticks;
use crate::error::{SimError, SimResult};
use crate::scheduler::PolicyKind;
use crate::sim::{Priority, ProcessId, ProcessRecord};

pub const DEFAULT_MAX_PROCESSES: usize = 100;
pub const DEFAULT_MAX_ITERATIONS: u64 = 1_000_000;

/// Inclusive tick range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TickRange {
    pub min: Ticks,
    pub max: Ticks,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriorityRange {
    pub min: Priority,
    pub max: Priority,
    /// One weight per value in `min..=max`. Uniform when absent.
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

/// Distribution of the gap between consecutive arrivals in time-bounded
/// generation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "distribution", rename_all = "lowercase")]
pub enum ArrivalDistribution {
    Uniform { min: Ticks, max: Ticks },
    Exponential { lambda: f64 },
}

/// Bounds used by the workload generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub max_time: Ticks,
    pub burst: TickRange,
    pub priority: PriorityRange,
    pub arrival: ArrivalDistribution,
    pub max_processes: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_time: 100,
            burst: TickRange { min: 1, max: 20 },
            priority: PriorityRange {
                min: 0,
                max: 5,
                weights: None,
            },
            arrival: ArrivalDistribution::Uniform { min: 0, max: 5 },
            max_processes: DEFAULT_MAX_PROCESSES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Count,
    Time,
}

/// Where the simulated processes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkloadSource {
    /// `processesNumber` processes with arrivals in `[0, maxTime]`.
    Count(i64),
    /// Arrivals drawn gap by gap until the horizon is exceeded.
    Time(Ticks),
    /// Explicit list from the `processes` key.
    Static(Vec<ProcessRecord>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub policy: PolicyKind,
    /// Raw `timeQuantum`; only meaningful for Round Robin.
    pub time_quantum: i64,
    pub workload: WorkloadSource,
    pub generator: GeneratorConfig,
    pub seed: Option<u64>,
    pub max_iterations: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    schedule_algorithm: Option<String>,
    max_time: Option<Ticks>,
    processes_number: Option<i64>,
    time_quantum: Option<i64>,
    #[serde(default)]
    generation_mode: GenerationMode,
    seed: Option<u64>,
    burst_time: Option<TickRange>,
    priority: Option<PriorityRange>,
    arrival: Option<ArrivalDistribution>,
    max_processes: Option<usize>,
    max_iterations: Option<u64>,
    processes: Option<Vec<StaticProcess>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StaticProcess {
    pid: ProcessId,
    arrival_time: Ticks,
    burst_time: Ticks,
    #[serde(default)]
    priority: Priority,
}

impl SchedulerConfig {
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SimError::ConfigurationParse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::parse(&text, &path.display().to_string())?;
        tracing::info!(
            path = %path.display(),
            policy = %config.policy,
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> SimResult<Self> {
        Self::parse(text, "<inline>")
    }

    fn parse(text: &str, origin: &str) -> SimResult<Self> {
        let parse_err = |reason: String| SimError::ConfigurationParse {
            path: origin.to_string(),
            reason,
        };
        let missing = |key: &str| parse_err(format!("missing required key `{key}`"));

        let raw: RawConfig = serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?;

        let policy: PolicyKind = raw
            .schedule_algorithm
            .as_deref()
            .ok_or_else(|| missing("scheduleAlgorithm"))?
            .parse()?;

        let time_quantum = match (policy, raw.time_quantum) {
            (PolicyKind::RoundRobin, None) => return Err(missing("timeQuantum")),
            (_, quantum) => quantum.unwrap_or(0),
        };

        let workload = match (raw.processes, raw.generation_mode) {
            (Some(list), _) => WorkloadSource::Static(
                list.into_iter()
                    .map(|p| ProcessRecord::new(p.pid, p.arrival_time, p.burst_time, p.priority))
                    .collect(),
            ),
            (None, GenerationMode::Count) => {
                raw.max_time.ok_or_else(|| missing("maxTime"))?;
                WorkloadSource::Count(raw.processes_number.ok_or_else(|| missing("processesNumber"))?)
            }
            (None, GenerationMode::Time) => {
                WorkloadSource::Time(raw.max_time.ok_or_else(|| missing("maxTime"))?)
            }
        };

        let defaults = GeneratorConfig::default();
        let generator = GeneratorConfig {
            max_time: raw.max_time.unwrap_or(defaults.max_time),
            burst: raw.burst_time.unwrap_or(defaults.burst),
            priority: raw.priority.unwrap_or(defaults.priority),
            arrival: raw.arrival.unwrap_or(defaults.arrival),
            max_processes: raw.max_processes.unwrap_or(defaults.max_processes),
        };

        Ok(Self {
            policy,
            time_quantum,
            workload,
            generator,
            seed: raw.seed,
            max_iterations: raw.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        })
    }
}

use thiserror::Error;

use crate::core::Ticks;
use crate::sim::ProcessId;

/// Errors raised by configuration loading, workload generation, the
/// scheduler engine and the metrics reporter. Every variant is terminal for
/// the current run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// The configuration file is missing, malformed, or lacks a key required
    /// by the selected mode.
    #[error("failed to parse configuration {path}: {reason}")]
    ConfigurationParse { path: String, reason: String },

    /// A generator bound or workload value is empty, inverted or out of range.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// Time-bounded generation hit the process cap before the horizon.
    #[error("process cap of {capacity} reached before horizon {horizon}")]
    CapacityExceeded { capacity: usize, horizon: Ticks },

    #[error("unknown scheduling policy `{0}`")]
    UnknownPolicy(String),

    #[error("round robin requires a positive time quantum, got {0}")]
    InvalidQuantum(i64),

    /// A process has no (or not enough) recorded CPU time at summary time.
    #[error("process {process} has {recorded} of {burst} ticks recorded")]
    IncompleteSimulation {
        process: ProcessId,
        recorded: Ticks,
        burst: Ticks,
    },

    /// An interval is empty, starts before its process arrived, overlaps
    /// the previous interval, or names a process not in the workload.
    #[error("process {process} has an impossible interval [{start}, {end})")]
    MalformedTimeline {
        process: ProcessId,
        start: Ticks,
        end: Ticks,
    },

    #[error("simulation did not terminate after {iterations} iterations (clock at {clock})")]
    SimulationDivergence { iterations: u64, clock: Ticks },
}

/// A type alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

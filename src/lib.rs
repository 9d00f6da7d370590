pub mod config;
pub mod core;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod sim;

pub use config::SchedulerConfig;
pub use error::{SimError, SimResult};
pub use metrics::{ProcessMetrics, SimulationReport, summarize};
pub use scheduler::{PolicyKind, Scheduler};
pub use sim::{ProcessRecord, SchedulerEngine, WorkloadGenerator};

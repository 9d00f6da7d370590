pub mod driver;
pub mod generator;
pub mod process;

pub use driver::{SchedulerEngine, Sim, compare, simulate, workload};
pub use generator::WorkloadGenerator;
pub use process::{Priority, ProcessId, ProcessInstance, ProcessRecord};

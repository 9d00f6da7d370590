pub mod driver;
pub mod event;
pub mod observer;
pub mod state;

pub use driver::SchedCore;
pub use event::{ExecutionInterval, SchedCoreEvent, Timeline};
pub use state::{DispatchKey, Dsq, DsqId, KernelCtx, Task, TaskId, TaskState, Ticks};

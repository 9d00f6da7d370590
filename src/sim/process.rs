use crate::core::state::Ticks;

pub type ProcessId = u64;

/// Scheduling priority. Lower values are more urgent.
pub type Priority = i32;

/// Immutable description of a simulated process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessRecord {
    pub id: ProcessId,
    pub arrival_time: Ticks,
    pub burst_time: Ticks,
    pub priority: Priority,
}

impl ProcessRecord {
    pub fn new(id: ProcessId, arrival_time: Ticks, burst_time: Ticks, priority: Priority) -> Self {
        Self {
            id,
            arrival_time,
            burst_time,
            priority,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessInstance {
    pub record: ProcessRecord,
    pub completion_time: Option<Ticks>,
}

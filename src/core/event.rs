use crate::core::Ticks;
use crate::scheduler::PolicyKind;
use crate::sim::ProcessId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedCoreEvent {
    Arrived { pid: ProcessId, at: Ticks },
    Dispatched { pid: ProcessId, at: Ticks, slice: Ticks },
    // Quantum expired with work remaining
    Preempted { pid: ProcessId, at: Ticks },
    Completed { pid: ProcessId, at: Ticks },
    // Clock jumped over a stretch with nothing runnable
    Idle { from: Ticks, to: Ticks },
}

/// One contiguous stretch of CPU time given to a process, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionInterval {
    pub pid: ProcessId,
    pub start: Ticks,
    pub end: Ticks,
}

impl ExecutionInterval {
    pub fn duration(&self) -> Ticks {
        self.end - self.start
    }
}

/// Output of one engine run: intervals in start order plus the event log.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub policy: PolicyKind,
    pub intervals: Vec<ExecutionInterval>,
    pub events: Vec<SchedCoreEvent>,
}

impl Timeline {
    pub fn intervals_for(&self, pid: ProcessId) -> impl Iterator<Item = &ExecutionInterval> {
        self.intervals.iter().filter(move |i| i.pid == pid)
    }

    pub fn end(&self) -> Ticks {
        self.intervals.last().map_or(0, |i| i.end)
    }

    /// Number of times the CPU changed hands. Back-to-back slices of the
    /// same process count once, so this can be lower than the number of
    /// `Dispatched` events.
    pub fn context_switches(&self) -> u64 {
        let mut previous = None;
        let mut switches = 0;
        for interval in &self.intervals {
            if previous != Some(interval.pid) {
                switches += 1;
            }
            previous = Some(interval.pid);
        }
        switches
    }
}

pub mod fifo;
pub mod priq;
pub mod rr;

use std::fmt;
use std::str::FromStr;

use crate::core::{
    Ticks,
    state::{KernelCtx, TaskId},
};
use crate::error::{SimError, SimResult};
pub use fifo::FifoScheduler;
pub use priq::{PriorityScheduler, PriqScheduler, SjfScheduler};
pub use rr::RoundRobinScheduler;

pub type EnqueueFlags = u64;

// Newly arrived process
pub const SCX_ENQ_WAKEUP: EnqueueFlags = 1 << 0;
// Re-entering after its slice expired
pub const SCX_ENQ_PREEMPT: EnqueueFlags = 1 << 32;

// Non-preemptive policies run a task until it completes
pub const SCX_SLICE_INF: Ticks = Ticks::MAX;

#[derive(Debug)]
pub enum DispatchError {
    NoRunnableTask,
}

/// The dispatch policies the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Fcfs,
    Sjf,
    Priority,
    RoundRobin,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [Self::Fcfs, Self::Sjf, Self::Priority, Self::RoundRobin];
}

impl FromStr for PolicyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FCFS" => Ok(Self::Fcfs),
            "SJF" | "SHORTEST_JOB_FIRST" => Ok(Self::Sjf),
            "PRIORITY" => Ok(Self::Priority),
            "ROUNDROBIN" | "ROUND_ROBIN" | "RR" => Ok(Self::RoundRobin),
            _ => Err(SimError::UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fcfs => "FCFS",
            Self::Sjf => "SJF",
            Self::Priority => "Priority",
            Self::RoundRobin => "RoundRobin",
        };
        f.write_str(name)
    }
}

/// Validated per-run policy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedParams {
    pub policy: PolicyKind,
    pub quantum: Ticks,
}

impl SchedParams {
    /// The quantum is only checked (and only kept) for Round Robin.
    pub fn new(policy: PolicyKind, quantum: i64) -> SimResult<Self> {
        let quantum = match policy {
            PolicyKind::RoundRobin if quantum <= 0 => return Err(SimError::InvalidQuantum(quantum)),
            PolicyKind::RoundRobin => quantum as Ticks,
            _ => SCX_SLICE_INF,
        };
        Ok(Self { policy, quantum })
    }
}

pub trait Scheduler {
    fn init(ctx: &mut KernelCtx, params: &SchedParams) -> Self;

    fn enqueue(&mut self, ctx: &mut KernelCtx, task: TaskId, flags: EnqueueFlags);

    /// Move the next task to run onto the local DSQ.
    fn dispatch(&mut self, ctx: &mut KernelCtx) -> Result<(), DispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_aliases() {
        assert_eq!("FCFS".parse::<PolicyKind>(), Ok(PolicyKind::Fcfs));
        assert_eq!("sjf".parse::<PolicyKind>(), Ok(PolicyKind::Sjf));
        assert_eq!("Priority".parse::<PolicyKind>(), Ok(PolicyKind::Priority));
        assert_eq!("RoundRobin".parse::<PolicyKind>(), Ok(PolicyKind::RoundRobin));
        assert_eq!("rr".parse::<PolicyKind>(), Ok(PolicyKind::RoundRobin));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert_eq!(
            "Lottery".parse::<PolicyKind>(),
            Err(SimError::UnknownPolicy("Lottery".to_string()))
        );
    }

    #[test]
    fn display_round_trips() {
        for policy in PolicyKind::ALL {
            assert_eq!(policy.to_string().parse::<PolicyKind>(), Ok(policy));
        }
    }

    #[test]
    fn quantum_checked_only_for_round_robin() {
        assert_eq!(
            SchedParams::new(PolicyKind::RoundRobin, 0),
            Err(SimError::InvalidQuantum(0))
        );
        assert_eq!(
            SchedParams::new(PolicyKind::RoundRobin, -3),
            Err(SimError::InvalidQuantum(-3))
        );
        assert_eq!(SchedParams::new(PolicyKind::RoundRobin, 4).map(|p| p.quantum), Ok(4));
        assert_eq!(
            SchedParams::new(PolicyKind::Fcfs, 0).map(|p| p.quantum),
            Ok(SCX_SLICE_INF)
        );
    }
}

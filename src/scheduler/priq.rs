use std::marker::PhantomData;

use super::{DispatchError, EnqueueFlags, KernelCtx, SCX_SLICE_INF, SchedParams, Scheduler, TaskId};
use crate::core::{DispatchKey, DsqId, state::Task};

/// Primary sort field of a priority DSQ. Ties fall back to arrival, then id.
pub trait DispatchOrder {
    fn primary(task: &Task) -> i64;
}

pub struct ShortestRemaining;

impl DispatchOrder for ShortestRemaining {
    fn primary(task: &Task) -> i64 {
        i64::try_from(task.remaining()).unwrap_or(i64::MAX)
    }
}

pub struct LowestPriority;

impl DispatchOrder for LowestPriority {
    fn primary(task: &Task) -> i64 {
        i64::from(task.priority)
    }
}

/// Non-preemptive scheduler over a private priority DSQ.
pub struct PriqScheduler<O: DispatchOrder> {
    priq: DsqId,
    _order: PhantomData<O>,
}

pub type SjfScheduler = PriqScheduler<ShortestRemaining>;
pub type PriorityScheduler = PriqScheduler<LowestPriority>;

impl<O: DispatchOrder> Scheduler for PriqScheduler<O> {
    fn init(ctx: &mut KernelCtx, _params: &SchedParams) -> Self {
        Self {
            priq: ctx.create_dsq_priq(),
            _order: PhantomData,
        }
    }

    fn enqueue(&mut self, ctx: &mut KernelCtx, task: TaskId, _flags: EnqueueFlags) {
        let t = ctx.task(task);
        let key = DispatchKey {
            primary: O::primary(t),
            arrival: t.arrival,
            pid: t.pid,
        };
        ctx.dsq_push_priq(self.priq, task, SCX_SLICE_INF, key);
    }

    fn dispatch(&mut self, ctx: &mut KernelCtx) -> Result<(), DispatchError> {
        if ctx.dsq_move_to_local(self.priq) {
            Ok(())
        } else {
            Err(DispatchError::NoRunnableTask)
        }
    }
}

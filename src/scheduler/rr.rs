use super::{DispatchError, EnqueueFlags, KernelCtx, SCX_ENQ_PREEMPT, SchedParams, Scheduler, TaskId};
use crate::core::Ticks;

/// Round robin over the global FIFO. Every enqueue, fresh or preempted, goes
/// to the tail with a full quantum.
pub struct RoundRobinScheduler {
    quantum: Ticks,
}

impl Scheduler for RoundRobinScheduler {
    fn init(_ctx: &mut KernelCtx, params: &SchedParams) -> Self {
        debug_assert!(params.quantum > 0, "Round robin needs a positive quantum");
        Self {
            quantum: params.quantum,
        }
    }

    fn enqueue(&mut self, ctx: &mut KernelCtx, task: TaskId, flags: EnqueueFlags) {
        tracing::trace!(
            pid = ctx.task(task).pid,
            requeue = flags & SCX_ENQ_PREEMPT != 0,
            "rr enqueue"
        );
        let dsq = ctx.global_dsq();
        ctx.dsq_push_fifo(dsq, task, self.quantum);
    }

    fn dispatch(&mut self, _ctx: &mut KernelCtx) -> Result<(), DispatchError> {
        Err(DispatchError::NoRunnableTask)
    }
}

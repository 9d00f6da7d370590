use super::{DispatchError, EnqueueFlags, KernelCtx, SCX_SLICE_INF, SchedParams, Scheduler, TaskId};

/// First come, first served. Arrivals are admitted in `(arrival, id)` order,
/// so the global FIFO is already in dispatch order.
pub struct FifoScheduler;

impl Scheduler for FifoScheduler {
    fn init(_ctx: &mut KernelCtx, _params: &SchedParams) -> Self {
        Self
    }

    fn enqueue(&mut self, ctx: &mut KernelCtx, task: TaskId, flags: EnqueueFlags) {
        let _ = flags;
        let dsq = ctx.global_dsq();
        ctx.dsq_push_fifo(dsq, task, SCX_SLICE_INF);
    }

    // The core drains the global DSQ itself.
    fn dispatch(&mut self, _ctx: &mut KernelCtx) -> Result<(), DispatchError> {
        Err(DispatchError::NoRunnableTask)
    }
}

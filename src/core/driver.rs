use super::{
    event::{ExecutionInterval, SchedCoreEvent},
    observer::Observer,
    state::{KernelCtx, TaskId, TaskState, Ticks},
};
use crate::scheduler::{
    DispatchError, EnqueueFlags, SCX_ENQ_PREEMPT, SCX_ENQ_WAKEUP, SchedParams, Scheduler,
};

/// Single-CPU scheduling core. Drives one policy over one `KernelCtx`.
pub struct SchedCore<S: Scheduler> {
    pub ctx: KernelCtx,
    pub scheduler: S,
    observer: Observer,
    intervals: Vec<ExecutionInterval>,
    events: Vec<SchedCoreEvent>,
}

impl<S: Scheduler> SchedCore<S> {
    pub fn new(params: &SchedParams) -> Self {
        let mut ctx = KernelCtx::new();
        let scheduler = S::init(&mut ctx, params);
        let observer = Observer::new();
        Self {
            ctx,
            scheduler,
            observer,
            intervals: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Dispatch the next task and run it for one slice, advancing the clock
    /// to the end of the slice. Returns `None` if nothing was runnable.
    ///
    /// The task stays on the CPU until `finish_slice` so that arrivals inside
    /// the slice can be admitted ahead of a requeue.
    pub fn run_slice(&mut self) -> Option<TaskId> {
        if self.ctx.cpu_is_idle() {
            self.try_schedule_cpu();
        }

        let task_id = self.ctx.current?;
        let start = self.ctx.now;
        let (pid, slice) = {
            let task = self.ctx.task_mut(task_id);
            let allocated = task
                .allocated_timeslice
                .expect("Dispatched task must have a timeslice");
            let slice = allocated.min(task.remaining());
            task.consumed_service += slice;
            (task.pid, slice)
        };
        debug_assert!(slice > 0, "Dispatched task {task_id} has no work left");

        self.events.push(SchedCoreEvent::Dispatched {
            pid,
            at: start,
            slice,
        });
        tracing::trace!(pid, start, slice, "dispatch");

        self.ctx.advance_to(start + slice);
        self.intervals.push(ExecutionInterval {
            pid,
            start,
            end: self.ctx.now,
        });
        self.observer.observe(&self.ctx);

        Some(task_id)
    }

    /// Take the running task off the CPU. Returns true if it terminated,
    /// otherwise it is requeued behind everything already admitted.
    pub fn finish_slice(&mut self, task_id: TaskId) -> bool {
        debug_assert_eq!(self.ctx.current, Some(task_id), "Finishing a task not on CPU");
        self.ctx.clear_cpu();

        let now = self.ctx.now;
        let pid = self.ctx.task(task_id).pid;
        if self.ctx.task(task_id).remaining() == 0 {
            self.ctx.mark_completed(task_id, now);
            self.events.push(SchedCoreEvent::Completed { pid, at: now });
            tracing::debug!(pid, at = now, "process completed");
            return true;
        }

        self.ctx.mark_ready(task_id);
        let flags: EnqueueFlags = SCX_ENQ_PREEMPT;
        self.scheduler.enqueue(&mut self.ctx, task_id, flags);
        self.events.push(SchedCoreEvent::Preempted { pid, at: now });
        false
    }

    fn try_schedule_cpu(&mut self) {
        if let Some(task) = self.ctx.dsq_pop(self.ctx.local_dsq()) {
            self.ctx.set_running(task);
            return;
        }

        if let Some(task) = self.ctx.dsq_pop(self.ctx.global_dsq()) {
            self.ctx.set_running(task);
            return;
        }

        if let Err(DispatchError::NoRunnableTask) = self.scheduler.dispatch(&mut self.ctx) {
            // Scheduler left CPU idle.
            return;
        }

        if let Some(task) = self.ctx.dsq_pop(self.ctx.local_dsq()) {
            self.ctx.set_running(task);
        }
    }

    /// Admit an arrived task into the ready queue. Admission may lag the
    /// arrival by up to one slice; the event carries the arrival tick.
    pub fn wake_task(&mut self, task: TaskId) {
        let task_ref = self.ctx.task(task);
        debug_assert_eq!(task_ref.state, TaskState::Ready);
        debug_assert!(task_ref.arrival <= self.ctx.now, "task {task} admitted early");
        let (pid, at) = (task_ref.pid, task_ref.arrival);
        self.events.push(SchedCoreEvent::Arrived { pid, at });
        let flags: EnqueueFlags = SCX_ENQ_WAKEUP;
        self.scheduler.enqueue(&mut self.ctx, task, flags);
    }

    /// Jump the clock over a stretch where nothing is runnable.
    pub fn idle_until(&mut self, t: Ticks) {
        debug_assert!(self.ctx.cpu_is_idle() && self.ctx.runnable_count() == 0);
        if t > self.ctx.now {
            self.events.push(SchedCoreEvent::Idle {
                from: self.ctx.now,
                to: t,
            });
            tracing::trace!(from = self.ctx.now, to = t, "cpu idle");
        }
        self.ctx.advance_to(t);
    }

    pub fn now(&self) -> Ticks {
        self.ctx.now
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn into_parts(self) -> (Vec<ExecutionInterval>, Vec<SchedCoreEvent>) {
        (self.intervals, self.events)
    }
}

use super::state::{KernelCtx, TaskState};

#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(&mut self, core: &KernelCtx) {
        self.step += 1;

        if let Some(task_id) = core.current {
            let task = core.task(task_id);
            debug_assert_eq!(
                task.state,
                TaskState::Running,
                "cpu.current task {task_id} must be Running"
            );
        }

        for (&task_id, &dsq_id) in &core.task_to_dsq {
            let task = core.task(task_id);
            debug_assert_ne!(
                task.state,
                TaskState::Terminated,
                "Terminated task {task_id} still present in DSQ {dsq_id:?}"
            );
            debug_assert_ne!(
                task.state,
                TaskState::Running,
                "Running task {task_id} must not appear in any DSQ"
            );
            if let Some(dsq) = core.dsqs.get(dsq_id) {
                debug_assert!(
                    dsq.contains(task_id),
                    "task_to_dsq claims task {task_id} in DSQ {dsq_id:?}, but queue does not contain it"
                );
            } else {
                debug_assert!(false, "task_to_dsq references unknown DSQ {dsq_id:?}");
            }
        }

        debug_assert!(
            core.dsqs[core.local_dsq()].is_empty(),
            "Local DSQ must be drained by dispatch"
        );

        let queued: usize = core.dsqs.values().map(|dsq| dsq.len()).sum();
        debug_assert_eq!(
            queued,
            core.runnable_count(),
            "DSQ contents and task_to_dsq disagree"
        );
    }
}

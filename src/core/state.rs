use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use std::collections::VecDeque;

use crate::sim::{Priority, ProcessId, ProcessRecord};

// Index into Task Vec
pub type TaskId = usize;
pub type Ticks = u64;
new_key_type! {
    pub struct DsqId;
}

/// Ordering key for priority DSQs: `(primary, arrival, process id)`, smallest
/// dispatches first.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct DispatchKey {
    pub primary: i64,
    pub arrival: Ticks,
    pub pid: ProcessId,
}

impl DispatchKey {
    fn tuple(&self) -> (i64, Ticks, ProcessId) {
        (self.primary, self.arrival, self.pid)
    }
}

// KeyedPriorityQueue is a max-heap, so we need to flip-flop DispatchKey's Ord
impl PartialOrd for DispatchKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DispatchKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.tuple().cmp(&self.tuple())
    }
}

/// Preemption is a transition back to `Ready`, not a resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Running,
    Terminated,
}

#[derive(Debug)]
pub struct Task {
    pub id: TaskId,
    pub pid: ProcessId,
    pub arrival: Ticks,
    pub priority: Priority,
    pub state: TaskState,
    pub required_service: Ticks,
    pub consumed_service: Ticks,
    pub allocated_timeslice: Option<Ticks>,
    pub first_dispatch: Option<Ticks>,
    pub completion_time: Option<Ticks>,
}

impl Task {
    pub fn remaining(&self) -> Ticks {
        self.required_service - self.consumed_service
    }
}

#[derive(Debug)]
pub enum Dsq {
    Fifo {
        tasks: VecDeque<TaskId>,
    },
    Priq {
        tasks: KeyedPriorityQueue<TaskId, DispatchKey>,
    },
}

impl Dsq {
    pub fn new_fifo() -> Self {
        Self::Fifo {
            tasks: VecDeque::new(),
        }
    }

    pub fn new_priq() -> Self {
        Self::Priq {
            tasks: KeyedPriorityQueue::new(),
        }
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        match self {
            Self::Fifo { tasks } => tasks.contains(&task_id),
            Self::Priq { tasks } => tasks.iter().any(|t| *t.0 == task_id),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fifo { tasks } => tasks.len(),
            Self::Priq { tasks } => tasks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable state of one simulation run: the clock, the CPU slot, the task
/// table and the dispatch queues. Never shared across runs.
#[derive(Debug)]
pub struct KernelCtx {
    pub now: Ticks,
    pub current: Option<TaskId>,
    pub tasks: Vec<Task>,
    pub dsqs: SlotMap<DsqId, Dsq>,
    pub task_to_dsq: FxHashMap<TaskId, DsqId>,
    pub global_dsq_id: DsqId,
    pub local_dsq_id: DsqId,
}

impl KernelCtx {
    pub fn new() -> Self {
        let mut dsqs = SlotMap::with_capacity_and_key(2);
        let global_dsq_id = dsqs.insert(Dsq::new_fifo());
        let local_dsq_id = dsqs.insert(Dsq::new_fifo());

        Self {
            now: 0,
            current: None,
            tasks: Vec::new(),
            dsqs,
            task_to_dsq: FxHashMap::default(),
            global_dsq_id,
            local_dsq_id,
        }
    }

    pub fn create_task(&mut self, record: &ProcessRecord) -> TaskId {
        let id = self.tasks.len();
        self.tasks.push(Task {
            id,
            pid: record.id,
            arrival: record.arrival_time,
            priority: record.priority,
            state: TaskState::Ready,
            required_service: record.burst_time,
            consumed_service: 0,
            allocated_timeslice: None,
            first_dispatch: None,
            completion_time: None,
        });
        id
    }

    pub fn advance_to(&mut self, t: Ticks) {
        debug_assert!(t >= self.now, "clock moved backwards: {} -> {t}", self.now);
        self.now = self.now.max(t);
    }

    pub fn create_dsq_priq(&mut self) -> DsqId {
        self.dsqs.insert(Dsq::new_priq())
    }

    fn dsq_push(&mut self, dsq_id: DsqId, task_id: TaskId, slice: Ticks, key: Option<DispatchKey>) {
        assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Task {task_id} already present in some DSQ"
        );

        let task = self.task_mut(task_id);
        debug_assert!(
            task.state == TaskState::Ready,
            "Task {task_id} must be Ready when enqueued"
        );

        task.allocated_timeslice = Some(slice);
        let dsq = self.dsqs.get_mut(dsq_id).expect("Unknown DSQ");

        match dsq {
            Dsq::Fifo { tasks } => tasks.push_back(task_id),
            Dsq::Priq { tasks } => {
                tasks.push(
                    task_id,
                    key.expect("Attempted to push to a PrioDsq with no key"),
                );
            }
        };

        self.task_to_dsq.insert(task_id, dsq_id);
    }

    pub fn dsq_push_fifo(&mut self, dsq_id: DsqId, task_id: TaskId, slice: Ticks) {
        self.dsq_push(dsq_id, task_id, slice, None);
    }

    pub fn dsq_push_priq(&mut self, dsq_id: DsqId, task_id: TaskId, slice: Ticks, key: DispatchKey) {
        self.dsq_push(dsq_id, task_id, slice, Some(key));
    }

    pub fn dsq_pop(&mut self, dsq_id: DsqId) -> Option<TaskId> {
        let dsq = self.dsqs.get_mut(dsq_id)?;
        let task = match dsq {
            Dsq::Fifo { tasks } => tasks.pop_front(),
            Dsq::Priq { tasks } => tasks.pop().map(|t| t.0),
        }?;

        let removed = self.task_to_dsq.remove(&task);
        debug_assert!(removed.is_some(), "Task {task} missing DSQ membership");

        Some(task)
    }

    pub fn dsq_move_to_local(&mut self, dsq_id: DsqId) -> bool {
        match self.dsq_pop(dsq_id) {
            Some(task) => {
                let slice = self
                    .task(task)
                    .allocated_timeslice
                    .expect("Task on DSQ must have slice");
                self.dsq_push_fifo(self.local_dsq(), task, slice);
                true
            }
            None => false,
        }
    }

    pub fn runnable_count(&self) -> usize {
        self.task_to_dsq.len()
    }

    pub fn task(&self, task_id: TaskId) -> &Task {
        &self.tasks[task_id]
    }

    pub fn task_mut(&mut self, task_id: TaskId) -> &mut Task {
        &mut self.tasks[task_id]
    }

    pub fn global_dsq(&self) -> DsqId {
        self.global_dsq_id
    }

    pub fn local_dsq(&self) -> DsqId {
        self.local_dsq_id
    }

    pub fn cpu_is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn mark_ready(&mut self, task_id: TaskId) {
        let task = self.task_mut(task_id);
        debug_assert!(
            task.state != TaskState::Terminated,
            "Terminated task {} cannot be ready",
            task.id
        );
        task.state = TaskState::Ready;
    }

    pub fn mark_completed(&mut self, task_id: TaskId, completion_time: Ticks) {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Completing task {} that is still enqueued",
            task_id
        );

        let task = &mut self.tasks[task_id];
        debug_assert!(
            task.state == TaskState::Running,
            "Task {task_id} must have been running before marked complete"
        );

        task.state = TaskState::Terminated;
        task.consumed_service = task.required_service;
        task.completion_time = Some(completion_time);
    }

    pub fn set_running(&mut self, task_id: TaskId) {
        debug_assert!(
            !self.task_to_dsq.contains_key(&task_id),
            "Running task {task_id} must not be enqueued"
        );
        debug_assert!(self.current.is_none(), "CPU already running a task");

        let now = self.now;
        self.current = Some(task_id);
        let task = self.task_mut(task_id);
        task.state = TaskState::Running;
        task.first_dispatch.get_or_insert(now);
    }

    pub fn clear_cpu(&mut self) {
        self.current = None;
    }
}

impl Default for KernelCtx {
    fn default() -> Self {
        Self::new()
    }
}

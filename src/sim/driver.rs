use rustc_hash::{FxHashMap, FxHashSet};

use super::generator::WorkloadGenerator;
use super::process::{ProcessInstance, ProcessRecord};
use crate::{
    config::SchedulerConfig,
    core::{Ticks, Timeline, driver::SchedCore, state::TaskId},
    error::{SimError, SimResult},
    metrics::{self, SimulationReport},
    scheduler::{
        FifoScheduler, PolicyKind, PriorityScheduler, RoundRobinScheduler, SchedParams, Scheduler,
        SjfScheduler,
    },
};

/// One run of a workload under a fixed policy.
pub struct Sim<S: Scheduler> {
    pub core: SchedCore<S>,
    pub processes: Vec<ProcessInstance>,
    policy: PolicyKind,
    cursor: usize,
    // TaskId --> processes[index]; used to propagate completion back to the instance
    tasks_to_processes: FxHashMap<TaskId, usize>,
}

impl<S: Scheduler> Sim<S> {
    pub fn new(mut processes: Vec<ProcessRecord>, params: &SchedParams) -> Self {
        processes.sort_by(|a, b| {
            a.arrival_time
                .cmp(&b.arrival_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        let processes = processes
            .into_iter()
            .map(|record| ProcessInstance {
                record,
                completion_time: None,
            })
            .collect();

        Self {
            core: SchedCore::<S>::new(params),
            processes,
            policy: params.policy,
            cursor: 0,
            tasks_to_processes: FxHashMap::default(),
        }
    }

    /// Advance to the next decision point: run one slice, or jump the clock
    /// to the next arrival if nothing is ready.
    pub fn step(&mut self) {
        self.handle_arrivals();

        if let Some(task) = self.core.run_slice() {
            // Arrivals inside the slice queue ahead of a preempted task
            self.handle_arrivals();
            if self.core.finish_slice(task) {
                let index = *self
                    .tasks_to_processes
                    .get(&task)
                    .expect("Completed task missing associated process");
                self.processes[index].completion_time = Some(self.core.now());
            }
        } else if let Some(next) = self.next_arrival() {
            self.core.idle_until(next);
        }
    }

    fn handle_arrivals(&mut self) {
        let now = self.core.now();
        // Contiguous, since processes are sorted by arrival
        while let Some(instance) = self.processes.get(self.cursor) {
            if instance.record.arrival_time > now {
                break;
            }
            let task_id = self.core.ctx.create_task(&instance.record);
            self.tasks_to_processes.insert(task_id, self.cursor);
            self.core.wake_task(task_id);
            self.cursor += 1;
        }
    }

    fn next_arrival(&self) -> Option<Ticks> {
        self.processes
            .get(self.cursor)
            .map(|p| p.record.arrival_time)
    }

    pub fn all_processes_completed(&self) -> bool {
        self.processes.iter().all(|p| p.completion_time.is_some())
    }

    pub fn into_timeline(self) -> Timeline {
        let (intervals, events) = self.core.into_parts();
        Timeline {
            policy: self.policy,
            intervals,
            events,
        }
    }
}

/// Entry point for running workloads through a policy. Every `run` starts
/// from a fresh clock and ready queue.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerEngine {
    max_iterations: u64,
}

impl SchedulerEngine {
    pub fn new(max_iterations: u64) -> Self {
        Self { max_iterations }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.max_iterations)
    }

    pub fn run(
        &self,
        processes: &[ProcessRecord],
        policy: PolicyKind,
        quantum: i64,
    ) -> SimResult<Timeline> {
        let params = SchedParams::new(policy, quantum)?;
        validate(processes)?;

        match policy {
            PolicyKind::Fcfs => self.run_with::<FifoScheduler>(processes, &params),
            PolicyKind::Sjf => self.run_with::<SjfScheduler>(processes, &params),
            PolicyKind::Priority => self.run_with::<PriorityScheduler>(processes, &params),
            PolicyKind::RoundRobin => self.run_with::<RoundRobinScheduler>(processes, &params),
        }
    }

    fn run_with<S: Scheduler>(
        &self,
        processes: &[ProcessRecord],
        params: &SchedParams,
    ) -> SimResult<Timeline> {
        let mut sim = Sim::<S>::new(processes.to_vec(), params);
        let mut iterations = 0;

        while !sim.all_processes_completed() {
            if iterations >= self.max_iterations {
                tracing::warn!(iterations, clock = sim.core.now(), "simulation diverged");
                return Err(SimError::SimulationDivergence {
                    iterations,
                    clock: sim.core.now(),
                });
            }
            sim.step();
            iterations += 1;
        }

        tracing::debug!(
            policy = %params.policy,
            processes = processes.len(),
            iterations,
            dispatches = sim.core.observer().steps(),
            end = sim.core.now(),
            "simulation finished"
        );
        Ok(sim.into_timeline())
    }
}

impl Default for SchedulerEngine {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_ITERATIONS)
    }
}

fn validate(processes: &[ProcessRecord]) -> SimResult<()> {
    let mut seen = FxHashSet::default();
    for p in processes {
        if p.burst_time == 0 {
            return Err(SimError::InvalidConfiguration {
                field: "burstTime",
                reason: format!("process {} has zero burst time", p.id),
            });
        }
        if !seen.insert(p.id) {
            return Err(SimError::InvalidConfiguration {
                field: "id",
                reason: format!("process id {} is duplicated", p.id),
            });
        }
    }
    Ok(())
}

/// Generate the configured workload.
pub fn workload(config: &SchedulerConfig) -> SimResult<Vec<ProcessRecord>> {
    WorkloadGenerator::new(&config.generator, config.seed).generate(&config.workload)
}

/// Run `processes` under the configured policy and summarize the result.
pub fn simulate(config: &SchedulerConfig, processes: &[ProcessRecord]) -> SimResult<SimulationReport> {
    let engine = SchedulerEngine::from_config(config);
    let timeline = engine.run(processes, config.policy, config.time_quantum)?;
    metrics::summarize(processes, &timeline)
}

/// Run the same workload under every policy, for side-by-side comparison.
///
/// Round Robin uses the configured quantum; with a non-positive quantum it
/// fails like a direct run would.
pub fn compare(
    config: &SchedulerConfig,
    processes: &[ProcessRecord],
) -> SimResult<Vec<SimulationReport>> {
    let engine = SchedulerEngine::from_config(config);
    PolicyKind::ALL
        .iter()
        .map(|&policy| {
            let timeline = engine.run(processes, policy, config.time_quantum)?;
            metrics::summarize(processes, &timeline)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionInterval, SchedCoreEvent};

    fn iv(pid: u64, start: Ticks, end: Ticks) -> ExecutionInterval {
        ExecutionInterval { pid, start, end }
    }

    #[test]
    fn fcfs_runs_in_arrival_order() {
        let procs = [ProcessRecord::new(1, 0, 5, 0), ProcessRecord::new(2, 1, 3, 0)];
        let timeline = SchedulerEngine::default().run(&procs, PolicyKind::Fcfs, 0).unwrap();
        assert_eq!(timeline.intervals, vec![iv(1, 0, 5), iv(2, 5, 8)]);
    }

    #[test]
    fn arrivals_logged_at_arrival_time() {
        // p2 arrives mid-slice and is only admitted at tick 5
        let procs = [ProcessRecord::new(1, 0, 5, 0), ProcessRecord::new(2, 1, 3, 0)];
        let timeline = SchedulerEngine::default().run(&procs, PolicyKind::Fcfs, 0).unwrap();
        let arrivals: Vec<_> = timeline
            .events
            .iter()
            .filter(|e| matches!(e, SchedCoreEvent::Arrived { .. }))
            .copied()
            .collect();
        assert_eq!(
            arrivals,
            vec![
                SchedCoreEvent::Arrived { pid: 1, at: 0 },
                SchedCoreEvent::Arrived { pid: 2, at: 1 },
            ]
        );
    }

    #[test]
    fn round_robin_rotates_on_quantum() {
        let procs = [ProcessRecord::new(1, 0, 5, 0), ProcessRecord::new(2, 0, 3, 0)];
        let timeline = SchedulerEngine::default()
            .run(&procs, PolicyKind::RoundRobin, 2)
            .unwrap();
        assert_eq!(
            timeline.intervals,
            vec![iv(1, 0, 2), iv(2, 2, 4), iv(1, 4, 6), iv(2, 6, 7), iv(1, 7, 9)]
        );
    }

    #[test]
    fn arrival_at_expiry_queues_before_requeue() {
        // p2 lands exactly when p1's first slice ends
        let procs = [ProcessRecord::new(1, 0, 4, 0), ProcessRecord::new(2, 2, 2, 0)];
        let timeline = SchedulerEngine::default()
            .run(&procs, PolicyKind::RoundRobin, 2)
            .unwrap();
        assert_eq!(timeline.intervals, vec![iv(1, 0, 2), iv(2, 2, 4), iv(1, 4, 6)]);
    }

    #[test]
    fn idle_gap_is_jumped() {
        let procs = [ProcessRecord::new(1, 10, 2, 0)];
        let timeline = SchedulerEngine::default().run(&procs, PolicyKind::Sjf, 0).unwrap();
        assert_eq!(timeline.intervals, vec![iv(1, 10, 12)]);
        assert_eq!(
            timeline.events.first(),
            Some(&SchedCoreEvent::Idle { from: 0, to: 10 })
        );
    }

    #[test]
    fn sjf_waits_for_running_job() {
        let procs = [
            ProcessRecord::new(1, 0, 6, 0),
            ProcessRecord::new(2, 1, 4, 0),
            ProcessRecord::new(3, 2, 1, 0),
        ];
        let timeline = SchedulerEngine::default().run(&procs, PolicyKind::Sjf, 0).unwrap();
        assert_eq!(timeline.intervals, vec![iv(1, 0, 6), iv(3, 6, 7), iv(2, 7, 11)]);
    }

    #[test]
    fn priority_is_non_preemptive() {
        let procs = [
            ProcessRecord::new(1, 0, 3, 5),
            ProcessRecord::new(2, 1, 3, 0),
            ProcessRecord::new(3, 1, 3, 2),
        ];
        let timeline = SchedulerEngine::default()
            .run(&procs, PolicyKind::Priority, 0)
            .unwrap();
        assert_eq!(timeline.intervals, vec![iv(1, 0, 3), iv(2, 3, 6), iv(3, 6, 9)]);
    }

    #[test]
    fn invalid_quantum_rejected() {
        let procs = [ProcessRecord::new(1, 0, 1, 0)];
        assert_eq!(
            SchedulerEngine::default()
                .run(&procs, PolicyKind::RoundRobin, 0)
                .unwrap_err(),
            SimError::InvalidQuantum(0)
        );
    }

    #[test]
    fn zero_burst_rejected() {
        let procs = [ProcessRecord::new(1, 0, 0, 0)];
        assert!(matches!(
            SchedulerEngine::default().run(&procs, PolicyKind::Fcfs, 0),
            Err(SimError::InvalidConfiguration { field: "burstTime", .. })
        ));
    }

    #[test]
    fn iteration_ceiling_reports_divergence() {
        let procs = [
            ProcessRecord::new(1, 0, 10, 0),
            ProcessRecord::new(2, 0, 10, 0),
        ];
        let err = SchedulerEngine::new(3)
            .run(&procs, PolicyKind::RoundRobin, 1)
            .unwrap_err();
        assert_eq!(
            err,
            SimError::SimulationDivergence {
                iterations: 3,
                clock: 3
            }
        );
    }

    #[test]
    fn empty_workload_finishes_immediately() {
        let timeline = SchedulerEngine::default().run(&[], PolicyKind::Fcfs, 0).unwrap();
        assert!(timeline.intervals.is_empty());
        assert_eq!(timeline.end(), 0);
    }

    #[test]
    fn runs_do_not_share_state() {
        let engine = SchedulerEngine::default();
        let procs = [ProcessRecord::new(1, 3, 2, 0)];
        let a = engine.run(&procs, PolicyKind::Fcfs, 0).unwrap();
        let b = engine.run(&procs, PolicyKind::Fcfs, 0).unwrap();
        assert_eq!(a.intervals, b.intervals);
        assert_eq!(a.intervals, vec![iv(1, 3, 5)]);
    }
}

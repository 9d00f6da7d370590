//! Per-process and aggregate statistics derived from an engine timeline.

use std::collections::BTreeMap;
use std::fmt;

use average::Estimate;
use rustc_hash::FxHashMap;

use crate::core::{Ticks, Timeline};
use crate::error::{SimError, SimResult};
use crate::scheduler::PolicyKind;
use crate::sim::{ProcessId, ProcessRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMetrics {
    pub arrival_time: Ticks,
    pub burst_time: Ticks,
    pub first_run: Ticks,
    pub completion_time: Ticks,
    pub turnaround_time: Ticks,
    pub waiting_time: Ticks,
    pub response_time: Ticks,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub policy: PolicyKind,
    pub processes: BTreeMap<ProcessId, ProcessMetrics>,
    pub average_waiting_time: f64,
    pub average_turnaround_time: f64,
    pub average_response_time: f64,
    pub max_waiting_time: Ticks,
    /// Busy ticks over elapsed ticks, where elapsed ends at the last interval.
    pub cpu_utilization: f64,
    /// Completed processes per elapsed tick.
    pub throughput: f64,
    pub context_switches: u64,
    pub busy_ticks: Ticks,
    pub makespan: Ticks,
}

struct Accum {
    first_start: Ticks,
    last_end: Ticks,
    service: Ticks,
}

/// Summarize a finished run. Fails if any process did not receive its full
/// burst in `timeline`, or if an interval could not have come from a valid
/// schedule.
pub fn summarize(processes: &[ProcessRecord], timeline: &Timeline) -> SimResult<SimulationReport> {
    let arrivals: FxHashMap<ProcessId, Ticks> =
        processes.iter().map(|p| (p.id, p.arrival_time)).collect();
    let mut accum: FxHashMap<ProcessId, Accum> = FxHashMap::default();
    let mut previous_end = 0;

    for interval in &timeline.intervals {
        let arrived = arrivals.get(&interval.pid).copied();
        if interval.end <= interval.start
            || interval.start < previous_end
            || arrived.is_none_or(|at| interval.start < at)
        {
            return Err(SimError::MalformedTimeline {
                process: interval.pid,
                start: interval.start,
                end: interval.end,
            });
        }
        previous_end = interval.end;

        // Intervals are in start order, so the first one seen is the first run
        let a = accum.entry(interval.pid).or_insert(Accum {
            first_start: interval.start,
            last_end: interval.end,
            service: 0,
        });
        a.last_end = interval.end;
        a.service += interval.duration();
    }

    let mut per_process = BTreeMap::new();
    for p in processes {
        let (first_start, completion_time) = match accum.get(&p.id) {
            Some(a) if a.service == p.burst_time => (a.first_start, a.last_end),
            a => {
                return Err(SimError::IncompleteSimulation {
                    process: p.id,
                    recorded: a.map_or(0, |a| a.service),
                    burst: p.burst_time,
                });
            }
        };

        let turnaround_time = completion_time - p.arrival_time;
        per_process.insert(
            p.id,
            ProcessMetrics {
                arrival_time: p.arrival_time,
                burst_time: p.burst_time,
                first_run: first_start,
                completion_time,
                turnaround_time,
                waiting_time: turnaround_time - p.burst_time,
                response_time: first_start - p.arrival_time,
            },
        );
    }

    let busy_ticks: Ticks = timeline.intervals.iter().map(|i| i.duration()).sum();
    let makespan = timeline.end();
    let ratio = |n: f64| if makespan == 0 { 0.0 } else { n / makespan as f64 };

    Ok(SimulationReport {
        policy: timeline.policy,
        average_waiting_time: avg(per_process.values().map(|m| m.waiting_time as f64)),
        average_turnaround_time: avg(per_process.values().map(|m| m.turnaround_time as f64)),
        average_response_time: avg(per_process.values().map(|m| m.response_time as f64)),
        max_waiting_time: per_process.values().map(|m| m.waiting_time).max().unwrap_or(0),
        cpu_utilization: ratio(busy_ticks as f64),
        throughput: ratio(per_process.len() as f64),
        context_switches: timeline.context_switches(),
        busy_ticks,
        makespan,
        processes: per_process,
    })
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    iter.collect::<average::Mean>().estimate()
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Policy: {}", self.policy)?;
        writeln!(
            f,
            "{:>5} {:>8} {:>6} {:>6} {:>8} {:>10} {:>8} {:>9}",
            "pid", "arrival", "burst", "start", "finish", "turnaround", "waiting", "response"
        )?;
        for (pid, m) in &self.processes {
            writeln!(
                f,
                "{:>5} {:>8} {:>6} {:>6} {:>8} {:>10} {:>8} {:>9}",
                pid,
                m.arrival_time,
                m.burst_time,
                m.first_run,
                m.completion_time,
                m.turnaround_time,
                m.waiting_time,
                m.response_time
            )?;
        }
        writeln!(f, "Average waiting time: {:.2} ticks", self.average_waiting_time)?;
        writeln!(f, "Average turnaround time: {:.2} ticks", self.average_turnaround_time)?;
        writeln!(f, "Average response time: {:.2} ticks", self.average_response_time)?;
        writeln!(f, "Longest wait: {} ticks", self.max_waiting_time)?;
        writeln!(
            f,
            "CPU utilization: {:.1}% ({} of {} ticks)",
            self.cpu_utilization * 100.0,
            self.busy_ticks,
            self.makespan
        )?;
        writeln!(f, "Throughput: {:.3} processes/tick", self.throughput)?;
        write!(f, "Context switches: {}", self.context_switches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExecutionInterval;

    fn timeline(policy: PolicyKind, intervals: &[(u64, Ticks, Ticks)]) -> Timeline {
        Timeline {
            policy,
            intervals: intervals
                .iter()
                .map(|&(pid, start, end)| ExecutionInterval { pid, start, end })
                .collect(),
            events: Vec::new(),
        }
    }

    #[test]
    fn fcfs_waiting_times() {
        let procs = [ProcessRecord::new(1, 0, 5, 0), ProcessRecord::new(2, 1, 3, 0)];
        let report = summarize(&procs, &timeline(PolicyKind::Fcfs, &[(1, 0, 5), (2, 5, 8)])).unwrap();

        assert_eq!(report.processes[&1].waiting_time, 0);
        assert_eq!(report.processes[&2].waiting_time, 4);
        assert_eq!(report.processes[&2].turnaround_time, 7);
        assert_eq!(report.processes[&2].response_time, 4);
        assert!((report.average_waiting_time - 2.0).abs() < 1e-9);
        assert!((report.cpu_utilization - 1.0).abs() < 1e-9);
        assert_eq!(report.context_switches, 2);
    }

    #[test]
    fn round_robin_turnaround() {
        let procs = [ProcessRecord::new(1, 0, 5, 0), ProcessRecord::new(2, 0, 3, 0)];
        let t = timeline(
            PolicyKind::RoundRobin,
            &[(1, 0, 2), (2, 2, 4), (1, 4, 6), (2, 6, 7), (1, 7, 9)],
        );
        let report = summarize(&procs, &t).unwrap();

        assert_eq!(report.processes[&1].turnaround_time, 9);
        assert_eq!(report.processes[&2].turnaround_time, 7);
        assert_eq!(report.processes[&2].response_time, 2);
        assert_eq!(report.context_switches, 5);
        assert_eq!(report.max_waiting_time, 4);
    }

    #[test]
    fn utilization_counts_idle_prefix() {
        let procs = [ProcessRecord::new(1, 10, 2, 0)];
        let report = summarize(&procs, &timeline(PolicyKind::Fcfs, &[(1, 10, 12)])).unwrap();

        assert!((report.cpu_utilization - 2.0 / 12.0).abs() < 1e-9);
        assert_eq!(report.makespan, 12);
        assert_eq!(report.processes[&1].waiting_time, 0);
    }

    #[test]
    fn unscheduled_process_is_incomplete() {
        let procs = [ProcessRecord::new(1, 0, 2, 0), ProcessRecord::new(2, 0, 2, 0)];
        let err = summarize(&procs, &timeline(PolicyKind::Fcfs, &[(1, 0, 2)])).unwrap_err();
        assert_eq!(
            err,
            SimError::IncompleteSimulation {
                process: 2,
                recorded: 0,
                burst: 2
            }
        );
    }

    #[test]
    fn partially_run_process_is_incomplete() {
        let procs = [ProcessRecord::new(1, 0, 4, 0)];
        let err = summarize(&procs, &timeline(PolicyKind::RoundRobin, &[(1, 0, 2)])).unwrap_err();
        assert!(matches!(err, SimError::IncompleteSimulation { recorded: 2, .. }));
    }

    #[test]
    fn interval_before_arrival_is_rejected() {
        let procs = [ProcessRecord::new(1, 5, 2, 0)];
        let err = summarize(&procs, &timeline(PolicyKind::Fcfs, &[(1, 0, 2)])).unwrap_err();
        assert_eq!(
            err,
            SimError::MalformedTimeline {
                process: 1,
                start: 0,
                end: 2
            }
        );
    }

    #[test]
    fn overlapping_or_foreign_intervals_are_rejected() {
        let procs = [ProcessRecord::new(1, 0, 3, 0), ProcessRecord::new(2, 0, 3, 0)];
        let overlap = timeline(PolicyKind::Fcfs, &[(1, 0, 3), (2, 2, 5)]);
        assert!(matches!(
            summarize(&procs, &overlap),
            Err(SimError::MalformedTimeline { process: 2, start: 2, .. })
        ));

        let foreign = timeline(PolicyKind::Fcfs, &[(1, 0, 3), (9, 3, 4), (2, 4, 7)]);
        assert!(matches!(
            summarize(&procs, &foreign),
            Err(SimError::MalformedTimeline { process: 9, .. })
        ));

        let empty = timeline(PolicyKind::Fcfs, &[(1, 0, 3), (2, 3, 3)]);
        assert!(matches!(
            summarize(&procs, &empty),
            Err(SimError::MalformedTimeline { process: 2, .. })
        ));
    }

    #[test]
    fn empty_run_reports_zeroes() {
        let report = summarize(&[], &timeline(PolicyKind::Sjf, &[])).unwrap();
        assert_eq!(report.cpu_utilization, 0.0);
        assert_eq!(report.throughput, 0.0);
        assert_eq!(report.context_switches, 0);
    }

    #[test]
    fn report_renders_every_process() {
        let procs = [ProcessRecord::new(1, 0, 5, 0), ProcessRecord::new(2, 1, 3, 0)];
        let report = summarize(&procs, &timeline(PolicyKind::Fcfs, &[(1, 0, 5), (2, 5, 8)])).unwrap();
        let text = report.to_string();
        assert!(text.starts_with("Policy: FCFS"));
        assert!(text.contains("Average waiting time: 2.00 ticks"));
        assert!(text.contains("CPU utilization: 100.0% (8 of 8 ticks)"));
    }
}

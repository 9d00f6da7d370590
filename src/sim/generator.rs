use rand::distr::{Distribution, weighted::WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;

use super::process::{Priority, ProcessId, ProcessRecord};
use crate::config::{ArrivalDistribution, GeneratorConfig, WorkloadSource};
use crate::core::Ticks;
use crate::error::{SimError, SimResult};

/// Hands out ids 1, 2, 3, ... for a single generate call.
struct IdAllocator {
    next: ProcessId,
}

impl IdAllocator {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn next_id(&mut self) -> ProcessId {
        let id = self.next;
        self.next += 1;
        id
    }
}

enum PrioritySampler {
    Uniform(Priority, Priority),
    Weighted(Priority, WeightedIndex<f64>),
}

/// Seedable source of synthetic workloads.
pub struct WorkloadGenerator<'a> {
    config: &'a GeneratorConfig,
    rng: StdRng,
}

impl<'a> WorkloadGenerator<'a> {
    /// Without a seed the generator is seeded from the OS.
    pub fn new(config: &'a GeneratorConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }

    pub fn generate(&mut self, source: &WorkloadSource) -> SimResult<Vec<ProcessRecord>> {
        match source {
            WorkloadSource::Count(n) => self.generate_by_count(*n),
            WorkloadSource::Time(horizon) => self.generate_by_time(*horizon),
            WorkloadSource::Static(records) => static_workload(records),
        }
    }

    /// `n` processes with arrivals uniform over `[0, max_time]`, sorted by
    /// arrival. Ids follow arrival order.
    pub fn generate_by_count(&mut self, n: i64) -> SimResult<Vec<ProcessRecord>> {
        if n <= 0 {
            return Err(SimError::InvalidConfiguration {
                field: "processesNumber",
                reason: format!("must be positive, got {n}"),
            });
        }
        let priorities = self.priority_sampler()?;
        self.check_burst()?;

        let max_time = self.config.max_time;
        let mut drawn: Vec<(Ticks, Ticks, Priority)> = (0..n)
            .map(|_| {
                let arrival = self.rng.random_range(0..=max_time);
                let burst = self.draw_burst();
                let priority = self.draw_priority(&priorities);
                (arrival, burst, priority)
            })
            .collect();
        drawn.sort_by_key(|&(arrival, _, _)| arrival);

        let mut ids = IdAllocator::new();
        let processes: Vec<ProcessRecord> = drawn
            .into_iter()
            .map(|(arrival, burst, priority)| {
                ProcessRecord::new(ids.next_id(), arrival, burst, priority)
            })
            .collect();

        tracing::debug!(count = processes.len(), "generated workload by count");
        Ok(processes)
    }

    /// Processes arriving gap by gap from tick 0 until the running arrival
    /// time passes `horizon`. The draw that passes it is discarded.
    pub fn generate_by_time(&mut self, horizon: Ticks) -> SimResult<Vec<ProcessRecord>> {
        let priorities = self.priority_sampler()?;
        self.check_burst()?;
        self.check_arrival()?;

        let capacity = self.config.max_processes;
        let mut ids = IdAllocator::new();
        let mut processes = Vec::new();
        let mut arrival: Ticks = 0;

        loop {
            arrival = arrival.saturating_add(self.draw_gap());
            if arrival > horizon {
                break;
            }
            if processes.len() >= capacity {
                return Err(SimError::CapacityExceeded { capacity, horizon });
            }
            let burst = self.draw_burst();
            let priority = self.draw_priority(&priorities);
            processes.push(ProcessRecord::new(ids.next_id(), arrival, burst, priority));
        }

        tracing::debug!(count = processes.len(), horizon, "generated workload by time");
        Ok(processes)
    }

    fn check_burst(&self) -> SimResult<()> {
        let burst = self.config.burst;
        if burst.min == 0 || burst.min > burst.max {
            return Err(SimError::InvalidConfiguration {
                field: "burstTime",
                reason: format!("range [{}, {}] must be positive and ordered", burst.min, burst.max),
            });
        }
        Ok(())
    }

    fn check_arrival(&self) -> SimResult<()> {
        match self.config.arrival {
            ArrivalDistribution::Uniform { min, max } if min > max => {
                Err(SimError::InvalidConfiguration {
                    field: "arrival",
                    reason: format!("gap range [{min}, {max}] is inverted"),
                })
            }
            ArrivalDistribution::Exponential { lambda } if !(lambda.is_finite() && lambda > 0.0) => {
                Err(SimError::InvalidConfiguration {
                    field: "arrival",
                    reason: format!("lambda must be positive, got {lambda}"),
                })
            }
            _ => Ok(()),
        }
    }

    fn priority_sampler(&self) -> SimResult<PrioritySampler> {
        let range = &self.config.priority;
        if range.min > range.max {
            return Err(SimError::InvalidConfiguration {
                field: "priority",
                reason: format!("range [{}, {}] is inverted", range.min, range.max),
            });
        }

        let Some(weights) = &range.weights else {
            return Ok(PrioritySampler::Uniform(range.min, range.max));
        };
        let values = (i64::from(range.max) - i64::from(range.min) + 1) as usize;
        if weights.len() != values {
            return Err(SimError::InvalidConfiguration {
                field: "priority",
                reason: format!("{} weights for {values} priority values", weights.len()),
            });
        }
        let index = WeightedIndex::new(weights).map_err(|e| SimError::InvalidConfiguration {
            field: "priority",
            reason: e.to_string(),
        })?;
        Ok(PrioritySampler::Weighted(range.min, index))
    }

    fn draw_burst(&mut self) -> Ticks {
        let burst = self.config.burst;
        self.rng.random_range(burst.min..=burst.max)
    }

    fn draw_priority(&mut self, sampler: &PrioritySampler) -> Priority {
        match sampler {
            PrioritySampler::Uniform(min, max) => self.rng.random_range(*min..=*max),
            PrioritySampler::Weighted(min, index) => min + index.sample(&mut self.rng) as Priority,
        }
    }

    fn draw_gap(&mut self) -> Ticks {
        match self.config.arrival {
            ArrivalDistribution::Uniform { min, max } => self.rng.random_range(min..=max),
            ArrivalDistribution::Exponential { lambda } => {
                // Inverse CDF; 1 - u keeps ln away from zero
                let u: f64 = self.rng.random();
                (-(1.0 - u).ln() / lambda).round() as Ticks
            }
        }
    }
}

/// Validate an explicit process list and put it in arrival order.
fn static_workload(records: &[ProcessRecord]) -> SimResult<Vec<ProcessRecord>> {
    let mut seen = FxHashSet::default();
    for r in records {
        if r.id == 0 || !seen.insert(r.id) {
            return Err(SimError::InvalidConfiguration {
                field: "processes",
                reason: format!("process id {} is zero or duplicated", r.id),
            });
        }
        if r.burst_time == 0 {
            return Err(SimError::InvalidConfiguration {
                field: "processes",
                reason: format!("process {} has zero burst time", r.id),
            });
        }
    }

    let mut processes = records.to_vec();
    processes.sort_by_key(|p| (p.arrival_time, p.id));
    Ok(processes)
}

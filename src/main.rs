use std::path::PathBuf;

use clap::Parser;
use cpusim::{PolicyKind, SchedulerConfig, SchedulerEngine, SimResult, metrics, sim};
use tracing_subscriber::EnvFilter;

/// Simulate CPU scheduling policies over a generated workload.
#[derive(Parser)]
#[command(name = "cpusim", version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the configured generator seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override `scheduleAlgorithm`
    #[arg(short, long)]
    policy: Option<String>,

    /// Run the workload under every policy
    #[arg(long)]
    compare: bool,

    /// Print execution intervals
    #[arg(long)]
    timeline: bool,
}

fn main() -> SimResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = SchedulerConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(policy) = &args.policy {
        config.policy = policy.parse::<PolicyKind>()?;
    }

    let processes = sim::workload(&config)?;
    println!("Generated {} processes", processes.len());

    if args.compare {
        for report in sim::compare(&config, &processes)? {
            println!("\n{report}");
        }
        return Ok(());
    }

    let timeline = SchedulerEngine::from_config(&config).run(
        &processes,
        config.policy,
        config.time_quantum,
    )?;
    if args.timeline {
        for interval in &timeline.intervals {
            println!(
                "t=[{}, {}) pid={}",
                interval.start, interval.end, interval.pid
            );
        }
    }

    let report = metrics::summarize(&processes, &timeline)?;
    println!("\n{report}");
    Ok(())
}

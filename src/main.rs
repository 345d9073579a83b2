//! CLI comparing sequential and optimistic concurrent execution.

use clap::Parser;
use occ_bench::{
    ExecutionResult, Executor, LedgerSnapshot, OccExecutor, SequentialExecutor, Workload,
    WorkloadConfig,
};
use occ_executor::{SchedulerConfig, DEFAULT_MAX_ITERATIONS};
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "occ-bench")]
#[command(about = "Benchmark optimistic concurrent transfer execution against a sequential baseline")]
#[command(version)]
struct Cli {
    /// Number of funded accounts
    #[arg(long, default_value = "1000")]
    accounts: usize,

    /// Number of transfers per run
    #[arg(long, default_value = "1000")]
    transactions: usize,

    /// Transfers per block
    #[arg(long, default_value = "250")]
    block_size: usize,

    /// Conflict factors to run (comma-separated, 0.0 to 1.0)
    #[arg(long, value_delimiter = ',', default_value = "0,0.25,0.5,0.75,1")]
    conflicts: Vec<f64>,

    /// Worker threads per round (defaults to available parallelism, 0 = one per transaction)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Rounds before a block falls back to synchronous execution (0 disables)
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Skip signature verification
    #[arg(long)]
    no_verify: bool,

    /// Workload seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut scheduler_config = SchedulerConfig::default().with_max_iterations(cli.max_iterations);
    if let Some(workers) = cli.workers {
        scheduler_config = scheduler_config.with_workers(workers);
    }
    let verify = !cli.no_verify;
    let sequential = SequentialExecutor::new(verify);
    let occ = OccExecutor::with_config(scheduler_config.clone(), verify);

    println!("=== OCC Transfer Benchmark ===\n");
    println!(
        "Configuration: {} accounts, {} transfers, {} per block, {} workers, verify={}\n",
        cli.accounts, cli.transactions, cli.block_size, scheduler_config.workers, verify
    );

    let mut mismatches = 0;
    for &conflict_factor in &cli.conflicts {
        let config = WorkloadConfig {
            num_accounts: cli.accounts,
            num_transactions: cli.transactions,
            transactions_per_block: cli.block_size,
            conflict_factor,
            seed: cli.seed,
            chain_id: 1,
        };

        // Generate workload (includes signing).
        let workload = Workload::generate(config);
        let name = format!("{:.0}% conflicts", conflict_factor * 100.0);

        let (expected, seq_result, seq_elapsed) = run(&sequential, &workload)?;
        let (actual, occ_result, occ_elapsed) = run(&occ, &workload)?;

        report(&name, sequential.name(), &seq_result, seq_elapsed);
        report(&name, occ.name(), &occ_result, occ_elapsed);
        println!(
            "{:20} | {:5} rounds | {:5} retries | {} sync blocks | speedup {:.2}x\n",
            "",
            occ_result.rounds,
            occ_result.retries,
            occ_result.synchronous_blocks,
            seq_elapsed.as_secs_f64() / occ_elapsed.as_secs_f64().max(f64::EPSILON)
        );

        if expected != actual || seq_result.outcomes != occ_result.outcomes {
            error!(%name, "occ execution diverged from sequential execution");
            mismatches += 1;
        }
    }

    if mismatches > 0 {
        return Err(format!("{mismatches} run(s) diverged from sequential execution").into());
    }
    info!("all runs matched sequential execution");
    Ok(())
}

fn run<E: Executor>(
    executor: &E,
    workload: &Workload,
) -> Result<(LedgerSnapshot, ExecutionResult, Duration), occ_bench::BenchError> {
    let store = workload.create_store();
    let start = Instant::now();
    let (store, result) = executor.execute(store, workload)?;
    let elapsed = start.elapsed();
    Ok((store.snapshot(), result, elapsed))
}

fn report(name: &str, executor: &str, result: &ExecutionResult, elapsed: Duration) {
    let tps = result.total() as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!(
        "{:20} | {:10} | {:5} successful | {:5} failed | {:8.2} ms | {:8.0} tx/s",
        name,
        executor,
        result.successful,
        result.failed,
        elapsed.as_secs_f64() * 1000.0,
        tps
    );
}

//! Fork-join measurement harness.
//!
//! One *trial* partitions a fixed operation count across `workers` OS
//! threads, fans them out, joins them all, and records the wall time
//! spent between fan-out and join. A *sweep* repeats each thread-count
//! configuration several times and reports the mean per configuration.
//! Configurations run strictly one after another so their timings never
//! interfere.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub profile: Profile,
    pub seed: u64,
}

impl BenchConfig {
    /// Thread counts swept by default. `Full` is the real measurement
    /// campaign; `Quick` is smoke-sized.
    pub fn thread_sweep(&self) -> Vec<usize> {
        match self.profile {
            Profile::Quick => vec![1, 2, 4, 8],
            Profile::Full => vec![1, 2, 4, 6, 8, 10, 12, 14, 16],
        }
    }

    /// Total operations shared by all workers of one configuration.
    pub fn total_ops(&self) -> usize {
        match self.profile {
            Profile::Quick => 64,
            Profile::Full => 1_000,
        }
    }

    pub fn repeats(&self) -> usize {
        match self.profile {
            Profile::Quick => 3,
            Profile::Full => 10,
        }
    }

    /// The build-tool sweep is slower per trial and uses fewer repeats.
    pub fn build_repeats(&self) -> usize {
        match self.profile {
            Profile::Quick => 2,
            Profile::Full => 5,
        }
    }
}

/// One sweep over thread counts, fully resolved from profile defaults
/// and command-line overrides before the first trial runs.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    pub threads: Vec<usize>,
    pub total_ops: usize,
    pub repeats: usize,
}

impl SweepConfig {
    pub fn validate(&self) -> io::Result<()> {
        if self.threads.is_empty() {
            return Err(io::Error::other("thread sweep must not be empty"));
        }
        if self.threads.contains(&0) {
            return Err(io::Error::other("worker count must be at least 1"));
        }
        if self.repeats == 0 {
            return Err(io::Error::other("repeat count must be at least 1"));
        }
        Ok(())
    }
}

/// One worker's contiguous share of the operation space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerAssignment {
    /// Worker index, `0..workers`.
    pub index: usize,
    /// First global operation index owned by this worker.
    pub start: usize,
    /// Number of operations owned by this worker.
    pub count: usize,
}

/// Splits `total_ops` across `workers` by floor division.
///
/// Worker `i` owns `total_ops / workers` operations starting at
/// `i * share`. When the division is not exact, the trailing
/// `total_ops % workers` operations belong to nobody and are never
/// executed: the per-worker mean only makes sense when every worker
/// does identical work, so the remainder stays dropped rather than
/// being handed to one unlucky worker.
pub fn partition(total_ops: usize, workers: usize) -> io::Result<Vec<WorkerAssignment>> {
    if workers == 0 {
        return Err(io::Error::other("worker count must be at least 1"));
    }
    let share = total_ops / workers;
    Ok((0..workers)
        .map(|index| WorkerAssignment {
            index,
            start: index * share,
            count: share,
        })
        .collect())
}

/// Everything one worker sees for one trial.
#[derive(Clone, Copy, Debug)]
pub struct WorkerCtx<'a> {
    /// Total workers in this trial; part of the destination namespace.
    pub workers: usize,
    pub assignment: WorkerAssignment,
    /// Per-trial scratch directory, when the scope policy created one.
    pub scratch: Option<&'a Path>,
}

/// The operation under test. Implementations perform
/// `ctx.assignment.count` sequential invocations of the underlying
/// primitive, deriving distinct per-operation paths or arguments from
/// `ctx.assignment.start + k` and from `(ctx.workers, ctx.assignment.index)`
/// so that concurrent workers never touch the same target.
///
/// Failures are not handled here; the first error aborts the trial and
/// the whole sweep.
pub trait Operation: Sync {
    fn execute(&self, ctx: &WorkerCtx<'_>) -> io::Result<()>;

    /// Noun used in the per-configuration report line.
    fn unit_label(&self) -> &'static str {
        "operations"
    }
}

/// Whether the trial runner manages an isolated scratch directory.
///
/// The spawn variants keep each worker's result files under one
/// directory per trial. The copy variants manage their own per-worker
/// destination directories inside the timed window instead and use
/// `None` here. Which side of the timing boundary setup falls on is
/// part of each variant's measurement definition, so it is a
/// per-variant flag rather than unified behavior.
#[derive(Clone, Debug)]
pub enum ScratchScope {
    /// The plugin owns its destination paths entirely.
    None,
    /// One directory per trial under `root`, named
    /// `{workers}_{ops_per_worker}_{repeat}`.
    PerTrial {
        root: PathBuf,
        setup_inside_timed_window: bool,
    },
}

/// Wall time of one trial, plus the shape it was run with.
#[derive(Clone, Copy, Debug)]
pub struct TrialResult {
    pub workers: usize,
    pub ops_per_worker: usize,
    pub elapsed: Duration,
}

/// Mean over all repeats of one thread-count configuration.
#[derive(Clone, Copy, Debug)]
pub struct AggregateResult {
    pub workers: usize,
    pub ops_per_worker: usize,
    pub repeats: usize,
    pub mean_elapsed_s: f64,
}

fn fan_out(
    workers: usize,
    assignments: &[WorkerAssignment],
    plugin: &dyn Operation,
    scratch: Option<&Path>,
) -> io::Result<()> {
    thread::scope(|scope| {
        let handles: Vec<_> = assignments
            .iter()
            .map(|&assignment| {
                scope.spawn(move || {
                    let ctx = WorkerCtx {
                        workers,
                        assignment,
                        scratch,
                    };
                    plugin.execute(&ctx)
                })
            })
            .collect();

        // Join every worker before reporting the first failure, so the
        // caller's timer always covers the full fork-join span.
        let mut first_err = Ok(());
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_err.is_ok() {
                        first_err = Err(e);
                    }
                }
                Err(_) => {
                    if first_err.is_ok() {
                        first_err = Err(io::Error::other("worker thread panicked"));
                    }
                }
            }
        }
        first_err
    })
}

/// Runs one timed trial: partition, optional scratch setup, fan out
/// `workers` threads, join them all, read the clock.
///
/// On success the scratch directory (if any) is removed outside the
/// timed window. On failure it is left in place so the run can be
/// inspected.
pub fn run_trial(
    workers: usize,
    total_ops: usize,
    repeat: usize,
    plugin: &dyn Operation,
    scratch: &ScratchScope,
) -> io::Result<TrialResult> {
    let assignments = partition(total_ops, workers)?;
    let ops_per_worker = total_ops / workers;

    let (scratch_dir, setup_inside) = match scratch {
        ScratchScope::None => (None, false),
        ScratchScope::PerTrial {
            root,
            setup_inside_timed_window,
        } => {
            let dir = root.join(format!("{workers}_{ops_per_worker}_{repeat}"));
            if !setup_inside_timed_window {
                fs::create_dir_all(&dir)?;
            }
            (Some(dir), *setup_inside_timed_window)
        }
    };

    let start = Instant::now();
    if setup_inside {
        if let Some(dir) = &scratch_dir {
            fs::create_dir_all(dir)?;
        }
    }
    let outcome = fan_out(workers, &assignments, plugin, scratch_dir.as_deref());
    let elapsed = start.elapsed();

    outcome?;

    if let Some(dir) = &scratch_dir {
        fs::remove_dir_all(dir)?;
    }

    Ok(TrialResult {
        workers,
        ops_per_worker,
        elapsed,
    })
}

/// Arithmetic mean of the trial durations; no outlier handling.
pub fn aggregate(trials: &[TrialResult]) -> io::Result<AggregateResult> {
    let first = trials
        .first()
        .ok_or_else(|| io::Error::other("cannot aggregate zero trials"))?;
    let total: f64 = trials.iter().map(|t| t.elapsed.as_secs_f64()).sum();
    Ok(AggregateResult {
        workers: first.workers,
        ops_per_worker: first.ops_per_worker,
        repeats: trials.len(),
        mean_elapsed_s: total / trials.len() as f64,
    })
}

/// Human-readable summary, one line per thread-count configuration.
pub fn report_line(agg: &AggregateResult, unit_label: &str) -> String {
    format!(
        "{} threads, each thread doing {} {}, took {:.4} seconds",
        agg.workers, agg.ops_per_worker, unit_label, agg.mean_elapsed_s
    )
}

/// Drives a full sweep: for each thread count, `repeats` back-to-back
/// trials, then one report line to stdout. Configurations never
/// overlap; the first failing trial aborts everything, so the lines
/// already printed cover exactly the configurations that completed.
pub fn run_sweep(
    sweep: &SweepConfig,
    plugin: &dyn Operation,
    scratch: &ScratchScope,
) -> io::Result<Vec<AggregateResult>> {
    sweep.validate()?;

    let mut results = Vec::with_capacity(sweep.threads.len());
    for &workers in &sweep.threads {
        let mut trials = Vec::with_capacity(sweep.repeats);
        for repeat in 0..sweep.repeats {
            trials.push(run_trial(
                workers,
                sweep.total_ops,
                repeat,
                plugin,
                scratch,
            )?);
        }
        let agg = aggregate(&trials)?;
        println!("{}", report_line(&agg, plugin.unit_label()));
        results.push(agg);
    }
    Ok(results)
}

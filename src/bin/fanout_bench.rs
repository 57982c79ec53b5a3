use clap::{Parser, Subcommand, ValueEnum};
use fanout_bench::benches;
use fanout_bench::harness::{BenchConfig, Profile, SweepConfig};
use fanout_bench::schema::{FanoutBenchReport, RunMeta};
use fanout_bench::sources::{self, GenerateConfig};
use fanout_bench::{CopyMode, SpawnMode};
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// File-copy scaling sweep over the configured thread counts.
    Copy {
        /// Directory holding the generated source files.
        #[arg(long, value_name = "DIR")]
        src_dir: PathBuf,

        /// Root for the per-worker destination directories.
        #[arg(long, value_name = "DIR")]
        dest_root: PathBuf,

        #[arg(long, value_enum, default_value_t = CopyMode::Local)]
        mode: CopyMode,

        /// SHA-256 every copy against its source after the sweep (untimed).
        #[arg(long, default_value_t = false)]
        verify: bool,
    },

    /// Process-spawn scaling sweep.
    Spawn {
        /// Short-lived executable launched once per operation.
        #[arg(long, value_name = "PATH")]
        exe: PathBuf,

        /// Single argument passed to the executable (e.g. a sleep interval).
        #[arg(long)]
        arg: Option<String>,

        #[arg(long, value_enum, default_value_t = SpawnMode::Direct)]
        mode: SpawnMode,

        /// Root for per-trial scratch directories.
        #[arg(long, value_name = "DIR", default_value = "scratch")]
        scratch_root: PathBuf,
    },

    /// Build-tool scheduler sweep: `--clean` untimed, `--threads=N` timed.
    BuildTool {
        /// The build-orchestration executable.
        #[arg(long, value_name = "PATH")]
        tool: PathBuf,

        /// Directory receiving per-thread-count build logs.
        #[arg(long, value_name = "DIR", default_value = "logs")]
        log_dir: PathBuf,
    },

    /// Run the copy and spawn sweeps, plus the build tool when given.
    Suite {
        #[arg(long, value_name = "DIR")]
        src_dir: PathBuf,

        #[arg(long, value_name = "DIR")]
        dest_root: PathBuf,

        #[arg(long, value_name = "PATH")]
        exe: PathBuf,

        #[arg(long)]
        arg: Option<String>,

        #[arg(long, value_name = "DIR", default_value = "scratch")]
        scratch_root: PathBuf,

        #[arg(long, value_name = "PATH")]
        tool: Option<PathBuf>,

        #[arg(long, value_name = "DIR", default_value = "logs")]
        log_dir: PathBuf,
    },

    /// Generate a deterministic tree of source files for the copy sweeps.
    GenerateSources {
        /// Number of files to generate.
        #[arg(long, short = 'n', default_value_t = 1_000)]
        count: usize,

        /// Output directory for the generated files.
        #[arg(long, short = 'o', value_name = "DIR")]
        output: PathBuf,

        /// Approximate size of each file in bytes.
        #[arg(long, default_value_t = 4_096)]
        bytes_per_file: usize,
    },

    /// Show file count and total size for a generated source tree.
    SourcesInfo {
        #[arg(value_name = "DIR")]
        path: PathBuf,
    },
}

#[derive(Parser, Debug)]
#[command(name = "fanout-bench")]
#[command(about = "Fork-join scaling benchmarks for copy and spawn primitives (JSON output)")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    /// Override the profile's thread sweep, e.g. `--threads 1,2,4`.
    #[arg(long, global = true, value_delimiter = ',')]
    threads: Option<Vec<usize>>,

    /// Override the total operation count per configuration.
    #[arg(long, global = true)]
    ops: Option<usize>,

    /// Override the repeat count per configuration.
    #[arg(long, global = true)]
    repeats: Option<usize>,

    /// Where to write the JSON report. If omitted, prints to stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

impl Args {
    fn sweep(&self, cfg: &BenchConfig) -> SweepConfig {
        SweepConfig {
            threads: self.threads.clone().unwrap_or_else(|| cfg.thread_sweep()),
            total_ops: self.ops.unwrap_or_else(|| cfg.total_ops()),
            repeats: self.repeats.unwrap_or_else(|| cfg.repeats()),
        }
    }

    fn build_threads(&self, cfg: &BenchConfig) -> Vec<usize> {
        self.threads.clone().unwrap_or_else(|| cfg.thread_sweep())
    }

    fn build_repeats(&self, cfg: &BenchConfig) -> usize {
        self.repeats.unwrap_or_else(|| cfg.build_repeats())
    }
}

fn now_utc_rfc3339() -> String {
    // Avoid a chrono dependency; good enough for filenames + reports.
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    // Best-effort: read from environment set by CI/build scripts.
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let cfg = BenchConfig {
        profile: args.profile.into(),
        seed: args.seed,
    };

    let mut measurements = Vec::new();

    match &args.cmd {
        Command::Copy {
            src_dir,
            dest_root,
            mode,
            verify,
        } => {
            let c_args = benches::copy::CopyArgs {
                src_dir: src_dir.clone(),
                dest_root: dest_root.clone(),
                mode: *mode,
                verify: *verify,
            };
            measurements.extend(benches::copy::run(&args.sweep(&cfg), &c_args)?);
        }
        Command::Spawn {
            exe,
            arg,
            mode,
            scratch_root,
        } => {
            let s_args = benches::spawn::SpawnArgs {
                exe: exe.clone(),
                arg: arg.clone(),
                mode: *mode,
                scratch_root: scratch_root.clone(),
            };
            measurements.extend(benches::spawn::run(&args.sweep(&cfg), &s_args)?);
        }
        Command::BuildTool { tool, log_dir } => {
            let b_args = benches::build_tool::BuildToolArgs {
                tool: tool.clone(),
                log_dir: log_dir.clone(),
                threads: args.build_threads(&cfg),
                repeats: args.build_repeats(&cfg),
            };
            measurements.extend(benches::build_tool::run(&b_args)?);
        }
        Command::Suite {
            src_dir,
            dest_root,
            exe,
            arg,
            scratch_root,
            tool,
            log_dir,
        } => {
            let sweep = args.sweep(&cfg);

            for mode in [CopyMode::Local, CopyMode::Shell] {
                let c_args = benches::copy::CopyArgs {
                    src_dir: src_dir.clone(),
                    dest_root: dest_root.clone(),
                    mode,
                    verify: false,
                };
                measurements.extend(benches::copy::run(&sweep, &c_args)?);
            }

            for mode in [SpawnMode::Direct, SpawnMode::Shell, SpawnMode::ShellRedirect] {
                let s_args = benches::spawn::SpawnArgs {
                    exe: exe.clone(),
                    arg: arg.clone(),
                    mode,
                    scratch_root: scratch_root.clone(),
                };
                measurements.extend(benches::spawn::run(&sweep, &s_args)?);
            }

            if let Some(tool) = tool {
                let b_args = benches::build_tool::BuildToolArgs {
                    tool: tool.clone(),
                    log_dir: log_dir.clone(),
                    threads: args.build_threads(&cfg),
                    repeats: args.build_repeats(&cfg),
                };
                measurements.extend(benches::build_tool::run(&b_args)?);
            }
        }
        Command::GenerateSources {
            count,
            output,
            bytes_per_file,
        } => {
            let gen_config = GenerateConfig {
                count: *count,
                bytes_per_file: *bytes_per_file,
                seed: cfg.seed,
            };

            eprintln!(
                "Generating {} source files ({} bytes each, seed={})...",
                count, bytes_per_file, cfg.seed
            );

            let start = std::time::Instant::now();
            sources::generate_sources(output, &gen_config)?;
            let elapsed = start.elapsed();

            let total = sources::total_source_bytes(output)?;
            eprintln!(
                "Wrote {:.2} MB in {:.2}s ({:.0} files/s)",
                total as f64 / 1_048_576.0,
                elapsed.as_secs_f64(),
                (*count as f64) / elapsed.as_secs_f64()
            );
            eprintln!("\nSources saved: {}", output.display());

            // Skip the normal JSON report for generate-sources.
            return Ok(());
        }
        Command::SourcesInfo { path } => {
            let count = sources::count_sources(path)?;
            let total = sources::total_source_bytes(path)?;
            eprintln!("Sources: {}", path.display());
            eprintln!("  Files: {count}");
            eprintln!("  Total size: {:.2} MB", total as f64 / 1_048_576.0);

            // Skip the normal JSON report.
            return Ok(());
        }
    }

    let report = FanoutBenchReport {
        run: RunMeta {
            schema_version: 1,
            bench_version: env!("CARGO_PKG_VERSION").to_string(),
            profile: cfg.profile.as_str().to_string(),
            seed: cfg.seed,
            timestamp_utc: now_utc_rfc3339(),
            git_sha: git_sha_short(),
        },
        measurements,
    };

    let json = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
    if let Some(out) = args.out {
        fs::write(out, json)?;
    } else {
        println!("{json}");
    }

    Ok(())
}

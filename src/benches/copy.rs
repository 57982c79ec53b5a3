//! File-copy scaling sweeps: in-process `fs::copy` versus one shell
//! process per file.
//!
//! Each worker copies its share of operation-indexed source files into
//! a destination directory namespaced by `(workers, worker index)`.
//! The worker resets and recreates that directory at worker start, so
//! directory setup is part of the measured window for these variants,
//! and the copies persist after the sweep.

use crate::harness::{run_sweep, Operation, ScratchScope, SweepConfig, WorkerCtx};
use crate::schema::Measurement;
use crate::sources;
use crate::CopyMode;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

#[derive(Clone, Debug)]
pub struct CopyArgs {
    pub src_dir: PathBuf,
    pub dest_root: PathBuf,
    pub mode: CopyMode,
    pub verify: bool,
}

/// Destination directory for one worker of one configuration.
fn worker_dest_dir(dest_root: &Path, workers: usize, index: usize) -> PathBuf {
    dest_root.join(format!("{}_{}", workers, index + 1))
}

fn reset_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

struct LocalCopyOp {
    src_dir: PathBuf,
    dest_root: PathBuf,
}

impl Operation for LocalCopyOp {
    fn execute(&self, ctx: &WorkerCtx<'_>) -> io::Result<()> {
        let dest = worker_dest_dir(&self.dest_root, ctx.workers, ctx.assignment.index);
        reset_dir(&dest)?;
        for k in 0..ctx.assignment.count {
            let i = ctx.assignment.start + k;
            let src = self.src_dir.join(sources::source_file_name(i));
            fs::copy(&src, dest.join(sources::object_file_name(i)))?;
        }
        Ok(())
    }

    fn unit_label(&self) -> &'static str {
        "file-copies"
    }
}

struct ShellCopyOp {
    src_dir: PathBuf,
    dest_root: PathBuf,
}

impl Operation for ShellCopyOp {
    fn execute(&self, ctx: &WorkerCtx<'_>) -> io::Result<()> {
        let dest = worker_dest_dir(&self.dest_root, ctx.workers, ctx.assignment.index);
        reset_dir(&dest)?;
        for k in 0..ctx.assignment.count {
            let i = ctx.assignment.start + k;
            let src = self.src_dir.join(sources::source_file_name(i));
            let dst = dest.join(sources::object_file_name(i));
            let command = format!("cp {} {}", src.display(), dst.display());
            let status = Command::new("sh").arg("-c").arg(&command).status()?;
            if !status.success() {
                return Err(io::Error::other(format!("`{command}` exited with {status}")));
            }
        }
        Ok(())
    }

    fn unit_label(&self) -> &'static str {
        "file-copies"
    }
}

/// SHA-256 every `.obj` under `dest_root` against its source. Untimed
/// post-pass; returns the number of files checked.
fn verify_copies(src_dir: &Path, dest_root: &Path) -> io::Result<usize> {
    let mut checked = 0;
    for entry in WalkDir::new(dest_root) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() || entry.path().extension().is_none_or(|e| e != "obj") {
            continue;
        }
        let stem = entry
            .path()
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| io::Error::other("unexpected file name in destination tree"))?;
        let src = src_dir.join(format!("{stem}.{}", sources::SOURCE_EXT));

        let src_digest = Sha256::digest(fs::read(&src)?);
        let dst_digest = Sha256::digest(fs::read(entry.path())?);
        if src_digest != dst_digest {
            return Err(io::Error::other(format!(
                "copy {} does not match its source",
                entry.path().display()
            )));
        }
        checked += 1;
    }
    Ok(checked)
}

pub fn run(sweep: &SweepConfig, args: &CopyArgs) -> io::Result<Vec<Measurement>> {
    let available = sources::count_sources(&args.src_dir)?;
    if available < sweep.total_ops {
        return Err(io::Error::other(format!(
            "need {} source files in {}, found {}",
            sweep.total_ops,
            args.src_dir.display(),
            available
        )));
    }

    let (name, subdir) = match args.mode {
        CopyMode::Local => ("copy.local", "copies"),
        CopyMode::Shell => ("copy.shell", "shell_copies"),
    };
    let dest_root = args.dest_root.join(subdir);

    let plugin: Box<dyn Operation> = match args.mode {
        CopyMode::Local => Box::new(LocalCopyOp {
            src_dir: args.src_dir.clone(),
            dest_root: dest_root.clone(),
        }),
        CopyMode::Shell => Box::new(ShellCopyOp {
            src_dir: args.src_dir.clone(),
            dest_root: dest_root.clone(),
        }),
    };

    let aggregates = run_sweep(sweep, plugin.as_ref(), &ScratchScope::None)?;

    let verified = if args.verify {
        let checked = verify_copies(&args.src_dir, &dest_root)?;
        eprintln!("verified {checked} copies against their sources");
        Some(checked)
    } else {
        None
    };

    Ok(aggregates
        .iter()
        .map(|agg| {
            Measurement::from_aggregate(
                name,
                agg,
                json!({
                    "src_dir": args.src_dir.to_string_lossy(),
                    "dest_root": dest_root.to_string_lossy(),
                    "verified": verified,
                }),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::run_trial;
    use crate::sources::{generate_sources, GenerateConfig};
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn worker_destinations_never_collide() {
        let root = Path::new("/scratch");
        let mut seen = HashSet::new();
        for workers in 1..=16 {
            for index in 0..workers {
                assert!(
                    seen.insert(worker_dest_dir(root, workers, index)),
                    "duplicate destination for {workers} workers, worker {index}"
                );
            }
        }
    }

    #[test]
    fn local_copy_trial_produces_per_worker_objects() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        generate_sources(
            src.path(),
            &GenerateConfig {
                count: 8,
                bytes_per_file: 128,
                seed: 3,
            },
        )
        .unwrap();

        let op = LocalCopyOp {
            src_dir: src.path().to_path_buf(),
            dest_root: dest.path().to_path_buf(),
        };
        run_trial(2, 8, 0, &op, &ScratchScope::None).unwrap();

        // Worker 0 owns ops 0..4, worker 1 owns 4..8.
        assert!(dest.path().join("2_1").join("unit_0000.obj").is_file());
        assert!(dest.path().join("2_1").join("unit_0003.obj").is_file());
        assert!(dest.path().join("2_2").join("unit_0004.obj").is_file());
        assert!(dest.path().join("2_2").join("unit_0007.obj").is_file());
        assert!(!dest.path().join("2_1").join("unit_0004.obj").exists());
    }

    #[test]
    fn verify_detects_matching_copies() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        generate_sources(
            src.path(),
            &GenerateConfig {
                count: 4,
                bytes_per_file: 64,
                seed: 5,
            },
        )
        .unwrap();

        let op = LocalCopyOp {
            src_dir: src.path().to_path_buf(),
            dest_root: dest.path().to_path_buf(),
        };
        run_trial(1, 4, 0, &op, &ScratchScope::None).unwrap();

        assert_eq!(verify_copies(src.path(), dest.path()).unwrap(), 4);
    }

    #[test]
    fn run_rejects_short_source_tree() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let sweep = SweepConfig {
            threads: vec![1],
            total_ops: 10,
            repeats: 1,
        };
        let args = CopyArgs {
            src_dir: src.path().to_path_buf(),
            dest_root: dest.path().to_path_buf(),
            mode: CopyMode::Local,
            verify: false,
        };
        assert!(run(&sweep, &args).is_err());
    }
}

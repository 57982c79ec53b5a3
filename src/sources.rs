//! Source-file provisioning for the copy benchmarks.
//!
//! The copy sweeps read operation-indexed source files (`unit_0000.src`,
//! `unit_0001.src`, ...) from a directory the user supplies. This module
//! generates that tree deterministically so runs on different machines
//! copy byte-identical inputs.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Extension of generated source files.
pub const SOURCE_EXT: &str = "src";

/// Configuration for source tree generation.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Number of files to generate.
    pub count: usize,
    /// Approximate size of each file in bytes.
    pub bytes_per_file: usize,
    /// Random seed for deterministic content.
    pub seed: u64,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            count: 1_000,
            bytes_per_file: 4 * 1024,
            seed: 42,
        }
    }
}

/// Name of the source file for global operation index `i`.
pub fn source_file_name(i: usize) -> String {
    format!("unit_{i:04}.{SOURCE_EXT}")
}

/// Name of the copy target for global operation index `i`.
pub fn object_file_name(i: usize) -> String {
    format!("unit_{i:04}.obj")
}

fn per_file_seed(master_seed: u64, index: usize) -> u64 {
    master_seed
        .wrapping_add(index as u64)
        .wrapping_mul(0x517cc1b727220a95)
}

fn file_content(rng: &mut ChaCha8Rng, index: usize, bytes: usize) -> String {
    let mut alphabet: Vec<u8> = (b'0'..=b'9').chain(b'a'..=b'f').collect();
    let mut content = String::with_capacity(bytes + 64);
    content.push_str(&format!("// unit {index}\n"));
    let mut line = 0usize;
    while content.len() < bytes {
        alphabet.shuffle(rng);
        let token: String = alphabet.iter().map(|&b| b as char).collect();
        content.push_str(&format!("static x{line} = \"{token}\";\n"));
        line += 1;
    }
    content
}

/// Generate `cfg.count` source files under `dir`.
///
/// Files are generated in parallel with per-file RNGs derived from the
/// master seed, so the output is independent of thread scheduling.
pub fn generate_sources(dir: &Path, cfg: &GenerateConfig) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    (0..cfg.count).into_par_iter().try_for_each(|i| {
        let mut rng = ChaCha8Rng::seed_from_u64(per_file_seed(cfg.seed, i));
        let content = file_content(&mut rng, i, cfg.bytes_per_file);
        fs::write(dir.join(source_file_name(i)), content)
    })
}

/// Counts `.src` files directly or indirectly under `dir`.
pub fn count_sources(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|e| e == SOURCE_EXT)
        {
            count += 1;
        }
    }
    Ok(count)
}

/// Total size in bytes of the `.src` files under `dir`.
pub fn total_source_bytes(dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|e| e == SOURCE_EXT)
        {
            total += entry.metadata().map_err(io::Error::other)?.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generates_requested_count() {
        let dir = TempDir::new().unwrap();
        let cfg = GenerateConfig {
            count: 12,
            bytes_per_file: 256,
            seed: 7,
        };
        generate_sources(dir.path(), &cfg).unwrap();
        assert_eq!(count_sources(dir.path()).unwrap(), 12);
        assert!(dir.path().join(source_file_name(0)).is_file());
        assert!(dir.path().join(source_file_name(11)).is_file());
    }

    #[test]
    fn generation_is_deterministic() {
        let cfg = GenerateConfig {
            count: 3,
            bytes_per_file: 512,
            seed: 99,
        };
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        generate_sources(a.path(), &cfg).unwrap();
        generate_sources(b.path(), &cfg).unwrap();
        for i in 0..3 {
            let name = source_file_name(i);
            let left = fs::read(a.path().join(&name)).unwrap();
            let right = fs::read(b.path().join(&name)).unwrap();
            assert_eq!(left, right, "{name} differs between runs");
        }
    }

    #[test]
    fn file_sizes_are_at_least_requested() {
        let dir = TempDir::new().unwrap();
        let cfg = GenerateConfig {
            count: 2,
            bytes_per_file: 1_024,
            seed: 1,
        };
        generate_sources(dir.path(), &cfg).unwrap();
        assert!(total_source_bytes(dir.path()).unwrap() >= 2 * 1_024);
    }
}

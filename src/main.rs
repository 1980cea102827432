use std::collections::BTreeSet;
use std::fs::create_dir_all;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Result, ensure};
use chrono::Local;
use clap::{Parser, ValueEnum};
use merkle_log::{HashAlgorithm, Hasher, Tree, splitmix64};
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::stat::Report;

mod stat;

#[derive(Parser)]
#[command(name = "merkle-bench")]
#[command(author, version, about = "Measure append, proof and consistency costs of the Merkle log")]
struct Args {
  /// Largest number of leaves to measure
  #[arg(default_value_t = 1u64 << 14)]
  data_size: u64,

  /// Number of tree sizes measured between 0 and the data size
  #[arg(short, long, default_value_t = 16)]
  division: u64,

  /// Repetitions of every measurement
  #[arg(short, long, default_value_t = 5)]
  trials: usize,

  /// Random leaves and historical sizes probed per trial
  #[arg(short, long, default_value_t = 64)]
  probes: usize,

  #[arg(short, long, value_enum, default_value_t = Algorithm::Blake3)]
  algorithm: Algorithm,

  /// Output directory for the CSV report
  #[arg(short, long, default_value = ".")]
  output: PathBuf,

  #[arg(short, long, default_value_t = Local::now().format("%Y%m%d%H%M%S").to_string())]
  session: String,

  #[arg(short, long, default_value_t = false)]
  verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Algorithm {
  Blake3,
  Sha256,
}

impl From<Algorithm> for HashAlgorithm {
  fn from(algorithm: Algorithm) -> Self {
    match algorithm {
      Algorithm::Blake3 => HashAlgorithm::Blake3,
      Algorithm::Sha256 => HashAlgorithm::Sha256,
    }
  }
}

fn main() -> Result<()> {
  let args = Args::parse();

  let level = if args.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt().with_env_filter(filter).init();

  create_dir_all(&args.output)?;
  let algorithm = HashAlgorithm::from(args.algorithm);
  let hasher = Hasher::from_algorithm(algorithm);
  info!(session = %args.session, %algorithm, data_size = args.data_size, "start");

  let mut report = Report::new();
  let mut rng = rand::rng();
  let step = (args.data_size / args.division.max(1)).max(1);
  for n in (step..=args.data_size).step_by(step as usize) {
    for _ in 0..args.trials {
      measure(&hasher, n, args.probes, &mut rng, &mut report)?;
    }
    for operation in OPERATIONS {
      if let Some(s) = report.single(operation, n) {
        info!("  {operation} n={n}: {s}");
      }
    }
  }

  let path = args.output.join(format!("{}-{algorithm}.csv", args.session));
  report.save_to_csv(&path)?;
  info!("==> {}", path.display());
  Ok(())
}

const OPERATIONS: [&str; 4] = ["append", "extend", "prove", "consistency"];

/// One trial at size `n`: append one by one while recording historical roots, batch build the
/// same items, then probe proofs and consistency against the recorded roots.
fn measure<R: Rng>(hasher: &Hasher, n: u64, probes: usize, rng: &mut R, report: &mut Report) -> Result<()> {
  let items = (1..=n).map(|i| splitmix64(i).to_le_bytes()).collect::<Vec<_>>();
  let checkpoints = (0..probes).map(|_| rng.random_range(0..=n)).collect::<BTreeSet<_>>();

  let mut tree = Tree::new(hasher.clone());
  let mut roots = Vec::with_capacity(checkpoints.len());
  let mut elapsed = Duration::ZERO;
  for (i, item) in items.iter().enumerate() {
    if checkpoints.contains(&(i as u64)) {
      roots.push((i as u64, tree.root().unwrap_or_default().to_vec()));
    }
    let start = Instant::now();
    tree.append(item)?;
    elapsed += start.elapsed();
  }
  if checkpoints.contains(&n) {
    roots.push((n, tree.root().unwrap_or_default().to_vec()));
  }
  report.add("append", n, elapsed);

  let start = Instant::now();
  let mut batch = Tree::new(hasher.clone());
  batch.extend(&items)?;
  report.add("extend", n, start.elapsed());
  ensure!(batch.root() == tree.root(), "append and extend disagree at n={n}");

  if n > 1 && probes > 0 {
    let root = tree.root().unwrap_or_default();
    let start = Instant::now();
    for _ in 0..probes {
      let item = &items[rng.random_range(0..items.len())];
      let proof = tree.get_proof(item)?;
      ensure!(proof.verify(item, hasher, root)?, "proof rejected at n={n}");
    }
    report.add("prove", n, start.elapsed() / probes as u32);
  }

  if !roots.is_empty() {
    let start = Instant::now();
    for (size, root) in roots.iter() {
      ensure!(tree.verify_tree_consistency(root, *size), "inconsistent root for size {size} at n={n}");
    }
    report.add("consistency", n, start.elapsed() / roots.len() as u32);
  }
  Ok(())
}

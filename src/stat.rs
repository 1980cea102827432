use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Summary of repeated measurements, in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
  pub count: usize,
  pub mean: f64,
  pub median: f64,
  pub std_dev: f64,
  pub min: f64,
  pub max: f64,
}

impl Stat {
  pub fn from_samples(samples: &[f64]) -> Stat {
    if samples.is_empty() {
      return Stat { count: 0, mean: f64::NAN, median: f64::NAN, std_dev: f64::NAN, min: f64::NAN, max: f64::NAN };
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let mid = count / 2;
    let median = if count % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] };
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
    Stat { count, mean, median, std_dev: variance.sqrt(), min: sorted[0], max: sorted[count - 1] }
  }
}

impl Display for Stat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    // 2σ relative to the mean
    let spread = if self.mean > 0.0 { 200.0 * self.std_dev / self.mean } else { 0.0 };
    write!(f, "{}: {:.3}ms ±{:.1}% [{:.3}|{:.3}|{:.3}]", self.count, self.mean, spread, self.min, self.median, self.max)
  }
}

/// Timings grouped by operation name and tree size.
#[derive(Default)]
pub struct Report {
  samples: BTreeMap<(&'static str, u64), Vec<f64>>,
}

impl Report {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, operation: &'static str, n: u64, elapsed: Duration) {
    self.samples.entry((operation, n)).or_default().push(elapsed.as_nanos() as f64 / 1e6);
  }

  pub fn single(&self, operation: &'static str, n: u64) -> Option<Stat> {
    self.samples.get(&(operation, n)).map(|samples| Stat::from_samples(samples))
  }

  pub fn save_to_csv(&self, path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "OP,N,COUNT,MEAN,MEDIAN,STDDEV,MIN,MAX")?;
    for ((operation, n), samples) in self.samples.iter() {
      let s = Stat::from_samples(samples);
      writeln!(
        writer,
        "{},{},{},{:.6},{:.6},{:.6},{:.6},{:.6}",
        operation, n, s.count, s.mean, s.median, s.std_dev, s.min, s.max
      )?;
    }
    writer.flush()
  }
}

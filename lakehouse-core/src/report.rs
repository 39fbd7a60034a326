//! Measurements and the plain-text report.
//!
//! Every measured step prints one line:
//! `<label> - <metric>=<value>[, <metric>=<value>] in <duration> sec`
//! with the duration in seconds at microsecond resolution. Steps that compute nothing
//! (loading the dataset into memory) print `<label> in <duration> sec`.

use std::{fmt, time::Duration};

use thiserror::Error;

use crate::StrategyKind;

/// A scalar pulled out of a single-row aggregate result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
  Int(i64),
  Float(f64),
  Null,
}

impl MetricValue {
  /// Integers compare exactly, anything involving a float compares within `tolerance`
  /// relative to the larger magnitude (absolute below 1.0). `Null` only matches `Null`.
  pub fn approx_eq(&self, other: &MetricValue, tolerance: f64) -> bool {
    match (self, other) {
      (MetricValue::Null, MetricValue::Null) => true,
      (MetricValue::Null, _) | (_, MetricValue::Null) => false,
      (MetricValue::Int(a), MetricValue::Int(b)) => a == b,
      (a, b) => {
        let (a, b) = (a.as_f64(), b.as_f64());
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() <= tolerance * scale
      }
    }
  }

  fn as_f64(&self) -> f64 {
    match self {
      MetricValue::Int(v) => *v as f64,
      MetricValue::Float(v) => *v,
      MetricValue::Null => f64::NAN,
    }
  }
}

impl fmt::Display for MetricValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MetricValue::Int(v) => write!(f, "{v}"),
      MetricValue::Float(v) => write!(f, "{v}"),
      MetricValue::Null => f.write_str("NULL"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
  pub name: String,
  pub value: MetricValue,
}

impl Metric {
  pub fn new(name: impl Into<String>, value: MetricValue) -> Self {
    Metric {
      name: name.into(),
      value,
    }
  }
}

/// Report sections; a heading is printed whenever the section changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
  Files,
  InMemory,
}

impl Section {
  pub fn heading(&self) -> &'static str {
    match self {
      Section::Files => "Querying Parquet files directly with DataFusion",
      Section::InMemory => "Querying data in-memory with DataFusion",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  /// `run` counts from 1.
  Query { strategy: StrategyKind, run: usize },
  Materialize,
}

impl Step {
  pub fn label(&self) -> String {
    match self {
      Step::Query { strategy, run } => format!(
        "DataFusion from {} ({} run)",
        strategy.description(),
        ordinal(*run)
      ),
      Step::Materialize => "Arrow load dataset into in-memory arrow table".to_string(),
    }
  }

  pub fn section(&self) -> Section {
    match self {
      Step::Query { strategy, .. } => strategy.section(),
      Step::Materialize => Section::InMemory,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
  pub step: Step,
  pub metrics: Vec<Metric>,
  pub duration: Duration,
}

impl Measurement {
  pub fn report_line(&self) -> String {
    format_report(&self.step.label(), &self.metrics, self.duration)
  }

  pub fn metric(&self, name: &str) -> Option<MetricValue> {
    self
      .metrics
      .iter()
      .find(|metric| metric.name == name)
      .map(|metric| metric.value)
  }
}

pub fn format_report(label: &str, metrics: &[Metric], duration: Duration) -> String {
  let seconds = duration.as_secs_f64();
  if metrics.is_empty() {
    return format!("{label} in {seconds:.6} sec");
  }
  let metrics = metrics
    .iter()
    .map(|metric| format!("{}={}", metric.name, metric.value))
    .collect::<Vec<_>>()
    .join(", ");
  format!("{label} - {metrics} in {seconds:.6} sec")
}

/// 1st, 2nd, 3rd, 4th, ..., 11th, 12th, 13th, ..., 21st
pub fn ordinal(n: usize) -> String {
  let suffix = match (n % 10, n % 100) {
    (_, 11..=13) => "th",
    (1, _) => "st",
    (2, _) => "nd",
    (3, _) => "rd",
    _ => "th",
  };
  format!("{n}{suffix}")
}

#[derive(Debug, Error, PartialEq)]
#[error("{label} disagrees with {reference} on {metric}: {actual} vs {expected}")]
pub struct Inconsistency {
  pub label: String,
  pub reference: String,
  pub metric: String,
  pub expected: String,
  pub actual: String,
}

/// All measurements of one benchmark run, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkReport {
  pub measurements: Vec<Measurement>,
}

impl BenchmarkReport {
  pub fn push(&mut self, measurement: Measurement) {
    self.measurements.push(measurement);
  }

  pub fn queries(&self) -> impl Iterator<Item = &Measurement> {
    self
      .measurements
      .iter()
      .filter(|m| matches!(m.step, Step::Query { .. }))
  }

  pub fn total_duration(&self) -> Duration {
    self.measurements.iter().map(|m| m.duration).sum()
  }

  /// Every query measurement must report the same metrics as the first one.
  pub fn check_consistency(&self, tolerance: f64) -> Result<(), Inconsistency> {
    let mut queries = self.queries();
    let Some(reference) = queries.next() else {
      return Ok(());
    };
    for measurement in queries {
      for expected in &reference.metrics {
        let actual = measurement.metric(&expected.name);
        let agrees = actual.is_some_and(|actual| actual.approx_eq(&expected.value, tolerance));
        if !agrees {
          return Err(Inconsistency {
            label: measurement.step.label(),
            reference: reference.step.label(),
            metric: expected.name.clone(),
            expected: expected.value.to_string(),
            actual: actual.map_or_else(|| "missing".to_string(), |v| v.to_string()),
          });
        }
      }
    }
    Ok(())
  }
}

//! This crate provides the engine-independent model of the access-strategy benchmark:
//! - the predicate a filtered scanner is narrowed by, and its SQL rendering
//! - the aggregate expressions a benchmark computes
//! - the three access strategies and the SQL each of them issues
//! - measurements, report lines and the cross-strategy consistency check
//!
//! Nothing in here talks to a query engine; `lakehouse-eval` binds this model to DataFusion.

pub mod report;
pub mod traits;

use std::{fmt, str::FromStr};

use thiserror::Error;

pub use report::{
  format_report, BenchmarkReport, Inconsistency, Measurement, Metric, MetricValue, Section, Step,
};
use traits::IntoLiteral;

/// Column the default benchmark filters on.
pub const DEFAULT_PREDICATE_COLUMN: &str = "VendorID";
/// Value the default benchmark filters for.
pub const DEFAULT_PREDICATE_VALUE: i64 = 6;
/// Numeric column the default aggregates are computed over.
pub const DEFAULT_METRIC_COLUMN: &str = "trip_distance";
/// Number of times each query is repeated. The first run is cold, the rest are warm.
pub const DEFAULT_RUNS: usize = 2;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
  #[error("unknown aggregate function: {0} (expected count, avg, sum, min or max)")]
  UnknownAggregate(String),
  #[error("unknown comparison operator: {0}")]
  UnknownOperator(String),
  #[error("unknown access strategy: {0} (expected file-scan, filtered-scan or in-memory)")]
  UnknownStrategy(String),
  #[error("predicate literal must not be empty")]
  EmptyLiteral,
  #[error("predicate literal must be a finite number: {0}")]
  NonFiniteLiteral(String),
}

/// The three ways a dataset can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
  /// Query the parquet files directly, predicate applied in the SQL `WHERE` clause.
  FileScan,
  /// Query a scanner that already carries the predicate, so the engine can push it into the scan.
  FilteredScan,
  /// Load the whole dataset into memory first, then query it with a `WHERE` clause.
  InMemory,
}

impl StrategyKind {
  pub const ALL: [StrategyKind; 3] = [
    StrategyKind::FileScan,
    StrategyKind::FilteredScan,
    StrategyKind::InMemory,
  ];

  /// Relation name the strategy's data source is registered under.
  pub fn relation(&self) -> &'static str {
    match self {
      StrategyKind::FileScan => "arrow_dataset",
      StrategyKind::FilteredScan => "arrow_scanner",
      StrategyKind::InMemory => "arrow_table",
    }
  }

  pub fn description(&self) -> &'static str {
    match self {
      StrategyKind::FileScan => "file-based dataset",
      StrategyKind::FilteredScan => "filtered scanner",
      StrategyKind::InMemory => "in-memory arrow table",
    }
  }

  /// The filtered scanner already holds the predicate; everything else needs a `WHERE` clause.
  pub fn needs_where_clause(&self) -> bool {
    !matches!(self, StrategyKind::FilteredScan)
  }

  pub fn section(&self) -> Section {
    match self {
      StrategyKind::FileScan | StrategyKind::FilteredScan => Section::Files,
      StrategyKind::InMemory => Section::InMemory,
    }
  }
}

impl fmt::Display for StrategyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      StrategyKind::FileScan => "file-scan",
      StrategyKind::FilteredScan => "filtered-scan",
      StrategyKind::InMemory => "in-memory",
    };
    f.write_str(name)
  }
}

impl FromStr for StrategyKind {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
      "file-scan" | "file" => Ok(StrategyKind::FileScan),
      "filtered-scan" | "filtered" | "scanner" => Ok(StrategyKind::FilteredScan),
      "in-memory" | "memory" => Ok(StrategyKind::InMemory),
      _ => Err(ParseError::UnknownStrategy(s.to_string())),
    }
  }
}

/// A literal value on the right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
  Int(i64),
  Float(f64),
  Bool(bool),
  Str(String),
}

impl fmt::Display for Literal {
  /// Renders the literal as SQL.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Literal::Int(v) => write!(f, "{v}"),
      // Debug keeps the decimal point so the engine reads it as a float
      Literal::Float(v) if v.is_finite() => write!(f, "{v:?}"),
      Literal::Float(v) => write!(f, "CAST('{v}' AS DOUBLE)"),
      Literal::Bool(v) => write!(f, "{v}"),
      Literal::Str(v) => write!(f, "'{}'", v.replace('\'', "''")),
    }
  }
}

impl FromStr for Literal {
  type Err = ParseError;

  /// Integers win over floats, floats over booleans; anything else is a string.
  /// Surrounding single quotes force a string. `inf` and `NaN` are rejected.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.is_empty() {
      return Err(ParseError::EmptyLiteral);
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
      return Ok(Literal::Str(s[1..s.len() - 1].to_string()));
    }
    if let Ok(v) = s.parse::<i64>() {
      return Ok(Literal::Int(v));
    }
    if let Ok(v) = s.parse::<f64>() {
      if !v.is_finite() {
        return Err(ParseError::NonFiniteLiteral(s.to_string()));
      }
      return Ok(Literal::Float(v));
    }
    match s {
      "true" | "TRUE" => Ok(Literal::Bool(true)),
      "false" | "FALSE" => Ok(Literal::Bool(false)),
      _ => Ok(Literal::Str(s.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
  Eq,
  NotEq,
  Lt,
  LtEq,
  Gt,
  GtEq,
}

impl CompareOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      CompareOp::Eq => "=",
      CompareOp::NotEq => "!=",
      CompareOp::Lt => "<",
      CompareOp::LtEq => "<=",
      CompareOp::Gt => ">",
      CompareOp::GtEq => ">=",
    }
  }
}

impl FromStr for CompareOp {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "=" | "==" | "eq" => Ok(CompareOp::Eq),
      "!=" | "<>" | "ne" => Ok(CompareOp::NotEq),
      "<" | "lt" => Ok(CompareOp::Lt),
      "<=" | "le" => Ok(CompareOp::LtEq),
      ">" | "gt" => Ok(CompareOp::Gt),
      ">=" | "ge" => Ok(CompareOp::GtEq),
      _ => Err(ParseError::UnknownOperator(s.to_string())),
    }
  }
}

/// A single-column comparison, e.g. `VendorID = 6`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
  pub column: String,
  pub op: CompareOp,
  pub value: Literal,
}

impl Predicate {
  pub fn new(column: impl Into<String>, op: CompareOp, value: impl IntoLiteral) -> Self {
    Predicate {
      column: column.into(),
      op,
      value: value.into_literal(),
    }
  }

  pub fn equals(column: impl Into<String>, value: impl IntoLiteral) -> Self {
    Self::new(column, CompareOp::Eq, value)
  }

  pub fn to_sql(&self) -> String {
    format!(
      "{} {} {}",
      quote_identifier(&self.column),
      self.op.symbol(),
      self.value
    )
  }
}

impl fmt::Display for Predicate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {} {}", self.column, self.op.symbol(), self.value)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
  Count,
  Avg,
  Sum,
  Min,
  Max,
}

impl AggregateFunction {
  pub fn name(&self) -> &'static str {
    match self {
      AggregateFunction::Count => "count",
      AggregateFunction::Avg => "avg",
      AggregateFunction::Sum => "sum",
      AggregateFunction::Min => "min",
      AggregateFunction::Max => "max",
    }
  }
}

impl FromStr for AggregateFunction {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "count" => Ok(AggregateFunction::Count),
      "avg" | "mean" => Ok(AggregateFunction::Avg),
      "sum" => Ok(AggregateFunction::Sum),
      "min" => Ok(AggregateFunction::Min),
      "max" => Ok(AggregateFunction::Max),
      _ => Err(ParseError::UnknownAggregate(s.to_string())),
    }
  }
}

/// An aggregate expression; its metric name doubles as the SQL alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
  pub function: AggregateFunction,
  /// `None` only for `count(*)`.
  pub column: Option<String>,
}

impl Aggregate {
  pub fn count() -> Self {
    Aggregate {
      function: AggregateFunction::Count,
      column: None,
    }
  }

  /// `count` ignores the column and counts rows.
  pub fn over(function: AggregateFunction, column: impl Into<String>) -> Self {
    match function {
      AggregateFunction::Count => Self::count(),
      _ => Aggregate {
        function,
        column: Some(column.into()),
      },
    }
  }

  pub fn metric_name(&self) -> &'static str {
    self.function.name()
  }

  pub fn to_sql(&self) -> String {
    let argument = match &self.column {
      Some(column) => quote_identifier(column),
      None => "*".to_string(),
    };
    format!(
      "{}({}) AS {}",
      self.function.name(),
      argument,
      quote_identifier(self.metric_name())
    )
  }
}

/// One parameterized benchmark: which rows, which aggregates, how often, through which strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkDefinition {
  pub predicate: Predicate,
  pub aggregates: Vec<Aggregate>,
  pub runs: usize,
  pub strategies: Vec<StrategyKind>,
}

impl Default for BenchmarkDefinition {
  fn default() -> Self {
    BenchmarkDefinition::new(
      Predicate::equals(DEFAULT_PREDICATE_COLUMN, DEFAULT_PREDICATE_VALUE),
      vec![
        Aggregate::count(),
        Aggregate::over(AggregateFunction::Avg, DEFAULT_METRIC_COLUMN),
      ],
    )
  }
}

impl BenchmarkDefinition {
  /// Duplicate aggregates are dropped, keeping the first occurrence.
  pub fn new(predicate: Predicate, aggregates: Vec<Aggregate>) -> Self {
    let mut unique: Vec<Aggregate> = Vec::with_capacity(aggregates.len());
    for aggregate in aggregates {
      if !unique.iter().any(|a| a.metric_name() == aggregate.metric_name()) {
        unique.push(aggregate);
      }
    }
    BenchmarkDefinition {
      predicate,
      aggregates: unique,
      runs: DEFAULT_RUNS,
      strategies: StrategyKind::ALL.to_vec(),
    }
  }

  /// At least one run is always performed.
  pub fn with_runs(mut self, runs: usize) -> Self {
    self.runs = runs.max(1);
    self
  }

  /// Strategies always execute in [`StrategyKind::ALL`] order, whatever order they are given in.
  pub fn with_strategies(mut self, strategies: &[StrategyKind]) -> Self {
    self.strategies = StrategyKind::ALL
      .into_iter()
      .filter(|kind| strategies.contains(kind))
      .collect();
    self
  }

  pub fn includes(&self, kind: StrategyKind) -> bool {
    self.strategies.contains(&kind)
  }

  /// The SQL issued for `kind` against its registered relation.
  pub fn sql_for(&self, kind: StrategyKind) -> String {
    let projection = self
      .aggregates
      .iter()
      .map(Aggregate::to_sql)
      .collect::<Vec<_>>()
      .join(", ");
    let mut sql = format!(
      "SELECT {} FROM {}",
      projection,
      quote_identifier(kind.relation())
    );
    if kind.needs_where_clause() {
      sql.push_str(" WHERE ");
      sql.push_str(&self.predicate.to_sql());
    }
    sql
  }
}

/// Double-quotes an identifier so the engine keeps its case.
pub fn quote_identifier(name: &str) -> String {
  format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
  use rstest::rstest;

  use super::*;

  #[test]
  fn test_default_definition_sql() {
    let definition = BenchmarkDefinition::default();
    assert_eq!(
      definition.sql_for(StrategyKind::FileScan),
      r#"SELECT count(*) AS "count", avg("trip_distance") AS "avg" FROM "arrow_dataset" WHERE "VendorID" = 6"#
    );
    assert_eq!(
      definition.sql_for(StrategyKind::FilteredScan),
      r#"SELECT count(*) AS "count", avg("trip_distance") AS "avg" FROM "arrow_scanner""#
    );
    assert_eq!(
      definition.sql_for(StrategyKind::InMemory),
      r#"SELECT count(*) AS "count", avg("trip_distance") AS "avg" FROM "arrow_table" WHERE "VendorID" = 6"#
    );
  }

  #[rstest]
  #[case("42", Literal::Int(42))]
  #[case("-7", Literal::Int(-7))]
  #[case("2.5", Literal::Float(2.5))]
  #[case("true", Literal::Bool(true))]
  #[case("CMT", Literal::Str("CMT".to_string()))]
  #[case("'6'", Literal::Str("6".to_string()))]
  fn test_parse_literal(#[case] input: &str, #[case] expected: Literal) {
    assert_eq!(input.parse::<Literal>().unwrap(), expected);
  }

  #[test]
  fn test_parse_empty_literal() {
    assert_eq!("  ".parse::<Literal>(), Err(ParseError::EmptyLiteral));
  }

  #[rstest]
  #[case("inf")]
  #[case("-infinity")]
  #[case("NaN")]
  fn test_parse_non_finite_literal(#[case] input: &str) {
    assert_eq!(
      input.parse::<Literal>(),
      Err(ParseError::NonFiniteLiteral(input.to_string()))
    );
  }

  #[rstest]
  #[case(Predicate::equals("VendorID", 6), r#""VendorID" = 6"#)]
  #[case(Predicate::new("fare", CompareOp::GtEq, 2.0), r#""fare" >= 2.0"#)]
  #[case(Predicate::equals("store", "O'Hare"), r#""store" = 'O''Hare'"#)]
  #[case(Predicate::new("odd\"col", CompareOp::NotEq, false), r#""odd""col" != false"#)]
  #[case(
    Predicate::new("trip_distance", CompareOp::Lt, f64::INFINITY),
    r#""trip_distance" < CAST('inf' AS DOUBLE)"#
  )]
  #[case(
    Predicate::new("fare", CompareOp::NotEq, f64::NAN),
    r#""fare" != CAST('NaN' AS DOUBLE)"#
  )]
  fn test_predicate_sql(#[case] predicate: Predicate, #[case] expected: &str) {
    assert_eq!(predicate.to_sql(), expected);
  }

  #[rstest]
  #[case("==", CompareOp::Eq)]
  #[case("<>", CompareOp::NotEq)]
  #[case("le", CompareOp::LtEq)]
  #[case(">", CompareOp::Gt)]
  fn test_parse_operator(#[case] input: &str, #[case] expected: CompareOp) {
    assert_eq!(input.parse::<CompareOp>().unwrap(), expected);
  }

  #[rstest]
  #[case("count", AggregateFunction::Count)]
  #[case("MEAN", AggregateFunction::Avg)]
  #[case("max", AggregateFunction::Max)]
  fn test_parse_aggregate(#[case] input: &str, #[case] expected: AggregateFunction) {
    assert_eq!(input.parse::<AggregateFunction>().unwrap(), expected);
  }

  #[test]
  fn test_parse_unknown_aggregate() {
    assert!(matches!(
      "median".parse::<AggregateFunction>(),
      Err(ParseError::UnknownAggregate(_))
    ));
  }

  #[test]
  fn test_count_ignores_column() {
    let aggregate = Aggregate::over(AggregateFunction::Count, "trip_distance");
    assert_eq!(aggregate, Aggregate::count());
    assert_eq!(aggregate.to_sql(), r#"count(*) AS "count""#);
  }

  #[test]
  fn test_duplicate_aggregates_dropped() {
    let definition = BenchmarkDefinition::new(
      Predicate::equals("VendorID", 6),
      vec![
        Aggregate::over(AggregateFunction::Avg, "trip_distance"),
        Aggregate::count(),
        Aggregate::over(AggregateFunction::Avg, "fare_amount"),
      ],
    );
    assert_eq!(definition.aggregates.len(), 2);
    assert_eq!(definition.aggregates[0].column.as_deref(), Some("trip_distance"));
  }

  #[test]
  fn test_strategies_keep_canonical_order() {
    let definition = BenchmarkDefinition::default()
      .with_strategies(&[StrategyKind::InMemory, StrategyKind::FileScan]);
    assert_eq!(
      definition.strategies,
      vec![StrategyKind::FileScan, StrategyKind::InMemory]
    );
    assert!(!definition.includes(StrategyKind::FilteredScan));
  }

  #[rstest]
  #[case("file-scan", StrategyKind::FileScan)]
  #[case("filtered_scan", StrategyKind::FilteredScan)]
  #[case("In-Memory", StrategyKind::InMemory)]
  fn test_parse_strategy(#[case] input: &str, #[case] expected: StrategyKind) {
    assert_eq!(input.parse::<StrategyKind>().unwrap(), expected);
    assert_eq!(expected.to_string().parse::<StrategyKind>().unwrap(), expected);
  }

  #[test]
  fn test_runs_at_least_one() {
    assert_eq!(BenchmarkDefinition::default().with_runs(0).runs, 1);
  }
}

use crate::{ElementIdx, NodeIdx};

use std::{fmt, path::PathBuf, sync::Arc};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("mesh file `{path}` could not be read")]
  FileNotFound {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("malformed mesh: {0}")]
  MeshFormat(String),
  #[error("unknown region `{0}`")]
  UnknownRegion(String),
  #[error("unknown variable `{found}`, the solved field is `{expected}`")]
  UnknownVariable { found: String, expected: String },
  #[error("element {element} is degenerate (jacobian determinant {det:e})")]
  DegenerateElement { element: ElementIdx, det: f64 },
  #[error("node {node} is constrained to {previous} and {value} at once")]
  DuplicateConstraint {
    node: NodeIdx,
    previous: f64,
    value: f64,
  },
  #[error(
    "linear solver did not converge after {iterations} iterations \
     (residual {residual:e}, tolerance {tolerance:e})"
  )]
  Convergence {
    iterations: usize,
    residual: f64,
    tolerance: f64,
  },
  #[error("matrix is singular{}", empty_row(.row))]
  SingularMatrix { row: Option<usize> },
  #[error("inconsistent matrix: {0}")]
  InvalidMatrix(String),
  #[error("cannot write `{path}`")]
  Output {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("invalid configuration: {0}")]
  Config(String),
  #[error("cannot {action} while the run is {state}")]
  InvalidTransition {
    action: &'static str,
    state: &'static str,
  },
}

fn empty_row(row: &Option<usize>) -> String {
  match row {
    Some(r) => format!(" (row {r} has no entries)"),
    None => String::new(),
  }
}

/// The pipeline stage in which a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Load,
  Assemble,
  Constrain,
  Solve,
  Output,
}
impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Load => "load",
      Self::Assemble => "assemble",
      Self::Constrain => "constrain",
      Self::Solve => "solve",
      Self::Output => "output",
    };
    f.write_str(name)
  }
}

/// A failure of one pipeline stage.
///
/// Cheap to clone, so the run can keep it in its terminal state.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{stage} stage failed")]
pub struct StageError {
  pub stage: Stage,
  #[source]
  pub source: Arc<Error>,
}
impl StageError {
  pub fn new(stage: Stage, source: Error) -> Self {
    Self {
      stage,
      source: Arc::new(source),
    }
  }
  pub fn error(&self) -> &Error {
    &self.source
  }
}

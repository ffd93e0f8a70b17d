//! Run settings, read from a TOML file.

use crate::{
  bc::{DirichletBc, DuplicatePolicy, Elimination},
  error::{Error, Result},
  lse::SolverConfig,
  TEMPERATURE,
};

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeatConfig {
  /// Gmsh file read by a run that was not handed a mesh.
  pub mesh: Option<PathBuf>,
  /// Where the finished field is exported to, if anywhere.
  pub output: Option<PathBuf>,
  /// Name of the solved field. Boundary conditions must refer to it.
  pub variable: String,
  pub conductivity: f64,
  /// Uniform volumetric heat source.
  pub source: f64,
  pub parallel_assembly: bool,
  pub duplicate_policy: DuplicatePolicy,
  pub elimination: Elimination,
  pub solver: SolverConfig,
  pub boundary_conditions: Vec<DirichletBc>,
}

impl Default for HeatConfig {
  fn default() -> Self {
    Self {
      mesh: None,
      output: None,
      variable: TEMPERATURE.to_string(),
      conductivity: 1.0,
      source: 0.0,
      parallel_assembly: false,
      duplicate_policy: DuplicatePolicy::default(),
      elimination: Elimination::default(),
      solver: SolverConfig::default(),
      boundary_conditions: Vec::new(),
    }
  }
}

impl HeatConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
      .map_err(|err| Error::Config(format!("cannot read {}: {err}", path.display())))?;
    Self::from_toml_str(&text)
  }

  pub fn from_toml_str(text: &str) -> Result<Self> {
    let config: Self = toml::from_str(text).map_err(|err| Error::Config(err.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  pub fn with_bc(mut self, region: &str, value: f64) -> Self {
    let bc = DirichletBc::new(region, self.variable.clone(), value);
    self.boundary_conditions.push(bc);
    self
  }

  fn validate(&self) -> Result<()> {
    if !(self.conductivity > 0.0) {
      return Err(Error::Config(format!(
        "conductivity must be positive, got {}",
        self.conductivity
      )));
    }
    if !self.source.is_finite() {
      return Err(Error::Config(format!("source must be finite, got {}", self.source)));
    }
    let tolerances = std::iter::once(self.solver.tolerance)
      .chain(self.solver.fallback.map(|f| f.tolerance));
    for tolerance in tolerances {
      if !(tolerance > 0.0) {
        return Err(Error::Config(format!(
          "solver tolerance must be positive, got {tolerance}"
        )));
      }
    }
    Ok(())
  }
}

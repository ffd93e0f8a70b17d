//! A heat conduction run, driven through its stages one at a time.
//!
//! `Unloaded -> MeshLoaded -> Assembled -> ConstraintsApplied -> Solved -> Done`
//!
//! Every stage moves the run strictly forward. A failing stage moves it to
//! the terminal `Failed` state, which keeps the error. Calling a stage out
//! of order is rejected and leaves the run untouched.

use crate::{
  assemble::{self, GalVec},
  bc::BcApplier,
  config::HeatConfig,
  error::{Error, Result, Stage, StageError},
  fe::{DiffusionElmat, SourceElvec},
  field::Field,
  lse::{LinearSolver, SolveStats},
  mesh::Mesh,
  region::RegionIndex,
  sparse::SparseMatrix,
};

use std::{path::Path, rc::Rc, time::Instant};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum RunState {
  Unloaded,
  MeshLoaded,
  Assembled,
  ConstraintsApplied,
  Solved,
  Done,
  Failed(StageError),
}
impl RunState {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Unloaded => "unloaded",
      Self::MeshLoaded => "mesh loaded",
      Self::Assembled => "assembled",
      Self::ConstraintsApplied => "constrained",
      Self::Solved => "solved",
      Self::Done => "done",
      Self::Failed(_) => "failed",
    }
  }
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Done | Self::Failed(_))
  }
}

pub struct HeatConduction {
  config: HeatConfig,
  state: RunState,
  mesh: Option<Rc<Mesh>>,
  regions: Option<RegionIndex>,
  galmat: Option<SparseMatrix>,
  galvec: Option<GalVec>,
  galsol: Option<GalVec>,
  stats: Option<SolveStats>,
}

impl HeatConduction {
  pub fn new(config: HeatConfig) -> Self {
    Self {
      config,
      state: RunState::Unloaded,
      mesh: None,
      regions: None,
      galmat: None,
      galvec: None,
      galsol: None,
      stats: None,
    }
  }

  pub fn config(&self) -> &HeatConfig {
    &self.config
  }
  pub fn state(&self) -> &RunState {
    &self.state
  }
  pub fn mesh(&self) -> Option<&Rc<Mesh>> {
    self.mesh.as_ref()
  }
  pub fn regions(&self) -> Option<&RegionIndex> {
    self.regions.as_ref()
  }
  /// The linear system, once assembled.
  pub fn system(&self) -> Option<(&SparseMatrix, &GalVec)> {
    self.galmat.as_ref().zip(self.galvec.as_ref())
  }
  pub fn stats(&self) -> Option<SolveStats> {
    self.stats
  }

  fn expect_state(
    &self,
    expected: fn(&RunState) -> bool,
    stage: Stage,
    action: &'static str,
  ) -> std::result::Result<(), StageError> {
    if expected(&self.state) {
      Ok(())
    } else {
      let err = Error::InvalidTransition {
        action,
        state: self.state.name(),
      };
      Err(StageError::new(stage, err))
    }
  }

  /// Moves to `next` on success and to `Failed` otherwise.
  fn advance<T>(
    &mut self,
    stage: Stage,
    next: RunState,
    result: Result<T>,
  ) -> std::result::Result<T, StageError> {
    match result {
      Ok(value) => {
        self.state = next;
        Ok(value)
      }
      Err(err) => {
        let err = StageError::new(stage, err);
        self.state = RunState::Failed(err.clone());
        Err(err)
      }
    }
  }

  pub fn load_mesh(&mut self, path: impl AsRef<Path>) -> std::result::Result<(), StageError> {
    let path = path.as_ref();
    self.expect_state(|s| matches!(s, RunState::Unloaded), Stage::Load, "load a mesh")?;
    info!("loading mesh {}", path.display());
    let result = Mesh::load(path);
    let mesh = self.advance(Stage::Load, RunState::MeshLoaded, result)?;
    self.set_mesh(Rc::new(mesh));
    Ok(())
  }

  pub fn with_mesh(&mut self, mesh: impl Into<Rc<Mesh>>) -> std::result::Result<(), StageError> {
    self.expect_state(|s| matches!(s, RunState::Unloaded), Stage::Load, "load a mesh")?;
    self.set_mesh(mesh.into());
    self.state = RunState::MeshLoaded;
    Ok(())
  }

  fn set_mesh(&mut self, mesh: Rc<Mesh>) {
    let regions = RegionIndex::from_mesh(&mesh);
    info!(
      "mesh has {} nodes, {} cells and regions {:?}",
      mesh.node_count(),
      mesh.ncells(),
      regions.names().collect::<Vec<_>>()
    );
    self.regions = Some(regions);
    self.mesh = Some(mesh);
  }

  pub fn assemble(&mut self) -> std::result::Result<(), StageError> {
    self.expect_state(|s| matches!(s, RunState::MeshLoaded), Stage::Assemble, "assemble")?;
    let state = self.state.name();
    let Some(mesh) = self.mesh.clone() else {
      return Err(missing(Stage::Assemble, "mesh", state));
    };

    let timer = Instant::now();
    let elmat = DiffusionElmat::new(self.config.conductivity);
    let elvec = SourceElvec::new(self.config.source);
    let result = if self.config.parallel_assembly {
      assemble::assemble_galmat_par(&mesh, elmat)
    } else {
      assemble::assemble_galmat(&mesh, elmat)
    }
    .and_then(|galmat| Ok((galmat, assemble::assemble_galvec(&mesh, elvec)?)));

    let (galmat, galvec) = self.advance(Stage::Assemble, RunState::Assembled, result)?;
    info!(
      "assembled {} unknowns in {:.3}s",
      galvec.len(),
      timer.elapsed().as_secs_f64()
    );
    self.galmat = Some(galmat);
    self.galvec = Some(galvec);
    Ok(())
  }

  pub fn apply_constraints(&mut self) -> std::result::Result<(), StageError> {
    self.expect_state(
      |s| matches!(s, RunState::Assembled),
      Stage::Constrain,
      "apply constraints",
    )?;
    let state = self.state.name();
    let (Some(regions), Some(galmat), Some(galvec)) =
      (self.regions.as_ref(), self.galmat.as_mut(), self.galvec.as_mut())
    else {
      return Err(missing(Stage::Constrain, "linear system", state));
    };

    let applier = BcApplier::new(
      self.config.variable.clone(),
      self.config.duplicate_policy,
      self.config.elimination,
    );
    let result = applier.apply(galmat, galvec, regions, &self.config.boundary_conditions);
    let fixed = self.advance(Stage::Constrain, RunState::ConstraintsApplied, result)?;
    info!(
      "applied {} boundary conditions to {} nodes",
      self.config.boundary_conditions.len(),
      fixed.len()
    );
    Ok(())
  }

  pub fn solve(&mut self) -> std::result::Result<(), StageError> {
    self.expect_state(
      |s| matches!(s, RunState::ConstraintsApplied),
      Stage::Solve,
      "solve",
    )?;
    let state = self.state.name();
    let (Some(galmat), Some(galvec)) = (self.galmat.as_ref(), self.galvec.as_ref()) else {
      return Err(missing(Stage::Solve, "linear system", state));
    };

    let timer = Instant::now();
    let result = LinearSolver::new(self.config.solver).solve(galmat, galvec);
    let (galsol, stats) = self.advance(Stage::Solve, RunState::Solved, result)?;
    info!("solved in {:.3}s", timer.elapsed().as_secs_f64());
    self.galsol = Some(galsol);
    self.stats = Some(stats);
    Ok(())
  }

  /// Wraps the solution into a field and exports it when an output path is
  /// configured.
  pub fn finish(&mut self) -> std::result::Result<Field, StageError> {
    self.expect_state(|s| matches!(s, RunState::Solved), Stage::Output, "finish")?;
    let state = self.state.name();
    let (Some(mesh), Some(galsol)) = (self.mesh.as_ref(), self.galsol.clone()) else {
      return Err(missing(Stage::Output, "solution", state));
    };

    let result = Field::from_solution(self.config.variable.clone(), galsol, mesh).and_then(|field| {
      if let Some(output) = &self.config.output {
        field.write(output)?;
      }
      Ok(field)
    });
    let field = self.advance(Stage::Output, RunState::Done, result)?;
    debug!("run done");
    Ok(field)
  }

  /// Performs all remaining stages.
  ///
  /// An unloaded run reads the mesh file named in the configuration.
  pub fn run(&mut self) -> std::result::Result<Field, StageError> {
    if matches!(self.state, RunState::Unloaded) {
      match self.config.mesh.clone() {
        Some(path) => self.load_mesh(path)?,
        None => {
          let err = Error::Config("no mesh given and none configured".to_string());
          return Err(self.fail(Stage::Load, err));
        }
      }
    }
    if matches!(self.state, RunState::MeshLoaded) {
      self.assemble()?;
    }
    if matches!(self.state, RunState::Assembled) {
      self.apply_constraints()?;
    }
    if matches!(self.state, RunState::ConstraintsApplied) {
      self.solve()?;
    }
    self.finish()
  }

  fn fail(&mut self, stage: Stage, err: Error) -> StageError {
    let err = StageError::new(stage, err);
    self.state = RunState::Failed(err.clone());
    err
  }
}

fn missing(stage: Stage, what: &str, state: &str) -> StageError {
  StageError::new(
    stage,
    Error::InvalidMatrix(format!("{what} missing while {state}")),
  )
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::mesh::cartesian;

  fn line_config() -> HeatConfig {
    HeatConfig::default()
      .with_bc("xneg", 10.0)
      .with_bc("xpos", 35.0)
  }

  #[test]
  fn stages_advance_in_order() {
    let mut run = HeatConduction::new(line_config());
    assert!(matches!(run.state(), RunState::Unloaded));
    run.with_mesh(cartesian::line(5, 1.0, 0.0).unwrap()).unwrap();
    assert!(matches!(run.state(), RunState::MeshLoaded));
    run.assemble().unwrap();
    assert!(matches!(run.state(), RunState::Assembled));
    run.apply_constraints().unwrap();
    assert!(matches!(run.state(), RunState::ConstraintsApplied));
    run.solve().unwrap();
    assert!(matches!(run.state(), RunState::Solved));
    let field = run.finish().unwrap();
    assert!(matches!(run.state(), RunState::Done));
    assert!(run.state().is_terminal());
    approx::assert_relative_eq!(field.value_at(5).unwrap(), 35.0, epsilon = 1e-12);
  }

  #[test]
  fn out_of_order_calls_are_rejected() {
    let mut run = HeatConduction::new(line_config());
    let err = run.solve().unwrap_err();
    assert_eq!(err.stage, Stage::Solve);
    assert!(matches!(
      err.error(),
      Error::InvalidTransition {
        action: "solve",
        state: "unloaded"
      }
    ));
    assert!(matches!(run.state(), RunState::Unloaded));

    run.with_mesh(cartesian::line(2, 1.0, 0.0).unwrap()).unwrap();
    assert!(run.with_mesh(cartesian::line(2, 1.0, 0.0).unwrap()).is_err());
    assert!(run.apply_constraints().is_err());
    run.assemble().unwrap();
    assert!(run.assemble().is_err());
    assert!(matches!(run.state(), RunState::Assembled));
  }

  #[test]
  fn failure_is_terminal() {
    let config = HeatConfig::default().with_bc("inlet", 10.0);
    let mut run = HeatConduction::new(config);
    run.with_mesh(cartesian::line(2, 1.0, 0.0).unwrap()).unwrap();
    run.assemble().unwrap();
    let err = run.apply_constraints().unwrap_err();
    assert_eq!(err.stage, Stage::Constrain);
    assert!(matches!(err.error(), Error::UnknownRegion(name) if name == "inlet"));

    let RunState::Failed(kept) = run.state() else {
      panic!("run should have failed");
    };
    assert_eq!(kept.stage, Stage::Constrain);

    let err = run.solve().unwrap_err();
    assert!(matches!(
      err.error(),
      Error::InvalidTransition {
        state: "failed",
        ..
      }
    ));
  }

  #[test]
  fn run_without_mesh_fails_in_load_stage() {
    let mut run = HeatConduction::new(line_config());
    let err = run.run().unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    assert!(matches!(run.state(), RunState::Failed(_)));
  }

  #[test]
  fn missing_mesh_file_fails_in_load_stage() {
    let mut config = line_config();
    config.mesh = Some("/nonexistent/disk.msh".into());
    let mut run = HeatConduction::new(config);
    let err = run.run().unwrap_err();
    assert_eq!(err.stage, Stage::Load);
    assert!(matches!(err.error(), Error::FileNotFound { .. }));
  }
}

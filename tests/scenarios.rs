//! Complete heat conduction runs compared against analytical profiles.

extern crate nalgebra as na;

use heatcond::{
  bc::Elimination,
  config::HeatConfig,
  env::{Environment, LogLevel},
  field::{Field, NormKind},
  lse::{LinearSolver, Preconditioner, SolverSettings},
  mesh::{
    cartesian::{self, CellShape},
    coordinates::NodeCoords,
    Mesh, MeshTags,
  },
  pipeline::{HeatConduction, RunState},
  Error, Stage,
};

fn solve(mesh: Mesh, config: HeatConfig) -> Field {
  let mut run = HeatConduction::new(config);
  run.with_mesh(mesh).unwrap();
  run.run().unwrap()
}

/// The rectangle generator names its sides, the channel scenario calls
/// them inlet and outlet.
fn channel(shape: CellShape, length: f64) -> Mesh {
  let mesh = cartesian::rectangle([8, 4], [length, 1.0], [0.0, 0.0], shape).unwrap();
  let tags: MeshTags = mesh
    .tags()
    .iter()
    .map(|(name, members)| {
      let name = match name.as_str() {
        "left" => "inlet",
        "right" => "outlet",
        other => other,
      };
      (name.to_string(), members.clone())
    })
    .collect();
  Mesh::from_parts(mesh.coords().clone(), mesh.elements().to_vec(), tags).unwrap()
}

fn inlet_outlet() -> HeatConfig {
  HeatConfig::default()
    .with_bc("inlet", 10.0)
    .with_bc("outlet", 35.0)
}

#[test]
fn line_reproduces_linear_profile() {
  let _env = Environment::init(LogLevel::Debug);
  let length = 2.0;
  let mesh = cartesian::line(10, length, 0.0).unwrap();
  let expected = mesh.coords().eval_coord_fn(|x| 10.0 + 25.0 * x[0] / length);
  let config = HeatConfig::default()
    .with_bc("xneg", 10.0)
    .with_bc("xpos", 35.0);
  let field = solve(mesh, config);
  assert!((field.values() - expected).amax() < 1e-12);
}

#[test]
fn quadtriag_reproduces_linear_profile() {
  for shape in [CellShape::Mixed, CellShape::Quads, CellShape::Triangles] {
    let length = 2.0;
    let mesh = channel(shape, length);
    let xmax = mesh.max_coordinate(0).unwrap();
    assert_eq!(xmax, length);
    let expected = mesh.coords().eval_coord_fn(|x| 10.0 + 25.0 * x[0] / xmax);
    let field = solve(mesh, inlet_outlet());
    let diff = (field.values() - expected).amax();
    assert!(diff < 1e-12, "{shape:?} off by {diff:e}");
  }
}

#[test]
fn disk_reproduces_logarithmic_profile() {
  let (inner, outer) = (1.0, 2.0);
  let mesh = cartesian::annulus(8, 64, inner, outer).unwrap();
  let coords = mesh.coords().clone();
  let path = std::env::temp_dir().join(format!("heatcond-disk-{}.txt", std::process::id()));
  let mut config = HeatConfig::default()
    .with_bc("inner", 10.0)
    .with_bc("outer", 35.0);
  config.output = Some(path.clone());
  let field = solve(mesh, config);

  let mut max_err = 0.0f64;
  for (inode, coord) in coords.matrix().column_iter().enumerate() {
    let r = coord.norm();
    let expected = 10.0 + 25.0 * (r / inner).ln() / (outer / inner).ln();
    max_err = max_err.max((field.value_at(inode).unwrap() - expected).abs());
  }
  assert!(max_err < 0.2, "max error {max_err}");
  assert!(field.norm(NormKind::Linf, false) < 35.0 + 0.2);

  let exported = std::fs::read_to_string(&path).unwrap();
  std::fs::remove_file(&path).unwrap();
  assert_eq!(exported.lines().count(), field.len());
  assert_eq!(exported.lines().next().unwrap().split_whitespace().count(), 3);
}

#[test]
fn uniform_source_gives_parabola() {
  let length = 1.0;
  let mesh = cartesian::line(8, length, 0.0).unwrap();
  let coords = mesh.coords().clone();
  let mut config = HeatConfig::default().with_bc("xneg", 0.0).with_bc("xpos", 0.0);
  config.conductivity = 2.0;
  config.source = 4.0;
  let field = solve(mesh, config);

  for (inode, coord) in coords.matrix().column_iter().enumerate() {
    let x = coord[0];
    let expected = 4.0 / (2.0 * 2.0) * x * (length - x);
    assert!((field.value_at(inode).unwrap() - expected).abs() < 1e-12);
  }
}

#[test]
fn solver_variants_agree() {
  let mesh = cartesian::annulus(4, 32, 1.0, 3.0).unwrap();
  let reference = solve(mesh.clone(), disk_config());

  let mut symmetric = disk_config();
  symmetric.elimination = Elimination::Symmetric;
  let mut parallel = disk_config();
  parallel.parallel_assembly = true;
  let mut iterative = disk_config();
  iterative.solver = SolverSettings::iterative(1e-12, 2000, Preconditioner::Jacobi).into();

  for config in [symmetric, parallel, iterative] {
    let field = solve(mesh.clone(), config);
    let diff = (field.values() - reference.values()).amax();
    assert!(diff < 1e-6, "solutions differ by {diff:e}");
  }
}

fn disk_config() -> HeatConfig {
  HeatConfig::default()
    .with_bc("inner", 100.0)
    .with_bc("outer", 20.0)
}

#[test]
fn iterative_failure_falls_back_to_direct() {
  let mesh = cartesian::annulus(4, 32, 1.0, 3.0).unwrap();
  let mut config = disk_config();
  config.solver = SolverSettings::iterative(1e-14, 2, Preconditioner::None).into();
  let mut run = HeatConduction::new(config.clone());
  run.with_mesh(mesh.clone()).unwrap();
  let err = run.run().unwrap_err();
  assert_eq!(err.stage, Stage::Solve);
  assert!(matches!(err.error(), Error::Convergence { .. }));

  config.solver = config.solver.with_fallback(SolverSettings::direct());
  let mut run = HeatConduction::new(config);
  run.with_mesh(mesh).unwrap();
  run.run().unwrap();
  assert_eq!(run.stats().unwrap().iterations, 0);
}

#[test]
fn mesh_without_elements_is_singular() {
  let coords = NodeCoords::new(na::DMatrix::from_column_slice(2, 2, &[0.0, 0.0, 1.0, 0.0]));
  let mesh = Mesh::from_parts(coords, Vec::new(), MeshTags::new()).unwrap();
  let mut run = HeatConduction::new(HeatConfig::default());
  run.with_mesh(mesh).unwrap();
  let err = run.run().unwrap_err();
  assert_eq!(err.stage, Stage::Solve);
  assert!(matches!(err.error(), Error::SingularMatrix { .. }));
  assert!(matches!(run.state(), RunState::Failed(_)));
}

#[test]
fn insulated_plate_with_source_is_singular() {
  let mesh = cartesian::rectangle([4, 4], [1.0, 1.0], [0.0, 0.0], CellShape::Quads).unwrap();
  let mut config = HeatConfig::default();
  config.source = 1.0;
  let mut run = HeatConduction::new(config);
  run.with_mesh(mesh).unwrap();
  let err = run.run().unwrap_err();
  assert_eq!(err.stage, Stage::Solve);
  assert!(matches!(err.error(), Error::SingularMatrix { row: None }));
}

#[test]
fn unknown_region_aborts_run() {
  let mesh = cartesian::line(4, 1.0, 0.0).unwrap();
  let mut run = HeatConduction::new(inlet_outlet());
  run.with_mesh(mesh).unwrap();
  let err = run.run().unwrap_err();
  assert_eq!(err.stage, Stage::Constrain);
  assert!(matches!(err.error(), Error::UnknownRegion(name) if name == "inlet"));
}

#[test]
fn solve_is_idempotent() {
  let mesh = channel(CellShape::Mixed, 3.0);
  let mut run = HeatConduction::new(inlet_outlet());
  run.with_mesh(mesh.clone()).unwrap();
  run.assemble().unwrap();
  run.apply_constraints().unwrap();
  let (galmat, galvec) = run.system().unwrap();
  let (galmat, galvec) = (galmat.clone(), galvec.clone());

  let solver = LinearSolver::new(HeatConfig::default().solver);
  let (first, _) = solver.solve(&galmat, &galvec).unwrap();
  let (second, _) = solver.solve(&galmat, &galvec).unwrap();
  assert_eq!(first, second);

  run.solve().unwrap();
  let field = run.finish().unwrap();
  assert_eq!(field.values(), &first);
  assert_eq!(solve(mesh, inlet_outlet()), field);
}

//! Solvers for the constrained linear system of equations.

use crate::{
  assemble::GalVec,
  error::{Error, Result},
  sparse::{CsrMatrix, SparseMatrix},
  util,
};

use faer::solvers::SpSolver;
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMode {
  /// Sparse LU factorization.
  #[default]
  Direct,
  /// Preconditioned BiCGSTAB.
  Iterative,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preconditioner {
  #[default]
  Jacobi,
  None,
}

/// Parameters of a single solve attempt.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverSettings {
  pub mode: SolverMode,
  /// Relative residual at which the iterative solver stops.
  pub tolerance: f64,
  pub max_iterations: usize,
  pub preconditioner: Preconditioner,
}
impl Default for SolverSettings {
  fn default() -> Self {
    Self {
      mode: SolverMode::Direct,
      tolerance: 1e-10,
      max_iterations: 1000,
      preconditioner: Preconditioner::Jacobi,
    }
  }
}
impl SolverSettings {
  pub fn direct() -> Self {
    Self::default()
  }
  pub fn iterative(tolerance: f64, max_iterations: usize, preconditioner: Preconditioner) -> Self {
    Self {
      mode: SolverMode::Iterative,
      tolerance,
      max_iterations,
      preconditioner,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
  pub mode: SolverMode,
  pub tolerance: f64,
  pub max_iterations: usize,
  pub preconditioner: Preconditioner,
  /// Settings for a single retry after the primary attempt failed to
  /// converge.
  pub fallback: Option<SolverSettings>,
}
impl Default for SolverConfig {
  fn default() -> Self {
    SolverSettings::default().into()
  }
}
impl From<SolverSettings> for SolverConfig {
  fn from(settings: SolverSettings) -> Self {
    Self {
      mode: settings.mode,
      tolerance: settings.tolerance,
      max_iterations: settings.max_iterations,
      preconditioner: settings.preconditioner,
      fallback: None,
    }
  }
}
impl SolverConfig {
  pub fn settings(&self) -> SolverSettings {
    SolverSettings {
      mode: self.mode,
      tolerance: self.tolerance,
      max_iterations: self.max_iterations,
      preconditioner: self.preconditioner,
    }
  }
  pub fn with_fallback(mut self, fallback: SolverSettings) -> Self {
    self.fallback = Some(fallback);
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveStats {
  /// Zero for the direct solver.
  pub iterations: usize,
  /// Relative residual `|b - A x| / |b|` of the returned solution.
  pub residual: f64,
}

#[derive(Debug, Clone)]
pub struct LinearSolver {
  config: SolverConfig,
}
impl LinearSolver {
  pub fn new(config: SolverConfig) -> Self {
    Self { config }
  }
  pub fn config(&self) -> &SolverConfig {
    &self.config
  }

  /// Solves `galmat * x = galvec` without modifying either.
  pub fn solve(&self, galmat: &SparseMatrix, galvec: &GalVec) -> Result<(GalVec, SolveStats)> {
    check_system(galmat, galvec)?;

    let primary = self.config.settings();
    match (solve_with(&primary, galmat, galvec), self.config.fallback) {
      (
        Err(Error::Convergence {
          iterations,
          residual,
          ..
        }),
        Some(fallback),
      ) => {
        warn!(
          "{:?} solve stalled after {iterations} iterations at residual {residual:e}, \
           retrying with {:?}",
          primary.mode, fallback.mode
        );
        solve_with(&fallback, galmat, galvec)
      }
      (result, _) => result,
    }
  }
}

fn check_system(galmat: &SparseMatrix, galvec: &GalVec) -> Result<()> {
  if !galmat.is_square() || galmat.nrows() != galvec.len() {
    return Err(Error::InvalidMatrix(format!(
      "cannot solve {}x{} system with {} rhs entries",
      galmat.nrows(),
      galmat.ncols(),
      galvec.len()
    )));
  }
  if galmat.nrows() == 0 {
    return Err(Error::SingularMatrix { row: None });
  }

  let empty_rows: Vec<bool> = galmat.occupied_rows().into_iter().map(|o| !o).collect();
  let empty_rows = util::flags_to_indicies(&empty_rows);
  if let Some(&row) = empty_rows.first() {
    debug!("{} of {} rows are empty", empty_rows.len(), galmat.nrows());
    return Err(Error::SingularMatrix { row: Some(row) });
  }
  Ok(())
}

fn solve_with(
  settings: &SolverSettings,
  galmat: &SparseMatrix,
  galvec: &GalVec,
) -> Result<(GalVec, SolveStats)> {
  let (galsol, stats) = match settings.mode {
    SolverMode::Direct => {
      let galsol = FaerLu::new(galmat)?.solve(galvec)?;
      let residual = relative_residual(&galmat.to_nalgebra_csr()?, &galsol, galvec);
      // a factorization of a numerically singular matrix still yields a
      // finite vector, but it does not satisfy the system
      if residual > f64::EPSILON.sqrt() {
        debug!("direct solve left relative residual {residual:e}");
        return Err(Error::SingularMatrix { row: None });
      }
      let stats = SolveStats {
        iterations: 0,
        residual,
      };
      (galsol, stats)
    }
    SolverMode::Iterative => {
      let csr = galmat.to_nalgebra_csr()?;
      BiCgStab::new(settings).solve(&csr, galvec)?
    }
  };
  info!(
    "{:?} solve of {} unknowns finished ({} iterations, residual {:e})",
    settings.mode,
    galvec.len(),
    stats.iterations,
    stats.residual
  );
  Ok((galsol, stats))
}

fn relative_residual(a: &CsrMatrix, x: &GalVec, b: &GalVec) -> f64 {
  let bnorm = b.norm();
  let rnorm = (b - a * x).norm();
  if bnorm == 0.0 {
    rnorm
  } else {
    rnorm / bnorm
  }
}

pub struct FaerLu {
  raw: faer::sparse::linalg::solvers::Lu<usize, f64>,
}
impl FaerLu {
  pub fn new(a: &SparseMatrix) -> Result<Self> {
    let raw = a
      .to_faer_csc()?
      .sp_lu()
      .map_err(|_| Error::SingularMatrix { row: None })?;
    Ok(Self { raw })
  }

  pub fn solve(&self, b: &GalVec) -> Result<GalVec> {
    let b = faer::col::from_slice(b.as_slice());
    let x = na::DVector::from_vec(self.raw.solve(b).as_slice().to_vec());
    if x.iter().all(|v| v.is_finite()) {
      Ok(x)
    } else {
      Err(Error::SingularMatrix { row: None })
    }
  }
}

/// Biconjugate gradient stabilized method, right preconditioned.
struct BiCgStab {
  tolerance: f64,
  max_iterations: usize,
  preconditioner: Preconditioner,
}
impl BiCgStab {
  const BREAKDOWN: f64 = 1e-300;

  fn new(settings: &SolverSettings) -> Self {
    Self {
      tolerance: settings.tolerance,
      max_iterations: settings.max_iterations,
      preconditioner: settings.preconditioner,
    }
  }

  fn inv_diagonal(&self, a: &CsrMatrix) -> GalVec {
    match self.preconditioner {
      Preconditioner::Jacobi => {
        let mut diagonal = na::DVector::<f64>::zeros(a.nrows());
        for (i, _, &v) in a.diagonal_as_csr().triplet_iter() {
          diagonal[i] += v;
        }
        diagonal.map(|d| if d != 0.0 { 1.0 / d } else { 1.0 })
      }
      Preconditioner::None => na::DVector::from_element(a.nrows(), 1.0),
    }
  }

  fn solve(&self, a: &CsrMatrix, b: &GalVec) -> Result<(GalVec, SolveStats)> {
    let n = b.len();
    let bnorm = b.norm();
    let mut x = na::DVector::zeros(n);
    if bnorm == 0.0 {
      let stats = SolveStats {
        iterations: 0,
        residual: 0.0,
      };
      return Ok((x, stats));
    }

    let precond = self.inv_diagonal(a);
    let mut r = b.clone();
    let mut r_hat = r.clone();
    let mut p = na::DVector::zeros(n);
    let mut v = na::DVector::zeros(n);
    let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);
    let mut residual = 1.0;

    let convergence_error = |iterations: usize, residual: f64| Error::Convergence {
      iterations,
      residual,
      tolerance: self.tolerance,
    };

    for iter in 0..self.max_iterations {
      let rho_prev = rho;
      rho = r_hat.dot(&r);
      let mut restart = iter == 0;
      if rho.abs() < Self::BREAKDOWN {
        // shadow residual became orthogonal to r, e.g. after eliminated rows
        // were satisfied, so restart the directions from the current residual
        r_hat.copy_from(&r);
        rho = r_hat.dot(&r);
        if rho < Self::BREAKDOWN {
          return Err(convergence_error(iter, residual));
        }
        debug!("restarting BiCGSTAB at iteration {iter}");
        restart = true;
      }

      if restart {
        p.copy_from(&r);
      } else {
        let beta = (rho / rho_prev) * (alpha / omega);
        p = &r + beta * (&p - omega * &v);
      }

      let p_hat = p.component_mul(&precond);
      v = a * &p_hat;
      let rhat_v = r_hat.dot(&v);
      if rhat_v.abs() < Self::BREAKDOWN {
        return Err(convergence_error(iter, residual));
      }
      alpha = rho / rhat_v;

      let s = &r - alpha * &v;
      residual = s.norm() / bnorm;
      if residual <= self.tolerance {
        x += alpha * &p_hat;
        let stats = SolveStats {
          iterations: iter + 1,
          residual,
        };
        return Ok((x, stats));
      }

      let s_hat = s.component_mul(&precond);
      let t = a * &s_hat;
      let t_t = t.dot(&t);
      if t_t < Self::BREAKDOWN {
        return Err(convergence_error(iter + 1, residual));
      }
      omega = t.dot(&s) / t_t;

      x += alpha * &p_hat + omega * &s_hat;
      r = s - omega * &t;
      residual = r.norm() / bnorm;

      if residual <= self.tolerance {
        let stats = SolveStats {
          iterations: iter + 1,
          residual,
        };
        return Ok((x, stats));
      }
      if omega.abs() < Self::BREAKDOWN {
        return Err(convergence_error(iter + 1, residual));
      }
    }

    Err(convergence_error(self.max_iterations, residual))
  }
}

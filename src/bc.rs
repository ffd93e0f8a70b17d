//! Essential (Dirichlet) boundary conditions on named regions.

use crate::{
  assemble::GalVec,
  error::{Error, Result},
  region::RegionIndex,
  sparse::SparseMatrix,
  util, NodeIdx,
};

use serde::Deserialize;
use tracing::{debug, warn};

/// Prescribes `value` for `variable` on every node of `region`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirichletBc {
  pub region: String,
  pub variable: String,
  pub value: f64,
}
impl DirichletBc {
  pub fn new(region: impl Into<String>, variable: impl Into<String>, value: f64) -> Self {
    Self {
      region: region.into(),
      variable: variable.into(),
      value,
    }
  }
}

/// How constrained rows are removed from the system.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Elimination {
  /// Constrained rows become identity rows.
  #[default]
  Row,
  /// Additionally lifts the known values out of the free rows and clears
  /// the constrained columns, keeping a symmetric matrix symmetric.
  Symmetric,
}

/// What happens when a node is constrained by more than one condition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
  /// Conflicting values are an error. Repeating the same value is fine.
  #[default]
  Reject,
  /// The condition applied last determines the value.
  LastWins,
}

#[derive(Debug, Clone)]
pub struct BcApplier {
  variable: String,
  policy: DuplicatePolicy,
  elimination: Elimination,
}
impl BcApplier {
  pub fn new(variable: impl Into<String>, policy: DuplicatePolicy, elimination: Elimination) -> Self {
    Self {
      variable: variable.into(),
      policy,
      elimination,
    }
  }

  pub fn variable(&self) -> &str {
    &self.variable
  }

  /// Resolves the conditions, in the given order, to one value per
  /// constrained node.
  pub fn collect(
    &self,
    nnodes: usize,
    regions: &RegionIndex,
    bcs: &[DirichletBc],
  ) -> Result<Vec<(NodeIdx, f64)>> {
    let mut dof_coeffs: Vec<Option<f64>> = vec![None; nnodes];
    for bc in bcs {
      if bc.variable != self.variable {
        return Err(Error::UnknownVariable {
          found: bc.variable.clone(),
          expected: self.variable.clone(),
        });
      }
      let region = regions.lookup(&bc.region)?;
      for &inode in region.nodes() {
        let slot = dof_coeffs.get_mut(inode).ok_or_else(|| {
          Error::InvalidMatrix(format!(
            "region `{}` holds node {inode}, but the system has {nnodes} rows",
            bc.region
          ))
        })?;
        match (*slot, self.policy) {
          (Some(previous), DuplicatePolicy::Reject) if previous != bc.value => {
            return Err(Error::DuplicateConstraint {
              node: inode,
              previous,
              value: bc.value,
            });
          }
          (Some(previous), DuplicatePolicy::LastWins) if previous != bc.value => {
            warn!(
              "node {inode} of region `{}` overrides value {previous} with {}",
              bc.region, bc.value
            );
          }
          _ => {}
        }
        *slot = Some(bc.value);
      }
    }
    Ok(util::dense_to_sparse_data(dof_coeffs))
  }

  /// Enforces the conditions on the linear system.
  ///
  /// Afterwards every constrained row is an identity row and the right hand
  /// side holds the prescribed value. Returns the applied constraints.
  pub fn apply(
    &self,
    galmat: &mut SparseMatrix,
    galvec: &mut GalVec,
    regions: &RegionIndex,
    bcs: &[DirichletBc],
  ) -> Result<Vec<(NodeIdx, f64)>> {
    if !galmat.is_square() || galmat.nrows() != galvec.len() {
      return Err(Error::InvalidMatrix(format!(
        "system of {}x{} matrix and {} rhs entries",
        galmat.nrows(),
        galmat.ncols(),
        galvec.len()
      )));
    }

    let dof_coeffs = self.collect(galmat.nrows(), regions, bcs)?;
    match self.elimination {
      Elimination::Row => fix_dofs_rows(&dof_coeffs, galmat, galvec),
      Elimination::Symmetric => fix_dofs_symmetric(&dof_coeffs, galmat, galvec)?,
    }
    debug!(
      "constrained {} of {} nodes by {:?} elimination",
      dof_coeffs.len(),
      galmat.nrows(),
      self.elimination
    );
    Ok(dof_coeffs)
  }
}

/// $mat(A_0, A_(0 diff); 0, I) vec(mu_0, mu_diff) = vec(phi, gamma)$
pub fn fix_dofs_rows(dof_coeffs: &[(NodeIdx, f64)], galmat: &mut SparseMatrix, galvec: &mut GalVec) {
  let dofs: Vec<_> = dof_coeffs.iter().map(|&(i, _)| i).collect();
  let dof_flags = util::indicies_to_flags(&dofs, galmat.nrows());

  galmat.set_zero(|r, _| dof_flags[r]);
  for &(i, v) in dof_coeffs {
    galmat.push(i, i, 1.0);
    galvec[i] = v;
  }
}

/// $mat(A_0, 0; 0, I) vec(mu_0, mu_diff) = vec(phi - A_(0 diff) gamma, gamma)$
pub fn fix_dofs_symmetric(
  dof_coeffs: &[(NodeIdx, f64)],
  galmat: &mut SparseMatrix,
  galvec: &mut GalVec,
) -> Result<()> {
  let ndofs = galmat.nrows();

  let dof_coeffs_opt = util::sparse_to_dense_data(dof_coeffs.to_vec(), ndofs);
  let dof_coeffs_zeroed =
    na::DVector::from_iterator(ndofs, dof_coeffs_opt.iter().map(|v| v.unwrap_or(0.0)));

  *galvec -= galmat.to_nalgebra_csr()? * dof_coeffs_zeroed;
  galmat.set_zero(|r, c| dof_coeffs_opt[r].is_some() || dof_coeffs_opt[c].is_some());
  for &(i, v) in dof_coeffs {
    galmat.push(i, i, 1.0);
    galvec[i] = v;
  }
  Ok(())
}

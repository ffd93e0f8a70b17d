use crate::{
  error::Result,
  fe::{CellGeometry, ElmatProvider, ElvecProvider},
  mesh::Mesh,
  sparse::SparseMatrix,
  ElementIdx,
};

use rayon::prelude::*;
use tracing::debug;

pub type GalVec = na::DVector<f64>;

fn local_triplets(
  mesh: &Mesh,
  icell: ElementIdx,
  elmat: &impl ElmatProvider,
) -> Result<Vec<(usize, usize, f64)>> {
  let cell = mesh.element(icell);
  let geo = CellGeometry::from_mesh(mesh, icell, cell);
  let elmat = elmat.eval(&geo)?;

  let nodes = cell.nodes();
  let mut triplets = Vec::with_capacity(nodes.len() * nodes.len());
  for (ilocal, &iglobal) in nodes.iter().enumerate() {
    for (jlocal, &jglobal) in nodes.iter().enumerate() {
      let val = elmat[(ilocal, jlocal)];
      if val != 0.0 {
        triplets.push((iglobal, jglobal, val));
      }
    }
  }
  Ok(triplets)
}

/// Assembly algorithm for the Galerkin Matrix.
///
/// Cells are visited in mesh order and their element matrices are
/// scattered into a square matrix with one row per node.
pub fn assemble_galmat(mesh: &Mesh, elmat: impl ElmatProvider) -> Result<SparseMatrix> {
  let nnodes = mesh.node_count();
  let mut galmat = SparseMatrix::zeros(nnodes, nnodes);
  for &icell in mesh.cell_indices() {
    galmat.extend(local_triplets(mesh, icell, &elmat)?);
  }
  debug!(
    "assembled galmat {nnodes}x{nnodes} from {} cells with {} triplets",
    mesh.ncells(),
    galmat.ntriplets()
  );
  Ok(galmat)
}

/// Parallel variant of [`assemble_galmat`].
///
/// Each rayon worker accumulates its own triplets, which are concatenated
/// once all cells are processed.
pub fn assemble_galmat_par(mesh: &Mesh, elmat: impl ElmatProvider) -> Result<SparseMatrix> {
  let nnodes = mesh.node_count();
  let triplets = mesh
    .cell_indices()
    .par_iter()
    .try_fold(Vec::new, |mut acc, &icell| {
      acc.extend(local_triplets(mesh, icell, &elmat)?);
      Ok(acc)
    })
    .try_reduce(Vec::new, |mut a, mut b| {
      a.append(&mut b);
      Ok(a)
    })?;

  let galmat = SparseMatrix::new(nnodes, nnodes, triplets);
  debug!(
    "assembled galmat {nnodes}x{nnodes} from {} cells on {} threads",
    mesh.ncells(),
    rayon::current_num_threads()
  );
  Ok(galmat)
}

/// Assembly algorithm for the Galerkin Vector.
pub fn assemble_galvec(mesh: &Mesh, elvec: impl ElvecProvider) -> Result<GalVec> {
  let mut galvec = na::DVector::zeros(mesh.node_count());
  for (icell, cell) in mesh.cells() {
    let geo = CellGeometry::from_mesh(mesh, icell, cell);
    let elvec = elvec.eval(&geo)?;
    for (ilocal, &iglobal) in cell.nodes().iter().enumerate() {
      galvec[iglobal] += elvec[ilocal];
    }
  }
  Ok(galvec)
}

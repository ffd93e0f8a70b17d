//! Triplet storage for the global stiffness matrix.
//!
//! Entries are accumulated unordered during assembly, duplicates included.
//! Freezing into a compressed format sums the duplicates.

use crate::error::{Error, Result};

pub type CsrMatrix = nas::CsrMatrix<f64>;

#[derive(Default, Debug, Clone)]
pub struct SparseMatrix {
  nrows: usize,
  ncols: usize,
  triplets: Vec<(usize, usize, f64)>,
}

impl SparseMatrix {
  pub fn zeros(nrows: usize, ncols: usize) -> Self {
    Self::new(nrows, ncols, Vec::new())
  }
  pub fn new(nrows: usize, ncols: usize, triplets: Vec<(usize, usize, f64)>) -> Self {
    Self {
      nrows,
      ncols,
      triplets,
    }
  }

  pub fn nrows(&self) -> usize {
    self.nrows
  }
  pub fn ncols(&self) -> usize {
    self.ncols
  }
  pub fn is_square(&self) -> bool {
    self.nrows == self.ncols
  }
  pub fn triplets(&self) -> &[(usize, usize, f64)] {
    &self.triplets
  }
  pub fn ntriplets(&self) -> usize {
    self.triplets.len()
  }

  pub fn push(&mut self, r: usize, c: usize, v: f64) {
    assert!(r < self.nrows() && c < self.ncols());
    if v != 0.0 {
      self.triplets.push((r, c, v));
    }
  }

  pub fn extend(&mut self, triplets: impl IntoIterator<Item = (usize, usize, f64)>) {
    for (r, c, v) in triplets {
      self.push(r, c, v);
    }
  }

  pub fn set_zero<F>(&mut self, predicate: F)
  where
    F: Fn(usize, usize) -> bool,
  {
    let mut i = 0;
    while i < self.triplets.len() {
      let triplet = self.triplets[i];
      let r = triplet.0;
      let c = triplet.1;
      if predicate(r, c) {
        self.triplets.swap_remove(i);
      } else {
        i += 1;
      }
    }
  }

  /// Flags every row that holds at least one nonzero entry.
  pub fn occupied_rows(&self) -> Vec<bool> {
    let mut occupied = vec![false; self.nrows];
    for &(r, _, v) in &self.triplets {
      if v != 0.0 {
        occupied[r] = true;
      }
    }
    occupied
  }

  pub fn to_nalgebra_coo(&self) -> Result<nas::CooMatrix<f64>> {
    let rows = self.triplets.iter().map(|t| t.0).collect();
    let cols = self.triplets.iter().map(|t| t.1).collect();
    let vals = self.triplets.iter().map(|t| t.2).collect();
    nas::CooMatrix::try_from_triplets(self.nrows, self.ncols, rows, cols, vals)
      .map_err(|err| Error::InvalidMatrix(err.to_string()))
  }

  /// Compressed row form, duplicate entries summed.
  pub fn to_nalgebra_csr(&self) -> Result<CsrMatrix> {
    Ok((&self.to_nalgebra_coo()?).into())
  }

  pub fn to_nalgebra_dense(&self) -> Result<na::DMatrix<f64>> {
    Ok((&self.to_nalgebra_coo()?).into())
  }

  pub fn to_faer_csc(&self) -> Result<faer::sparse::SparseColMat<usize, f64>> {
    faer::sparse::SparseColMat::try_new_from_triplets(self.nrows, self.ncols, &self.triplets)
      .map_err(|err| Error::InvalidMatrix(format!("{err:?}")))
  }
}

use crate::{Dim, NodeIdx};

#[derive(Debug, Clone)]
pub struct NodeCoords {
  /// The node coordinates in the columns of a matrix.
  matrix: na::DMatrix<f64>,
}
impl NodeCoords {
  pub fn new(matrix: na::DMatrix<f64>) -> Self {
    Self { matrix }
  }

  pub fn from_columns(dim: Dim, columns: &[na::DVector<f64>]) -> Self {
    if columns.is_empty() {
      return Self::new(na::DMatrix::zeros(dim, 0));
    }
    Self::new(na::DMatrix::from_columns(columns))
  }

  pub fn dim(&self) -> Dim {
    self.matrix.nrows()
  }
  pub fn nnodes(&self) -> usize {
    self.matrix.ncols()
  }

  pub fn coord(&self, inode: NodeIdx) -> na::DVectorView<f64> {
    self.matrix.column(inode)
  }

  pub fn matrix(&self) -> &na::DMatrix<f64> {
    &self.matrix
  }

  /// The coordinates of the given nodes, gathered column by column.
  pub fn element_coords(&self, nodes: &[NodeIdx]) -> na::DMatrix<f64> {
    let mut coords = na::DMatrix::zeros(self.dim(), nodes.len());
    for (i, &inode) in nodes.iter().enumerate() {
      coords.set_column(i, &self.coord(inode));
    }
    coords
  }

  pub fn eval_coord_fn<F>(&self, f: F) -> na::DVector<f64>
  where
    F: FnMut(na::DVectorView<f64>) -> f64,
  {
    na::DVector::from_iterator(self.nnodes(), self.matrix.column_iter().map(f))
  }

  /// Drops trailing axes on which every node has coordinate zero,
  /// so that planar meshes stored with three components become 2D.
  /// At least `min_dim` axes are kept.
  pub fn trim_trailing_zero_axes(mut self, min_dim: Dim) -> Self {
    while self.dim() > min_dim.max(1) {
      let last = self.dim() - 1;
      if self.matrix.row(last).iter().any(|&x| x != 0.0) {
        break;
      }
      self.matrix = self.matrix.remove_row(last);
    }
    self
  }
}

#[cfg(test)]
mod test {
  use super::NodeCoords;

  #[test]
  fn planar_coords_are_trimmed() {
    let coords = NodeCoords::new(na::DMatrix::from_column_slice(
      3,
      3,
      &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0],
    ));
    let coords = coords.trim_trailing_zero_axes(1);
    assert_eq!(coords.dim(), 2);
    assert_eq!(coords.coord(2)[1], 2.0);
  }

  #[test]
  fn trim_keeps_minimum_dimension() {
    let coords = NodeCoords::new(na::DMatrix::from_column_slice(
      3,
      2,
      &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    ));
    assert_eq!(coords.clone().trim_trailing_zero_axes(1).dim(), 1);
    assert_eq!(coords.trim_trailing_zero_axes(2).dim(), 2);
  }

  #[test]
  fn element_coords_gather_columns() {
    let coords = NodeCoords::new(na::DMatrix::from_column_slice(1, 3, &[0.0, 0.5, 2.0]));
    let gathered = coords.element_coords(&[2, 0]);
    assert_eq!(gathered, na::DMatrix::from_row_slice(1, 2, &[2.0, 0.0]));
    let squared = coords.eval_coord_fn(|x| x[0] * x[0]);
    assert_eq!(squared[2], 4.0);
  }
}

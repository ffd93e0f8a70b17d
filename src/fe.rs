//! Lagrangian first order finite elements for the scalar diffusion operator.
//!
//! Local matrices are computed on the physical element through the
//! reference element, using the metric tensor $G = J^T J$ of the element
//! map. This covers cells whose dimension is lower than the dimension of
//! the space the nodes live in (e.g. a triangle mesh stored with three
//! coordinates).

use crate::{
  error::{Error, Result},
  mesh::{Element, ElementKind, Mesh},
  quadrature::{rule_for, QuadRule},
  ElementIdx,
};

/// Values of the reference shape functions at `x`.
pub fn ref_shape_values(kind: ElementKind, x: na::DVectorView<f64>) -> na::DVector<f64> {
  match kind {
    ElementKind::Point => na::DVector::from_element(1, 1.0),
    ElementKind::Line => na::DVector::from_column_slice(&[1.0 - x[0], x[0]]),
    ElementKind::Triangle => na::DVector::from_column_slice(&[1.0 - x[0] - x[1], x[0], x[1]]),
    ElementKind::Quad => {
      let (s, t) = (x[0], x[1]);
      na::DVector::from_column_slice(&[
        0.25 * (1.0 - s) * (1.0 - t),
        0.25 * (1.0 + s) * (1.0 - t),
        0.25 * (1.0 + s) * (1.0 + t),
        0.25 * (1.0 - s) * (1.0 + t),
      ])
    }
    ElementKind::Tetrahedron => {
      na::DVector::from_column_slice(&[1.0 - x[0] - x[1] - x[2], x[0], x[1], x[2]])
    }
  }
}

/// Gradients of the reference shape functions at `x`,
/// one column per shape function.
pub fn ref_shape_gradients(kind: ElementKind, x: na::DVectorView<f64>) -> na::DMatrix<f64> {
  match kind {
    ElementKind::Point => na::DMatrix::zeros(0, 1),
    ElementKind::Line => na::DMatrix::from_row_slice(1, 2, &[-1.0, 1.0]),
    #[rustfmt::skip]
    ElementKind::Triangle => na::DMatrix::from_row_slice(2, 3, &[
      -1.0, 1.0, 0.0,
      -1.0, 0.0, 1.0,
    ]),
    ElementKind::Quad => {
      let (s, t) = (x[0], x[1]);
      #[rustfmt::skip]
      let grads = na::DMatrix::from_row_slice(2, 4, &[
        -0.25 * (1.0 - t),  0.25 * (1.0 - t), 0.25 * (1.0 + t), -0.25 * (1.0 + t),
        -0.25 * (1.0 - s), -0.25 * (1.0 + s), 0.25 * (1.0 + s),  0.25 * (1.0 - s),
      ]);
      grads
    }
    #[rustfmt::skip]
    ElementKind::Tetrahedron => na::DMatrix::from_row_slice(3, 4, &[
      -1.0, 1.0, 0.0, 0.0,
      -1.0, 0.0, 1.0, 0.0,
      -1.0, 0.0, 0.0, 1.0,
    ]),
  }
}

/// A single element together with the coordinates of its nodes.
#[derive(Debug, Clone)]
pub struct CellGeometry {
  index: ElementIdx,
  kind: ElementKind,
  /// Node coordinates in the columns.
  coords: na::DMatrix<f64>,
}
impl CellGeometry {
  pub fn new(index: ElementIdx, kind: ElementKind, coords: na::DMatrix<f64>) -> Self {
    assert_eq!(coords.ncols(), kind.nnodes());
    Self {
      index,
      kind,
      coords,
    }
  }
  pub fn from_mesh(mesh: &Mesh, index: ElementIdx, element: &Element) -> Self {
    let coords = mesh.coords().element_coords(element.nodes());
    Self::new(index, element.kind(), coords)
  }

  pub fn index(&self) -> ElementIdx {
    self.index
  }
  pub fn kind(&self) -> ElementKind {
    self.kind
  }
  pub fn nnodes(&self) -> usize {
    self.coords.ncols()
  }
  pub fn quad_rule(&self) -> &'static QuadRule {
    rule_for(self.kind)
  }

  /// Jacobian of the reference-to-physical map at the reference point `x`.
  pub fn jacobian(&self, x: na::DVectorView<f64>) -> na::DMatrix<f64> {
    &self.coords * ref_shape_gradients(self.kind, x).transpose()
  }

  /// Metric tensor $G = J^T J$ at the reference point `x`.
  pub fn metric_tensor(&self, x: na::DVectorView<f64>) -> na::DMatrix<f64> {
    let jacobian = self.jacobian(x);
    jacobian.transpose() * jacobian
  }

  /// Volume scaling of the element map at `x`.
  ///
  /// Signed jacobian determinant for full dimensional cells, square root of
  /// the gram determinant for embedded ones. Must be positive.
  pub fn det(&self, x: na::DVectorView<f64>) -> Result<f64> {
    let jacobian = self.jacobian(x);
    let det = if jacobian.is_square() {
      jacobian.determinant()
    } else {
      (jacobian.transpose() * &jacobian).determinant().max(0.0).sqrt()
    };
    if det > 0.0 {
      Ok(det)
    } else {
      Err(Error::DegenerateElement {
        element: self.index,
        det,
      })
    }
  }

  /// The (unsigned) volume of the element.
  pub fn vol(&self) -> Result<f64> {
    self
      .quad_rule()
      .iter()
      .map(|(x, w)| Ok(w * self.det(x)?))
      .sum()
  }
}

pub trait ElmatProvider: Sync {
  fn eval(&self, cell: &CellGeometry) -> Result<na::DMatrix<f64>>;
}
impl<F> ElmatProvider for F
where
  F: Fn(&CellGeometry) -> Result<na::DMatrix<f64>> + Sync,
{
  fn eval(&self, cell: &CellGeometry) -> Result<na::DMatrix<f64>> {
    self(cell)
  }
}

pub trait ElvecProvider: Sync {
  fn eval(&self, cell: &CellGeometry) -> Result<na::DVector<f64>>;
}
impl<F> ElvecProvider for F
where
  F: Fn(&CellGeometry) -> Result<na::DVector<f64>> + Sync,
{
  fn eval(&self, cell: &CellGeometry) -> Result<na::DVector<f64>> {
    self(cell)
  }
}

/// Element Matrix Provider for the steady diffusion operator
/// $-div(k grad u)$ with constant conductivity $k$.
///
/// $A_(a b) = sum_q w_q k (grad N_a)^T G^(-1) grad N_b sqrt(det G)$
#[derive(Debug, Clone, Copy)]
pub struct DiffusionElmat {
  conductivity: f64,
}
impl DiffusionElmat {
  pub fn new(conductivity: f64) -> Self {
    Self { conductivity }
  }
}
impl Default for DiffusionElmat {
  fn default() -> Self {
    Self::new(1.0)
  }
}
impl ElmatProvider for DiffusionElmat {
  fn eval(&self, cell: &CellGeometry) -> Result<na::DMatrix<f64>> {
    let n = cell.nnodes();
    let mut elmat = na::DMatrix::zeros(n, n);
    if cell.kind() == ElementKind::Point {
      return Ok(elmat);
    }

    for (x, w) in cell.quad_rule().iter() {
      let det = cell.det(x)?;
      let ref_grads = ref_shape_gradients(cell.kind(), x);
      let covector_gramian = cell
        .metric_tensor(x)
        .try_inverse()
        .ok_or(Error::DegenerateElement {
          element: cell.index(),
          det,
        })?;
      elmat += (w * self.conductivity * det) * ref_grads.transpose() * covector_gramian * ref_grads;
    }
    Ok(elmat)
  }
}

/// Element Vector Provider for a constant volumetric heat source.
#[derive(Debug, Clone, Copy)]
pub struct SourceElvec {
  source: f64,
}
impl SourceElvec {
  pub fn new(source: f64) -> Self {
    Self { source }
  }
}
impl ElvecProvider for SourceElvec {
  fn eval(&self, cell: &CellGeometry) -> Result<na::DVector<f64>> {
    let mut elvec = na::DVector::zeros(cell.nnodes());
    if self.source == 0.0 {
      return Ok(elvec);
    }
    for (x, w) in cell.quad_rule().iter() {
      let det = cell.det(x)?;
      elvec += (w * self.source * det) * ref_shape_values(cell.kind(), x);
    }
    Ok(elvec)
  }
}

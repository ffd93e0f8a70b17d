use crate::{mesh::ElementKind, Dim};

use once_cell::sync::Lazy;

/// A quadrature rule defined on a reference element.
///
/// Reference elements: `[0,1]` for lines, the unit simplex for triangles
/// and tetrahedra, `[-1,1]^2` for quads.
#[derive(Debug, Clone)]
pub struct QuadRule {
  /// Quadrature points in the columns.
  points: na::DMatrix<f64>,
  weights: na::DVector<f64>,
}
impl QuadRule {
  pub fn new(points: na::DMatrix<f64>, weights: na::DVector<f64>) -> Self {
    assert_eq!(points.ncols(), weights.len());
    Self { points, weights }
  }

  pub fn dim(&self) -> Dim {
    self.points.nrows()
  }
  pub fn iter(&self) -> impl Iterator<Item = (na::DVectorView<f64>, f64)> {
    self.points.column_iter().zip(self.weights.iter().copied())
  }

  pub fn apply_ref<F>(&self, f: F) -> f64
  where
    F: Fn(na::DVectorView<f64>) -> f64,
  {
    self.iter().map(|(p, w)| w * f(p)).sum()
  }
}

static POINT: Lazy<QuadRule> =
  Lazy::new(|| QuadRule::new(na::DMatrix::zeros(0, 1), na::DVector::from_element(1, 1.0)));

/// 2-point Gauss-Legendre rule on `[0,1]`.
static LINE_GAUSS2: Lazy<QuadRule> = Lazy::new(|| {
  let d = 0.5 / 3f64.sqrt();
  QuadRule::new(
    na::DMatrix::from_row_slice(1, 2, &[0.5 - d, 0.5 + d]),
    na::DVector::from_element(2, 0.5),
  )
});

/// 3-point rule, exact for quadratics.
static TRIANGLE_3: Lazy<QuadRule> = Lazy::new(|| {
  #[rustfmt::skip]
  let points = na::DMatrix::from_row_slice(2, 3, &[
    1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0,
    1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0,
  ]);
  QuadRule::new(points, na::DVector::from_element(3, 1.0 / 6.0))
});

/// 2x2 tensor Gauss-Legendre rule.
static QUAD_GAUSS2X2: Lazy<QuadRule> = Lazy::new(|| {
  let g = 1.0 / 3f64.sqrt();
  #[rustfmt::skip]
  let points = na::DMatrix::from_row_slice(2, 4, &[
    -g,  g, g, -g,
    -g, -g, g,  g,
  ]);
  QuadRule::new(points, na::DVector::from_element(4, 1.0))
});

/// 4-point rule, exact for quadratics.
static TETRAHEDRON_4: Lazy<QuadRule> = Lazy::new(|| {
  let a = 0.585_410_196_624_968_5;
  let b = 0.138_196_601_125_010_5;
  #[rustfmt::skip]
  let points = na::DMatrix::from_row_slice(3, 4, &[
    b, a, b, b,
    b, b, a, b,
    b, b, b, a,
  ]);
  QuadRule::new(points, na::DVector::from_element(4, 1.0 / 24.0))
});

/// The rule used to integrate over elements of the given kind.
pub fn rule_for(kind: ElementKind) -> &'static QuadRule {
  match kind {
    ElementKind::Point => &*POINT,
    ElementKind::Line => &*LINE_GAUSS2,
    ElementKind::Triangle => &*TRIANGLE_3,
    ElementKind::Quad => &*QUAD_GAUSS2X2,
    ElementKind::Tetrahedron => &*TETRAHEDRON_4,
  }
}

/// Volume of the reference element.
pub fn ref_vol(kind: ElementKind) -> f64 {
  match kind {
    ElementKind::Point | ElementKind::Line => 1.0,
    ElementKind::Triangle => 0.5,
    ElementKind::Quad => 4.0,
    ElementKind::Tetrahedron => 1.0 / 6.0,
  }
}

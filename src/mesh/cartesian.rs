//! Structured mesh generators for lines, rectangles and rings.
//!
//! All generated cells are positively oriented and every generator tags
//! its cells as `interior` plus one tag per boundary side.

use super::{coordinates::NodeCoords, Element, ElementKind, Mesh, MeshTags};
use crate::{
  error::{Error, Result},
  NodeIdx,
};

use std::f64::consts::TAU;

/// How the boxes of a rectangle are filled with cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
  Quads,
  Triangles,
  /// Quads in the lower half, triangles in the upper half.
  Mixed,
}

/// A segment `[offset, offset + length]` split into `ncells` lines.
///
/// Tags: `interior`, `xneg`, `xpos`.
pub fn line(ncells: usize, length: f64, offset: f64) -> Result<Mesh> {
  if ncells == 0 || !(length > 0.0) {
    return Err(Error::MeshFormat(format!(
      "cannot generate line with {ncells} cells and length {length}"
    )));
  }

  let dx = length / ncells as f64;
  let nodes: Vec<_> = (0..=ncells).map(|i| i as f64 * dx + offset).collect();
  let coords = NodeCoords::new(na::DMatrix::from_row_slice(1, nodes.len(), &nodes));

  let mut elements: Vec<_> = (0..ncells)
    .map(|i| Element::new(ElementKind::Line, vec![i, i + 1]))
    .collect();

  let mut tags = MeshTags::new();
  tags.insert("interior".to_string(), (0..ncells).collect());
  tags.insert("xneg".to_string(), vec![elements.len()]);
  elements.push(Element::new(ElementKind::Point, vec![0]));
  tags.insert("xpos".to_string(), vec![elements.len()]);
  elements.push(Element::new(ElementKind::Point, vec![ncells]));

  Mesh::from_parts(coords, elements, tags)
}

/// A rectangle split into `ncells[0] x ncells[1]` boxes.
///
/// Nodes are ordered lexicographically, x running fastest.
/// Tags: `interior`, `left`, `right`, `bottom`, `top`.
pub fn rectangle(
  ncells: [usize; 2],
  lengths: [f64; 2],
  offsets: [f64; 2],
  shape: CellShape,
) -> Result<Mesh> {
  let [nx, ny] = ncells;
  if nx == 0 || ny == 0 || !lengths.iter().all(|&l| l > 0.0) {
    return Err(Error::MeshFormat(format!(
      "cannot generate rectangle with {nx}x{ny} cells and lengths {lengths:?}"
    )));
  }

  let node = |i: usize, j: usize| -> NodeIdx { j * (nx + 1) + i };
  let dx = lengths[0] / nx as f64;
  let dy = lengths[1] / ny as f64;

  let mut coords = na::DMatrix::zeros(2, (nx + 1) * (ny + 1));
  for j in 0..=ny {
    for i in 0..=nx {
      coords[(0, node(i, j))] = i as f64 * dx + offsets[0];
      coords[(1, node(i, j))] = j as f64 * dy + offsets[1];
    }
  }

  let mut elements = Vec::new();
  for j in 0..ny {
    let split = match shape {
      CellShape::Quads => false,
      CellShape::Triangles => true,
      CellShape::Mixed => 2 * j >= ny,
    };
    for i in 0..nx {
      let a = node(i, j);
      let b = node(i + 1, j);
      let c = node(i + 1, j + 1);
      let d = node(i, j + 1);
      if split {
        elements.push(Element::new(ElementKind::Triangle, vec![a, b, c]));
        elements.push(Element::new(ElementKind::Triangle, vec![a, c, d]));
      } else {
        elements.push(Element::new(ElementKind::Quad, vec![a, b, c, d]));
      }
    }
  }

  let mut tags = MeshTags::new();
  tags.insert("interior".to_string(), (0..elements.len()).collect());

  let sides: [(&str, Vec<[NodeIdx; 2]>); 4] = [
    ("left", (0..ny).map(|j| [node(0, j + 1), node(0, j)]).collect()),
    ("right", (0..ny).map(|j| [node(nx, j), node(nx, j + 1)]).collect()),
    ("bottom", (0..nx).map(|i| [node(i, 0), node(i + 1, 0)]).collect()),
    ("top", (0..nx).map(|i| [node(i + 1, ny), node(i, ny)]).collect()),
  ];
  for (name, edges) in sides {
    let start = elements.len();
    elements.extend(
      edges
        .into_iter()
        .map(|edge| Element::new(ElementKind::Line, edge.to_vec())),
    );
    tags.insert(name.to_string(), (start..elements.len()).collect());
  }

  Mesh::from_parts(NodeCoords::new(coords), elements, tags)
}

/// A ring between the radii `inner` and `outer`, centered at the origin,
/// split into `nradial` layers of `nangular` sectors, each sector cut into
/// two triangles.
///
/// Tags: `interior`, `inner`, `outer`.
pub fn annulus(nradial: usize, nangular: usize, inner: f64, outer: f64) -> Result<Mesh> {
  if nradial == 0 || nangular < 3 || !(inner > 0.0 && outer > inner) {
    return Err(Error::MeshFormat(format!(
      "cannot generate annulus with {nradial}x{nangular} cells and radii {inner}, {outer}"
    )));
  }

  let node = |k: usize, m: usize| -> NodeIdx { k * nangular + m % nangular };
  let dr = (outer - inner) / nradial as f64;

  let mut coords = na::DMatrix::zeros(2, (nradial + 1) * nangular);
  for k in 0..=nradial {
    let r = inner + k as f64 * dr;
    for m in 0..nangular {
      let phi = TAU * m as f64 / nangular as f64;
      coords[(0, node(k, m))] = r * phi.cos();
      coords[(1, node(k, m))] = r * phi.sin();
    }
  }

  let mut elements = Vec::new();
  for k in 0..nradial {
    for m in 0..nangular {
      let a = node(k, m);
      let b = node(k, m + 1);
      let c = node(k + 1, m + 1);
      let d = node(k + 1, m);
      elements.push(Element::new(ElementKind::Triangle, vec![a, d, c]));
      elements.push(Element::new(ElementKind::Triangle, vec![a, c, b]));
    }
  }

  let mut tags = MeshTags::new();
  tags.insert("interior".to_string(), (0..elements.len()).collect());
  for (name, k) in [("inner", 0), ("outer", nradial)] {
    let start = elements.len();
    elements.extend(
      (0..nangular).map(|m| Element::new(ElementKind::Line, vec![node(k, m), node(k, m + 1)])),
    );
    tags.insert(name.to_string(), (start..elements.len()).collect());
  }

  Mesh::from_parts(NodeCoords::new(coords), elements, tags)
}

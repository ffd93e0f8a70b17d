//! The mesh store: node coordinates, element connectivity and the boundary
//! tags embedded in the geometry.
//!
//! A mesh is built once, either by loading a Gmsh file or by one of the
//! structured generators, and is read-only afterwards.
//! The elements of highest topological dimension are the cells, which carry
//! the discretized operator. Lower dimensional elements (boundary faces,
//! edges, points) only exist to be tagged into regions.

pub mod cartesian;
pub mod coordinates;
pub mod gmsh;

use crate::{
  error::{Error, Result},
  Dim, ElementIdx, NodeIdx,
};
use coordinates::NodeCoords;

use indexmap::IndexMap;
use std::{fmt, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
  Point,
  Line,
  Triangle,
  Quad,
  Tetrahedron,
}
impl ElementKind {
  /// Topological dimension of the reference element.
  pub fn dim(self) -> Dim {
    match self {
      Self::Point => 0,
      Self::Line => 1,
      Self::Triangle | Self::Quad => 2,
      Self::Tetrahedron => 3,
    }
  }
  pub fn nnodes(self) -> usize {
    match self {
      Self::Point => 1,
      Self::Line => 2,
      Self::Triangle => 3,
      Self::Quad | Self::Tetrahedron => 4,
    }
  }
}
impl fmt::Display for ElementKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Point => "point",
      Self::Line => "line",
      Self::Triangle => "triangle",
      Self::Quad => "quad",
      Self::Tetrahedron => "tetrahedron",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
  kind: ElementKind,
  nodes: Vec<NodeIdx>,
}
impl Element {
  pub fn new(kind: ElementKind, nodes: Vec<NodeIdx>) -> Self {
    Self { kind, nodes }
  }
  pub fn kind(&self) -> ElementKind {
    self.kind
  }
  pub fn nodes(&self) -> &[NodeIdx] {
    &self.nodes
  }
  pub fn nnodes(&self) -> usize {
    self.nodes.len()
  }
}

/// Named sets of elements, in insertion order.
pub type MeshTags = IndexMap<String, Vec<ElementIdx>>;

#[derive(Debug, Clone)]
pub struct Mesh {
  coords: NodeCoords,
  elements: Vec<Element>,
  tags: MeshTags,
  /// Indices of the elements of highest dimension.
  cells: Vec<ElementIdx>,
}

// constructors
impl Mesh {
  /// Reads a Gmsh `.msh` file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    gmsh::load_gmsh(path.as_ref())
  }

  /// Builds a mesh after checking that all connectivity is consistent.
  pub fn from_parts(coords: NodeCoords, elements: Vec<Element>, tags: MeshTags) -> Result<Self> {
    let nnodes = coords.nnodes();
    if nnodes > 0 && !(1..=3).contains(&coords.dim()) {
      return Err(Error::MeshFormat(format!(
        "unsupported coordinate dimension {}",
        coords.dim()
      )));
    }

    for (ielement, element) in elements.iter().enumerate() {
      if element.nnodes() != element.kind().nnodes() {
        return Err(Error::MeshFormat(format!(
          "{} element {ielement} has {} nodes instead of {}",
          element.kind(),
          element.nnodes(),
          element.kind().nnodes()
        )));
      }
      if let Some(&inode) = element.nodes().iter().find(|&&inode| inode >= nnodes) {
        return Err(Error::MeshFormat(format!(
          "element {ielement} references node {inode}, but the mesh has {nnodes} nodes"
        )));
      }
      if element.kind().dim() > coords.dim() {
        return Err(Error::MeshFormat(format!(
          "{} element {ielement} does not fit into {} dimensions",
          element.kind(),
          coords.dim()
        )));
      }
    }

    for (name, members) in &tags {
      if let Some(&ielement) = members.iter().find(|&&i| i >= elements.len()) {
        return Err(Error::MeshFormat(format!(
          "tag `{name}` references missing element {ielement}"
        )));
      }
    }

    let cell_dim = elements.iter().map(|e| e.kind().dim()).max();
    let cells = match cell_dim {
      Some(dim) => elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind().dim() == dim)
        .map(|(i, _)| i)
        .collect(),
      None => Vec::new(),
    };

    Ok(Self {
      coords,
      elements,
      tags,
      cells,
    })
  }
}

// getters
impl Mesh {
  pub fn node_count(&self) -> usize {
    self.coords.nnodes()
  }
  pub fn element_count(&self) -> usize {
    self.elements.len()
  }
  /// Dimension of the ambient space the nodes live in.
  pub fn dim_embedded(&self) -> Dim {
    self.coords.dim()
  }
  /// Topological dimension of the cells, zero for a mesh without elements.
  pub fn dim(&self) -> Dim {
    self
      .cells
      .first()
      .map(|&icell| self.elements[icell].kind().dim())
      .unwrap_or(0)
  }

  pub fn coords(&self) -> &NodeCoords {
    &self.coords
  }
  pub fn coordinate(&self, inode: NodeIdx) -> na::DVectorView<f64> {
    self.coords.coord(inode)
  }

  pub fn elements(&self) -> &[Element] {
    &self.elements
  }
  pub fn element(&self, ielement: ElementIdx) -> &Element {
    &self.elements[ielement]
  }
  pub fn elements_of_type(
    &self,
    kind: ElementKind,
  ) -> impl Iterator<Item = (ElementIdx, &Element)> + '_ {
    self
      .elements
      .iter()
      .enumerate()
      .filter(move |(_, e)| e.kind() == kind)
  }

  pub fn cell_indices(&self) -> &[ElementIdx] {
    &self.cells
  }
  pub fn cells(&self) -> impl Iterator<Item = (ElementIdx, &Element)> + '_ {
    self.cells.iter().map(|&icell| (icell, &self.elements[icell]))
  }
  pub fn ncells(&self) -> usize {
    self.cells.len()
  }

  pub fn tags(&self) -> &MeshTags {
    &self.tags
  }

  /// Largest coordinate along `axis`, `None` for an empty mesh.
  pub fn max_coordinate(&self, axis: usize) -> Option<f64> {
    if axis >= self.dim_embedded() {
      return None;
    }
    self
      .coords
      .matrix()
      .row(axis)
      .iter()
      .copied()
      .reduce(f64::max)
  }
}

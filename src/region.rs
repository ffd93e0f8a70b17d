//! Named regions of a mesh, such as the boundaries boundary conditions are
//! imposed on.

use crate::{
  error::{Error, Result},
  mesh::Mesh,
  ElementIdx, NodeIdx,
};

use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
  name: String,
  elements: Vec<ElementIdx>,
  /// All nodes of the region's elements, sorted.
  nodes: BTreeSet<NodeIdx>,
}
impl Region {
  pub fn name(&self) -> &str {
    &self.name
  }
  pub fn elements(&self) -> &[ElementIdx] {
    &self.elements
  }
  pub fn nodes(&self) -> &BTreeSet<NodeIdx> {
    &self.nodes
  }
  pub fn contains_node(&self, inode: NodeIdx) -> bool {
    self.nodes.contains(&inode)
  }
}

#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
  regions: IndexMap<String, Region>,
}
impl RegionIndex {
  /// Scans the boundary tags embedded in the mesh.
  pub fn from_mesh(mesh: &Mesh) -> Self {
    let regions = mesh
      .tags()
      .iter()
      .map(|(name, members)| {
        let elements: Vec<_> = members.iter().copied().unique().collect();
        let nodes = elements
          .iter()
          .flat_map(|&ielement| mesh.element(ielement).nodes().iter().copied())
          .collect();
        let region = Region {
          name: name.clone(),
          elements,
          nodes,
        };
        (name.clone(), region)
      })
      .collect();
    Self { regions }
  }

  pub fn lookup(&self, name: &str) -> Result<&Region> {
    self
      .regions
      .get(name)
      .ok_or_else(|| Error::UnknownRegion(name.to_string()))
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.regions.keys().map(String::as_str)
  }
  pub fn len(&self) -> usize {
    self.regions.len()
  }
  pub fn is_empty(&self) -> bool {
    self.regions.is_empty()
  }
}

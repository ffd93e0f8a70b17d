use super::{coordinates::NodeCoords, Element, ElementKind, Mesh, MeshTags};
use crate::error::{Error, Result};

use std::{collections::HashMap, path::Path};
use tracing::{debug, warn};

/// Load Gmsh `.msh` file (version 4.1).
pub fn load_gmsh(path: &Path) -> Result<Mesh> {
  let bytes = std::fs::read(path).map_err(|source| Error::FileNotFound {
    path: path.to_path_buf(),
    source,
  })?;
  let mesh = gmsh2mesh(&bytes)?;
  debug!(
    "loaded {} with {} nodes, {} elements and {} tags",
    path.display(),
    mesh.node_count(),
    mesh.element_count(),
    mesh.tags().len()
  );
  Ok(mesh)
}

/// Builds a mesh from the contents of a Gmsh `.msh` file.
///
/// Every physical group becomes a tag holding the elements of all entities
/// belonging to the group.
pub fn gmsh2mesh(bytes: &[u8]) -> Result<Mesh> {
  let physical_names = parse_physical_names(bytes);

  let msh =
    mshio::parse_msh_bytes(bytes).map_err(|err| Error::MeshFormat(format!("{err:?}")))?;

  let ascii = msh.header.file_type == 0;
  let mesh_nodes = msh
    .data
    .nodes
    .ok_or_else(|| Error::MeshFormat("missing $Nodes section".to_string()))?;
  let node_tags = match ascii.then(|| parse_node_tags(bytes)).flatten() {
    Some(tags) => tags,
    None => block_node_tags(&mesh_nodes),
  };
  let mut node_index = HashMap::with_capacity(node_tags.len());
  for (inode, &tag) in node_tags.iter().enumerate() {
    if node_index.insert(tag, inode).is_some() {
      return Err(Error::MeshFormat(format!("duplicate node tag {tag}")));
    }
  }

  let mesh_nodes: Vec<_> = mesh_nodes
    .node_blocks
    .iter()
    .flat_map(|block| block.nodes.iter())
    .map(|node| na::DVector::from_column_slice(&[node.x, node.y, node.z]))
    .collect();
  if mesh_nodes.len() != node_tags.len() {
    return Err(Error::MeshFormat(format!(
      "{} node tags for {} nodes",
      node_tags.len(),
      mesh_nodes.len()
    )));
  }
  let mesh_nodes = NodeCoords::from_columns(3, &mesh_nodes);

  // physical tags of each (entity_dim, entity_tag)
  let mut entity_groups: HashMap<(i32, i32), Vec<i32>> = HashMap::new();
  if let Some(entities) = &msh.data.entities {
    for p in &entities.points {
      entity_groups.insert((0, p.tag), p.physical_tags.clone());
    }
    for c in &entities.curves {
      entity_groups.insert((1, c.tag), c.physical_tags.clone());
    }
    for s in &entities.surfaces {
      entity_groups.insert((2, s.tag), s.physical_tags.clone());
    }
    for v in &entities.volumes {
      entity_groups.insert((3, v.tag), v.physical_tags.clone());
    }
  }

  let mut elements = Vec::new();
  let mut tags = MeshTags::new();

  let mesh_elements = msh
    .data
    .elements
    .ok_or_else(|| Error::MeshFormat("missing $Elements section".to_string()))?;
  for block in mesh_elements.element_blocks {
    type ElType = mshio::ElementType;
    let kind = match block.element_type {
      ElType::Pnt => ElementKind::Point,
      ElType::Lin2 => ElementKind::Line,
      ElType::Tri3 => ElementKind::Triangle,
      ElType::Qua4 => ElementKind::Quad,
      ElType::Tet4 => ElementKind::Tetrahedron,
      _ => {
        warn!("unsupported gmsh ElementType: {:?}", block.element_type);
        continue;
      }
    };

    let groups = entity_groups
      .get(&(block.entity_dim, block.entity_tag))
      .cloned()
      .unwrap_or_default();

    for e in block.elements {
      let nodes = e
        .nodes
        .iter()
        .map(|tag| {
          node_index
            .get(tag)
            .copied()
            .ok_or_else(|| Error::MeshFormat(format!("element references unknown node tag {tag}")))
        })
        .collect::<Result<Vec<_>>>()?;

      let ielement = elements.len();
      elements.push(Element::new(kind, nodes));

      for &group in &groups {
        let name = physical_names
          .get(&(block.entity_dim, group))
          .cloned()
          .unwrap_or_else(|| group.to_string());
        tags.entry(name).or_default().push(ielement);
      }
    }
  }

  if elements.is_empty() {
    return Err(Error::MeshFormat(
      "failed to find any supported element in gmsh file".to_string(),
    ));
  }

  let cell_dim = elements.iter().map(|e| e.kind().dim()).max().unwrap_or(0);
  let mesh_nodes = mesh_nodes.trim_trailing_zero_axes(cell_dim);
  Mesh::from_parts(mesh_nodes, elements, tags)
}

/// Node tags in file order as recorded by mshio.
///
/// mshio only keeps the tags of sparsely tagged files. Otherwise the tags are
/// assumed to count up from the minimal tag in file order.
fn block_node_tags(nodes: &mshio::Nodes<u64, i32, f64>) -> Vec<u64> {
  let mut tags = Vec::with_capacity(nodes.node_blocks.iter().map(|b| b.nodes.len()).sum());
  let mut next_tag = nodes.min_node_tag;
  for block in &nodes.node_blocks {
    let nblock = block.nodes.len();
    match &block.node_tags {
      Some(block_tags) => {
        let mut ordered = vec![0; nblock];
        for (&tag, &i) in block_tags {
          ordered[i] = tag;
        }
        tags.extend(ordered);
      }
      None => tags.extend(next_tag..next_tag + nblock as u64),
    }
    next_tag += nblock as u64;
  }
  tags
}

/// Reads the node tags of an ASCII `$Nodes` section in file order.
///
/// Returns `None` if the section is missing or cannot be read, in which case
/// the tags known to mshio are used.
fn parse_node_tags(bytes: &[u8]) -> Option<Vec<u64>> {
  let text = String::from_utf8_lossy(bytes);
  let start = text.find("$Nodes")? + "$Nodes".len();
  let end = start + text[start..].find("$EndNodes")?;
  let mut tokens = text[start..end].split_whitespace();

  let nblocks: usize = tokens.next()?.parse().ok()?;
  let nnodes: usize = tokens.next()?.parse().ok()?;
  // min and max tag
  tokens.nth(1)?;

  let mut tags = Vec::with_capacity(nnodes);
  for _ in 0..nblocks {
    let header: Vec<&str> = tokens.by_ref().take(4).collect();
    let [_, _, parametric, nblock] = header.as_slice() else {
      return None;
    };
    if *parametric != "0" {
      return None;
    }
    let nblock: usize = nblock.parse().ok()?;
    for _ in 0..nblock {
      tags.push(tokens.next()?.parse().ok()?);
    }
    // coordinates
    if nblock > 0 {
      tokens.nth(3 * nblock - 1)?;
    }
  }
  (tags.len() == nnodes).then_some(tags)
}

/// Reads the `$PhysicalNames` section, keyed by (dimension, physical tag).
///
/// mshio skips this section, so it is extracted from the raw text.
fn parse_physical_names(bytes: &[u8]) -> HashMap<(i32, i32), String> {
  let text = String::from_utf8_lossy(bytes);
  let mut names = HashMap::new();

  let Some(start) = text.find("$PhysicalNames") else {
    return names;
  };
  let section = &text[start..];
  let section = match section.find("$EndPhysicalNames") {
    Some(end) => &section[..end],
    None => section,
  };

  // skip the header line and the count line
  for line in section.lines().skip(2) {
    let mut parts = line.splitn(3, char::is_whitespace);
    let (Some(dim), Some(tag), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
      continue;
    };
    let (Ok(dim), Ok(tag)) = (dim.parse::<i32>(), tag.parse::<i32>()) else {
      continue;
    };
    names.insert((dim, tag), name.trim().trim_matches('"').to_string());
  }
  names
}

//! The nodal solution of a run.

use crate::{
  error::{Error, Result},
  mesh::Mesh,
  NodeIdx,
};

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::Path,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormKind {
  L1,
  L2,
  Lp(f64),
  Linf,
}

/// Immutable nodal values of a named variable together with the node
/// coordinates they live on.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  variable: String,
  values: na::DVector<f64>,
  /// Node coordinates in the columns.
  coords: na::DMatrix<f64>,
}
impl Field {
  pub fn from_solution(
    variable: impl Into<String>,
    values: na::DVector<f64>,
    mesh: &Mesh,
  ) -> Result<Self> {
    if values.len() != mesh.node_count() {
      return Err(Error::InvalidMatrix(format!(
        "solution has {} entries for {} nodes",
        values.len(),
        mesh.node_count()
      )));
    }
    Ok(Self {
      variable: variable.into(),
      values,
      coords: mesh.coords().matrix().clone(),
    })
  }

  pub fn variable(&self) -> &str {
    &self.variable
  }
  pub fn values(&self) -> &na::DVector<f64> {
    &self.values
  }
  /// Value at node `inode`, `None` if the node does not exist.
  pub fn value_at(&self, inode: NodeIdx) -> Option<f64> {
    self.values.get(inode).copied()
  }
  pub fn len(&self) -> usize {
    self.values.len()
  }
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Discrete norm of the nodal values. With `scale` the (p-th power of
  /// the) sum is divided by the number of nodes first.
  pub fn norm(&self, kind: NormKind, scale: bool) -> f64 {
    let n = self.values.len().max(1) as f64;
    let mean = |sum: f64| if scale { sum / n } else { sum };
    match kind {
      NormKind::L1 => mean(self.values.iter().map(|v| v.abs()).sum()),
      NormKind::L2 => mean(self.values.iter().map(|v| v * v).sum()).sqrt(),
      NormKind::Lp(p) => mean(self.values.iter().map(|v| v.abs().powf(p)).sum()).powf(p.recip()),
      NormKind::Linf => self.values.amax(),
    }
  }

  /// Writes one `x [y [z]] value` line per node.
  pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let io_err = |source| Error::Output {
      path: path.to_path_buf(),
      source,
    };
    let mut file = BufWriter::new(File::create(path).map_err(io_err)?);
    self.write_to(&mut file).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    debug!("wrote {} values of {} to {}", self.len(), self.variable, path.display());
    Ok(())
  }

  pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
    for (coord, value) in self.coords.column_iter().zip(self.values.iter()) {
      for x in coord.iter() {
        write!(writer, "{x:.16e} ")?;
      }
      writeln!(writer, "{value:.16e}")?;
    }
    Ok(())
  }
}

extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod assemble;
pub mod bc;
pub mod config;
pub mod env;
pub mod error;
pub mod fe;
pub mod field;
pub mod lse;
pub mod mesh;
pub mod pipeline;
pub mod quadrature;
pub mod region;
pub mod sparse;
pub mod util;

pub use error::{Error, Result, Stage, StageError};

pub type Dim = usize;
pub type NodeIdx = usize;
pub type ElementIdx = usize;

/// Name of the scalar field solved for.
pub const TEMPERATURE: &str = "Temperature";

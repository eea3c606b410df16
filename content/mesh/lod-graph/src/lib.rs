//! Mesh lod graph.
//!
//! Offline, a dense triangle mesh is cut into bounded clusters, clusters are grouped, each group
//! is simplified with its border locked and the result is clustered again, level after level.
//! Every cluster remembers the group it was simplified from and the group it was simplified
//! into, which forms a DAG over all levels. Each level is written to its own file.
//!
//! At runtime the DAG is rebuilt from the level files and clusters are selected by the projected
//! size of their bounding sphere.

use std::{
  io::{self, Read, Write},
  path::{Path, PathBuf},
};

use fast_hash_collection::*;
use glam::{Mat4, Vec2, Vec3};
use lod_mesh_segmentation::*;
use lod_mesh_simplification::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

mod bounding;
pub use bounding::*;
mod mesh;
pub use mesh::*;
mod util;
pub use util::*;
mod error;
pub use error::*;
mod impl_dependency;
pub use impl_dependency::*;
mod builder_impl;
pub use builder_impl::*;
mod build;
mod validate;
use validate::*;
mod disk;
pub use disk::*;
mod runtime;
pub use runtime::*;
mod selection;
pub use selection::*;

pub use lod_mesh_segmentation::AdjacencyWeights;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodGraphBuildConfig {
  /// max triangles per cluster
  pub cluster_triangle_limit: u32,
  /// max clusters per group
  pub group_cluster_limit: u32,
  /// each group is simplified toward this fraction of its triangles
  pub simplification_ratio: f32,
  /// including the base level
  pub max_level_count: u32,
  pub max_simplification_error: f32,
}

impl Default for LodGraphBuildConfig {
  fn default() -> Self {
    Self {
      cluster_triangle_limit: 128,
      group_cluster_limit: 4,
      simplification_ratio: 0.5,
      max_level_count: 16,
      max_simplification_error: f32::INFINITY,
    }
  }
}

impl LodGraphBuildConfig {
  pub fn validate(&self) -> Result<(), LodGraphBuildError> {
    let reason = if self.cluster_triangle_limit == 0 {
      "cluster_triangle_limit must be at least 1"
    } else if self.group_cluster_limit < 2 {
      "group_cluster_limit must be at least 2, otherwise groups never merge clusters"
    } else if !(self.simplification_ratio > 0. && self.simplification_ratio <= 1.) {
      "simplification_ratio must be in (0, 1]"
    } else if self.max_level_count == 0 {
      "max_level_count must be at least 1"
    } else if self.max_simplification_error.is_nan() || self.max_simplification_error < 0. {
      "max_simplification_error must be a non negative number"
    } else {
      return Ok(());
    };
    Err(LodGraphBuildError::InvalidConfig(reason.to_string()))
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LodCluster {
  /// ascending triangle ids into the level mesh
  pub triangles: Vec<u32>,
  /// shared edge count keyed by neighbor cluster index of the same level
  pub adjacency: AdjacencyWeights,
  pub bounding: BoundingSphere,
  /// the group of the previous (finer) level this cluster was simplified from, none on level 0
  pub source_group: Option<u32>,
  /// the group of this level the cluster is simplified in, none on the top level
  pub destination_group: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LodClusterGroup {
  /// ascending cluster ids of the same level
  pub clusters: Vec<u32>,
  pub adjacency: AdjacencyWeights,
  /// clusters of the next (coarser) level produced by simplifying this group
  pub produced_clusters: Vec<u32>,
  pub simplification_error: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LodLevel {
  pub mesh: MeshBufferSource,
  pub clusters: Vec<LodCluster>,
  /// empty on the top level
  pub groups: Vec<LodClusterGroup>,
}

impl LodLevel {
  pub fn triangle_count(&self) -> usize {
    self.mesh.triangle_count()
  }
}

#[derive(Clone, Debug)]
pub struct LodGraph {
  pub build_config: LodGraphBuildConfig,
  /// level 0 is the full resolution mesh
  pub levels: Vec<LodLevel>,
}

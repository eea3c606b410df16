use crate::*;

pub struct DefaultMeshLodGraphBuilder {
  /// how strongly open mesh borders resist simplification
  pub border_weight: f32,
}

impl Default for DefaultMeshLodGraphBuilder {
  fn default() -> Self {
    Self { border_weight: 10. }
  }
}

impl MeshLodGraphBuilder for DefaultMeshLodGraphBuilder {
  fn segment_triangles(&self, indices: &[u32], triangle_limit: u32) -> Vec<TriangleCluster> {
    build_clusters(indices, triangle_limit)
  }

  fn segment_clusters(
    &self,
    cluster_adjacency: &[AdjacencyWeights],
    cluster_limit: u32,
  ) -> Vec<ClusterGroup> {
    build_cluster_groups(cluster_adjacency, cluster_limit)
  }

  fn simplify(
    &self,
    mesh: &MeshBufferSource,
    locked_vertices: &[bool],
    target_triangle_count: u32,
    max_error: f32,
  ) -> MeshLodGraphSimplificationResult {
    if log::log_enabled!(log::Level::Trace) {
      let lock_count = locked_vertices.iter().filter(|v| **v).count();
      log::trace!(
        "simplify lock ratio: {}",
        lock_count as f32 / mesh.positions.len().max(1) as f32
      );
    }

    let result = simplify_by_edge_collapse(
      &mesh.positions,
      &mesh.indices,
      Some(locked_vertices),
      EdgeCollapseConfig {
        target_triangle_count: target_triangle_count as usize,
        target_error: max_error,
        border_weight: self.border_weight,
      },
    );

    MeshLodGraphSimplificationResult {
      mesh: MeshBufferSource {
        positions: result.positions,
        indices: result.indices,
      },
      error: result.error,
    }
  }
}

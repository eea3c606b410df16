use crate::*;

/// The algorithms the graph build delegates to. The default implementation is
/// [`DefaultMeshLodGraphBuilder`]; the build checks the partition and size guarantees of whatever
/// implementation it is given.
pub trait MeshLodGraphBuilder: Sync {
  /// partition triangles into edge connected clusters of at most `triangle_limit` triangles
  fn segment_triangles(&self, indices: &[u32], triangle_limit: u32) -> Vec<TriangleCluster>;

  /// partition clusters into groups of at most `cluster_limit` clusters
  fn segment_clusters(
    &self,
    cluster_adjacency: &[AdjacencyWeights],
    cluster_limit: u32,
  ) -> Vec<ClusterGroup>;

  /// reduce `mesh` toward `target_triangle_count` triangles without moving locked vertices
  fn simplify(
    &self,
    mesh: &MeshBufferSource,
    locked_vertices: &[bool],
    target_triangle_count: u32,
    max_error: f32,
  ) -> MeshLodGraphSimplificationResult;
}

pub struct MeshLodGraphSimplificationResult {
  pub mesh: MeshBufferSource,
  pub error: f32,
}

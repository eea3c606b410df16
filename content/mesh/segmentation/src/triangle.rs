use crate::*;

/// A bounded set of triangles of one level, the unit of lod granularity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriangleCluster {
  /// ascending triangle ids
  pub triangles: Vec<u32>,
  /// shared edge count keyed by neighbor cluster index
  pub adjacency: AdjacencyWeights,
}

/// Map each undirected edge `(min, max)` to the triangles using it.
///
/// Edges of degenerate triangles that repeat a vertex are skipped, a triangle is listed at most
/// once per edge.
pub fn build_edge_triangle_map(indices: &[u32]) -> FastHashMap<(u32, u32), Vec<u32>> {
  let mut edges: FastHashMap<(u32, u32), Vec<u32>> = fast_hash_map_with_capacity(indices.len());
  for (triangle, [a, b, c]) in triangles(indices).enumerate() {
    let triangle = triangle as u32;
    for (x, y) in [(a, b), (b, c), (c, a)] {
      if x == y {
        continue;
      }
      let users = edges.entry((x.min(y), x.max(y))).or_default();
      if users.last() != Some(&triangle) {
        users.push(triangle);
      }
    }
  }
  edges
}

pub fn triangles(indices: &[u32]) -> impl Iterator<Item = [u32; 3]> + '_ {
  indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
}

/// Partition the triangles of `indices` into edge connected clusters of at most `triangle_limit`
/// triangles.
///
/// Every triangle starts as its own cluster, clusters sharing the most edges are merged first.
/// A zero triangle mesh yields no cluster. The limit must be at least 1.
pub fn build_clusters(indices: &[u32], triangle_limit: u32) -> Vec<TriangleCluster> {
  let triangle_count = indices.len() / 3;
  if triangle_count == 0 {
    return Vec::new();
  }

  let edge_map = build_edge_triangle_map(indices);
  let mut edges = Vec::with_capacity(edge_map.len());
  for users in edge_map.values() {
    for (i, a) in users.iter().enumerate() {
      for b in &users[i + 1..] {
        edges.push((*a, *b, 1));
      }
    }
  }

  let graph = MergeGraph {
    item_sizes: vec![1; triangle_count],
    edges,
  };

  greedy_merge(graph, triangle_limit)
    .into_iter()
    .map(|part| TriangleCluster {
      triangles: part.items,
      adjacency: part.adjacency,
    })
    .collect()
}

/// Shared edge counts between the clusters of a whole level.
///
/// `cluster_of_triangle[t]` is the cluster owning triangle `t`. Used when clusters were built
/// piecewise and their cross boundary adjacency is unknown.
pub fn compute_cluster_adjacency(
  indices: &[u32],
  cluster_of_triangle: &[u32],
  cluster_count: usize,
) -> Vec<AdjacencyWeights> {
  let mut adjacency = vec![AdjacencyWeights::new(); cluster_count];
  for users in build_edge_triangle_map(indices).values() {
    for (i, a) in users.iter().enumerate() {
      for b in &users[i + 1..] {
        let ca = cluster_of_triangle[*a as usize];
        let cb = cluster_of_triangle[*b as usize];
        if ca == cb {
          continue;
        }
        *adjacency[ca as usize].entry(cb).or_insert(0) += 1;
        *adjacency[cb as usize].entry(ca).or_insert(0) += 1;
      }
    }
  }
  adjacency
}

#[cfg(test)]
mod test {
  use lod_mesh_test_util::*;

  use super::*;

  fn assert_partition(clusters: &[TriangleCluster], triangle_count: usize) {
    let mut seen = vec![false; triangle_count];
    for cluster in clusters {
      for t in &cluster.triangles {
        assert!(!seen[*t as usize], "triangle {t} is in two clusters");
        seen[*t as usize] = true;
      }
    }
    assert!(seen.iter().all(|s| *s), "some triangle is not clustered");
  }

  #[test]
  fn quad_strip_splits_in_two() {
    let mesh = quad_strip(4);
    assert_eq!(mesh.triangle_count(), 8);

    let clusters = build_clusters(&mesh.indices, 4);
    assert_eq!(clusters.len(), 2);
    assert!(clusters.iter().all(|c| c.triangles.len() == 4));
    assert!(clusters[0].adjacency[&1] > 0);
    assert_eq!(clusters[0].adjacency[&1], clusters[1].adjacency[&0]);
  }

  #[test]
  fn grid_respects_limit_and_partitions() {
    let mesh = grid_plane(16);
    let limit = 32;
    let clusters = build_clusters(&mesh.indices, limit);

    assert!(clusters
      .iter()
      .all(|c| c.triangles.len() <= limit as usize));
    assert_partition(&clusters, mesh.triangle_count());
    // a grid is connected, a reasonable greedy partition should not stay near singleton level
    assert!(clusters.len() < mesh.triangle_count() / 4);
  }

  #[test]
  fn clustering_is_deterministic() {
    let mesh = uv_sphere(24, 12);
    let first = build_clusters(&mesh.indices, 24);
    let second = build_clusters(&mesh.indices, 24);
    assert_eq!(first, second);
  }

  #[test]
  fn builder_adjacency_matches_level_adjacency() {
    let mesh = grid_plane(8);
    let clusters = build_clusters(&mesh.indices, 16);

    let mut cluster_of_triangle = vec![0; mesh.triangle_count()];
    for (i, cluster) in clusters.iter().enumerate() {
      for t in &cluster.triangles {
        cluster_of_triangle[*t as usize] = i as u32;
      }
    }

    let adjacency = compute_cluster_adjacency(&mesh.indices, &cluster_of_triangle, clusters.len());
    for (cluster, level_adjacency) in clusters.iter().zip(adjacency.iter()) {
      assert_eq!(&cluster.adjacency, level_adjacency);
    }
  }

  #[test]
  fn empty_and_degenerate_input() {
    assert!(build_clusters(&[], 8).is_empty());

    // a degenerate triangle glued to a regular one is accepted as is
    let indices = [0, 1, 2, 2, 1, 1, 1, 3, 2];
    let clusters = build_clusters(&indices, 8);
    assert_partition(&clusters, 3);
  }
}

use crate::*;

/// A bounded set of clusters of one level, simplified as one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterGroup {
  /// ascending cluster ids
  pub clusters: Vec<u32>,
  /// shared edge count keyed by neighbor group index
  pub adjacency: AdjacencyWeights,
}

/// Partition clusters into groups of at most `cluster_limit` clusters, merging clusters with the
/// longest shared boundary first.
///
/// Keeping strongly connected clusters together keeps most of the edges exposed to the
/// simplifier inside a group, so only the group border has to stay locked.
pub fn build_cluster_groups(
  cluster_adjacency: &[AdjacencyWeights],
  cluster_limit: u32,
) -> Vec<ClusterGroup> {
  let mut edges = Vec::new();
  for (a, neighbors) in cluster_adjacency.iter().enumerate() {
    let a = a as u32;
    for (&b, &weight) in neighbors.range(a + 1..) {
      edges.push((a, b, weight));
    }
  }

  let graph = MergeGraph {
    item_sizes: vec![1; cluster_adjacency.len()],
    edges,
  };

  greedy_merge(graph, cluster_limit)
    .into_iter()
    .map(|part| ClusterGroup {
      clusters: part.items,
      adjacency: part.adjacency,
    })
    .collect()
}

#[cfg(test)]
mod test {
  use super::*;

  fn weights(pairs: &[(u32, u32)]) -> AdjacencyWeights {
    pairs.iter().copied().collect()
  }

  #[test]
  fn strongest_boundaries_group_first() {
    // 0 =4= 1 -1- 2 =4= 3
    let adjacency = vec![
      weights(&[(1, 4)]),
      weights(&[(0, 4), (2, 1)]),
      weights(&[(1, 1), (3, 4)]),
      weights(&[(2, 4)]),
    ];
    let groups = build_cluster_groups(&adjacency, 2);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].clusters, vec![0, 1]);
    assert_eq!(groups[1].clusters, vec![2, 3]);
    assert_eq!(groups[0].adjacency[&1], 1);
  }

  #[test]
  fn disconnected_clusters_stay_alone() {
    let adjacency = vec![AdjacencyWeights::new(); 3];
    let groups = build_cluster_groups(&adjacency, 4);
    assert_eq!(groups.len(), 3);
    assert!(groups.iter().all(|g| g.clusters.len() == 1));
  }

  #[test]
  fn group_limit_holds() {
    // a fully connected set of 9 clusters
    let adjacency: Vec<_> = (0..9_u32)
      .map(|a| (0..9).filter(|b| *b != a).map(|b| (b, 1)).collect())
      .collect();
    let groups = build_cluster_groups(&adjacency, 4);
    assert!(groups.iter().all(|g| g.clusters.len() <= 4));
    let total: usize = groups.iter().map(|g| g.clusters.len()).sum();
    assert_eq!(total, 9);
  }
}

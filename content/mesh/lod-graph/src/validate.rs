use crate::*;

/// Check that `parts` partition `0..item_count` into non empty parts of at most `limit` items.
pub(crate) fn check_partition<'a>(
  parts: impl IntoIterator<Item = &'a [u32]>,
  item_count: usize,
  limit: u32,
) -> Result<(), String> {
  let mut owner = vec![None; item_count];
  for (part_index, part) in parts.into_iter().enumerate() {
    if part.is_empty() {
      return Err(format!("part {part_index} is empty"));
    }
    if part.len() > limit as usize {
      return Err(format!(
        "part {part_index} holds {} items, over the limit {limit}",
        part.len()
      ));
    }
    for item in part {
      let Some(slot) = owner.get_mut(*item as usize) else {
        return Err(format!("part {part_index} references item {item} of {item_count}"));
      };
      if let Some(previous) = slot.replace(part_index) {
        return Err(format!("item {item} is in both part {previous} and part {part_index}"));
      }
    }
  }

  match owner.iter().position(|o| o.is_none()) {
    Some(missing) => Err(format!("item {missing} is in no part")),
    None => Ok(()),
  }
}

impl LodGraph {
  pub fn top_level(&self) -> Option<&LodLevel> {
    self.levels.last()
  }

  /// Check the structural guarantees of a built graph: every level is partitioned into clusters
  /// and groups within the configured limits, and the source and destination links of every
  /// cluster agree with the groups on both ends.
  pub fn validate(&self) -> Result<(), LodGraphBuildError> {
    let config = &self.build_config;

    for (level_index, level) in self.levels.iter().enumerate() {
      let fail = |stage, reason: String| LodGraphBuildError::stage(stage, level_index, reason);
      let is_top = level_index + 1 == self.levels.len();

      check_partition(
        level.clusters.iter().map(|c| c.triangles.as_slice()),
        level.triangle_count(),
        config.cluster_triangle_limit,
      )
      .map_err(|reason| fail(BuildStage::Clustering, reason))?;

      if is_top {
        if !level.groups.is_empty() {
          return Err(fail(
            BuildStage::Grouping,
            "the top level must not be grouped".to_string(),
          ));
        }
      } else {
        check_partition(
          level.groups.iter().map(|g| g.clusters.as_slice()),
          level.clusters.len(),
          config.group_cluster_limit,
        )
        .map_err(|reason| fail(BuildStage::Grouping, reason))?;
      }

      for (cluster_index, cluster) in level.clusters.iter().enumerate() {
        let cluster_index = cluster_index as u32;

        let destination_ok = match cluster.destination_group {
          None => is_top,
          Some(group) => level
            .groups
            .get(group as usize)
            .is_some_and(|g| g.clusters.contains(&cluster_index)),
        };
        if !destination_ok {
          return Err(fail(
            BuildStage::Grouping,
            format!(
              "cluster {cluster_index} has destination group {:?} not matching its group",
              cluster.destination_group
            ),
          ));
        }

        let source_ok = match (cluster.source_group, level_index.checked_sub(1)) {
          (None, None) => true,
          (Some(group), Some(finer)) => self.levels[finer]
            .groups
            .get(group as usize)
            .is_some_and(|g| g.produced_clusters.contains(&cluster_index)),
          _ => false,
        };
        if !source_ok {
          return Err(fail(
            BuildStage::Simplification,
            format!(
              "cluster {cluster_index} has source group {:?} not producing it",
              cluster.source_group
            ),
          ));
        }
      }

      if let Some(coarser) = self.levels.get(level_index + 1) {
        let produced = level
          .groups
          .iter()
          .map(|g| g.produced_clusters.as_slice());
        // produced clusters have no size limit of their own, only the cluster one
        check_partition(produced, coarser.clusters.len(), u32::MAX).map_err(|reason| {
          fail(
            BuildStage::Simplification,
            format!("produced clusters: {reason}"),
          )
        })?;

        if coarser.triangle_count() > level.triangle_count() {
          return Err(fail(
            BuildStage::Simplification,
            format!(
              "next level has more triangles, {} over {}",
              coarser.triangle_count(),
              level.triangle_count()
            ),
          ));
        }
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn partition_errors_are_reported() {
    let ok: [&[u32]; 2] = [&[0, 2], &[1]];
    assert!(check_partition(ok, 3, 2).is_ok());

    let over: [&[u32]; 1] = [&[0, 1, 2]];
    assert!(check_partition(over, 3, 2).unwrap_err().contains("over the limit"));

    let repeated: [&[u32]; 2] = [&[0, 1], &[1]];
    assert!(check_partition(repeated, 2, 2).unwrap_err().contains("in both"));

    let missing: [&[u32]; 1] = [&[0]];
    assert!(check_partition(missing, 2, 2).unwrap_err().contains("in no part"));

    let outside: [&[u32]; 1] = [&[5]];
    assert!(check_partition(outside, 2, 2).unwrap_err().contains("references"));

    let empty: [&[u32]; 1] = [&[]];
    assert!(check_partition(empty, 0, 2).unwrap_err().contains("empty"));
  }

  #[test]
  fn broken_links_are_found() {
    let builder = DefaultMeshLodGraphBuilder::default();
    let sphere = lod_mesh_test_util::uv_sphere(16, 12);
    let mesh = MeshBufferSource {
      positions: sphere.positions,
      indices: sphere.indices,
    };
    let config = LodGraphBuildConfig {
      cluster_triangle_limit: 32,
      ..Default::default()
    };
    let mut graph = LodGraph::build_from_mesh(&builder, mesh, config).unwrap();
    assert!(graph.levels.len() > 1);
    graph.validate().unwrap();

    let cluster = &mut graph.levels[1].clusters[0];
    cluster.source_group = cluster.source_group.map(|g| g + 1000);
    let err = graph.validate().unwrap_err();
    assert!(matches!(
      err,
      LodGraphBuildError::Stage {
        stage: BuildStage::Simplification,
        level: 1,
        ..
      }
    ));
  }
}

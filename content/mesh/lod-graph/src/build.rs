use crate::*;

impl LodGraph {
  pub fn build_from_mesh(
    builder: &dyn MeshLodGraphBuilder,
    mesh: MeshBufferSource,
    config: LodGraphBuildConfig,
  ) -> Result<Self, LodGraphBuildError> {
    config.validate()?;
    if mesh.indices.len() % 3 != 0 {
      return Err(LodGraphBuildError::stage(
        BuildStage::Ingestion,
        0,
        format!("index count {} is not a multiple of 3", mesh.indices.len()),
      ));
    }
    if let Some(index) = mesh.find_invalid_index() {
      return Err(LodGraphBuildError::stage(
        BuildStage::Ingestion,
        0,
        format!("index {index} is out of the {} positions", mesh.positions.len()),
      ));
    }

    let mesh = MeshBufferSource::new_welded(&mesh.positions, &mesh.indices);
    let mut last_level = LodLevel::build_base_from_mesh(builder, mesh, &config)?;
    let mut levels = Vec::new();

    // a single cluster has nobody to be grouped with, that is the top of the graph
    while last_level.clusters.len() > 1 && levels.len() + 1 < config.max_level_count as usize {
      let level = levels.len() + 1;
      let finer_triangle_count = last_level.triangle_count();
      let new_level = LodLevel::build_from_finer_level(builder, &mut last_level, &config, level)?;

      if new_level.triangle_count() >= finer_triangle_count {
        log::warn!(
          "lod graph build stalled at level {level}: none of {} groups could be simplified",
          last_level.groups.len()
        );
        last_level.detach_groups();
        break;
      }

      log_level(levels.len(), &last_level);
      levels.push(std::mem::replace(&mut last_level, new_level));
    }

    log_level(levels.len(), &last_level);
    levels.push(last_level);

    Ok(Self {
      build_config: config,
      levels,
    })
  }
}

fn log_level(index: usize, level: &LodLevel) {
  log::info!(
    "lod graph level {index}: {} triangles, {} clusters, {} groups",
    level.triangle_count(),
    level.clusters.len(),
    level.groups.len()
  );
}

impl LodLevel {
  fn build_base_from_mesh(
    builder: &dyn MeshLodGraphBuilder,
    mesh: MeshBufferSource,
    config: &LodGraphBuildConfig,
  ) -> Result<Self, LodGraphBuildError> {
    let segments = builder.segment_triangles(&mesh.indices, config.cluster_triangle_limit);
    check_partition(
      segments.iter().map(|s| s.triangles.as_slice()),
      mesh.triangle_count(),
      config.cluster_triangle_limit,
    )
    .map_err(|reason| LodGraphBuildError::stage(BuildStage::Clustering, 0, reason))?;

    let clusters = segments
      .into_iter()
      .map(|segment| LodCluster {
        triangles: segment.triangles,
        adjacency: segment.adjacency,
        bounding: BoundingSphere::default(), // write later
        source_group: None,
        destination_group: None, // write later when building coarser level
      })
      .collect();

    let mut level = Self {
      mesh,
      clusters,
      groups: Vec::new(),
    };
    level.compute_cluster_bounds();
    Ok(level)
  }

  /// Group the clusters of `previous_level`, simplify every group and cluster the results into a
  /// new level. `previous_level` gets its groups and cluster destinations written.
  fn build_from_finer_level(
    builder: &dyn MeshLodGraphBuilder,
    previous_level: &mut LodLevel,
    config: &LodGraphBuildConfig,
    level: usize,
  ) -> Result<Self, LodGraphBuildError> {
    let finer_level = level - 1;

    let cluster_adjacency: Vec<_> = previous_level
      .clusters
      .iter()
      .map(|c| c.adjacency.clone())
      .collect();
    let groups = builder.segment_clusters(&cluster_adjacency, config.group_cluster_limit);
    check_partition(
      groups.iter().map(|g| g.clusters.as_slice()),
      previous_level.clusters.len(),
      config.group_cluster_limit,
    )
    .map_err(|reason| LodGraphBuildError::stage(BuildStage::Grouping, finer_level, reason))?;

    for (group_index, group) in groups.iter().enumerate() {
      for cluster in &group.clusters {
        previous_level.clusters[*cluster as usize].destination_group = Some(group_index as u32);
      }
    }

    let locked = previous_level.group_border_vertices(&groups);

    let simplified: Vec<(MeshLodGraphSimplificationResult, u32)> = groups
      .par_iter()
      .map(|group| {
        let triangles = group
          .clusters
          .iter()
          .flat_map(|c| previous_level.clusters[*c as usize].triangles.iter().copied());
        let (mesh, global_vertices) = previous_level.mesh.extract_triangles(triangles);
        let lock: Vec<bool> = global_vertices
          .iter()
          .map(|v| locked[*v as usize])
          .collect();

        let target = (mesh.triangle_count() as f32 * config.simplification_ratio) as u32;
        let target = target.max(1);
        let source_count = mesh.triangle_count() as u32;
        let result = builder.simplify(&mesh, &lock, target, config.max_simplification_error);
        // a group of degenerate triangles simplifies to nothing, keep it as is instead
        if result.mesh.triangle_count() == 0 && source_count > 0 {
          return (MeshLodGraphSimplificationResult { mesh, error: 0. }, source_count);
        }
        (result, source_count)
      })
      .collect();

    let mut missed_target = 0;
    for (group_index, (result, source_count)) in simplified.iter().enumerate() {
      let count = result.mesh.triangle_count() as u32;
      if count > *source_count {
        return Err(LodGraphBuildError::stage(
          BuildStage::Simplification,
          finer_level,
          format!("group {group_index} grew from {source_count} to {count} triangles"),
        ));
      }
      if let Some(index) = result.mesh.find_invalid_index() {
        return Err(LodGraphBuildError::stage(
          BuildStage::Simplification,
          finer_level,
          format!("group {group_index} produced out of range index {index}"),
        ));
      }
      let ratio = count as f32 / (*source_count).max(1) as f32;
      if ratio > config.simplification_ratio {
        missed_target += 1;
        log::trace!("group {group_index} simplify ratio not meet requirement: {ratio}");
      }
    }
    if missed_target > 0 {
      log::debug!(
        "level {finer_level}: {missed_target} of {} groups missed the simplification target",
        groups.len()
      );
    }

    let segments: Vec<Vec<TriangleCluster>> = simplified
      .par_iter()
      .map(|(result, _)| builder.segment_triangles(&result.mesh.indices, config.cluster_triangle_limit))
      .collect();

    let mut positions = Vec::with_capacity(previous_level.mesh.positions.len());
    let mut indices = Vec::with_capacity(previous_level.mesh.indices.len());
    let mut clusters = Vec::with_capacity(previous_level.clusters.len());
    let mut level_groups = Vec::with_capacity(groups.len());

    for (group_index, ((group, (result, _)), segments)) in groups
      .into_iter()
      .zip(simplified)
      .zip(segments)
      .enumerate()
    {
      check_partition(
        segments.iter().map(|s| s.triangles.as_slice()),
        result.mesh.triangle_count(),
        config.cluster_triangle_limit,
      )
      .map_err(|reason| {
        LodGraphBuildError::stage(
          BuildStage::Clustering,
          level,
          format!("output of group {group_index}: {reason}"),
        )
      })?;

      let vertex_base = positions.len() as u32;
      let triangle_base = (indices.len() / 3) as u32;
      positions.extend_from_slice(&result.mesh.positions);
      indices.extend(result.mesh.indices.iter().map(|i| i + vertex_base));

      let first_cluster = clusters.len() as u32;
      clusters.extend(segments.into_iter().map(|segment| LodCluster {
        triangles: segment.triangles.iter().map(|t| t + triangle_base).collect(),
        adjacency: AdjacencyWeights::new(), // write later, clusters of other groups are unknown yet
        bounding: BoundingSphere::default(),
        source_group: Some(group_index as u32),
        destination_group: None,
      }));

      level_groups.push(LodClusterGroup {
        clusters: group.clusters,
        adjacency: group.adjacency,
        produced_clusters: (first_cluster..clusters.len() as u32).collect(),
        simplification_error: result.error,
      });
    }
    previous_level.groups = level_groups;

    // locked border vertices come out of neighbor groups bit identical, welding stitches them
    let mut level = Self {
      mesh: MeshBufferSource::new_welded(&positions, &indices),
      clusters,
      groups: Vec::new(),
    };
    level.refresh_cluster_adjacency();
    level.compute_cluster_bounds();
    Ok(level)
  }

  /// vertices referenced by more than one group
  fn group_border_vertices(&self, groups: &[ClusterGroup]) -> Vec<bool> {
    const UNOWNED: u32 = u32::MAX;
    const SHARED: u32 = u32::MAX - 1;

    let mut owner = vec![UNOWNED; self.mesh.positions.len()];
    for (group_index, group) in groups.iter().enumerate() {
      let group_index = group_index as u32;
      for cluster in &group.clusters {
        for triangle in &self.clusters[*cluster as usize].triangles {
          for v in self.mesh.triangle(*triangle) {
            let slot = &mut owner[v as usize];
            if *slot == UNOWNED {
              *slot = group_index;
            } else if *slot != group_index {
              *slot = SHARED;
            }
          }
        }
      }
    }

    owner.into_iter().map(|o| o == SHARED).collect()
  }

  fn detach_groups(&mut self) {
    self.groups.clear();
    self
      .clusters
      .iter_mut()
      .for_each(|c| c.destination_group = None);
  }

  fn refresh_cluster_adjacency(&mut self) {
    let mut cluster_of_triangle = vec![0; self.mesh.triangle_count()];
    for (cluster_index, cluster) in self.clusters.iter().enumerate() {
      for triangle in &cluster.triangles {
        cluster_of_triangle[*triangle as usize] = cluster_index as u32;
      }
    }

    let adjacency = compute_cluster_adjacency(
      &self.mesh.indices,
      &cluster_of_triangle,
      self.clusters.len(),
    );
    for (cluster, adjacency) in self.clusters.iter_mut().zip(adjacency) {
      cluster.adjacency = adjacency;
    }
  }

  fn compute_cluster_bounds(&mut self) {
    let mesh = &self.mesh;
    self.clusters.par_iter_mut().for_each(|cluster| {
      let points = cluster
        .triangles
        .iter()
        .flat_map(|t| mesh.triangle_positions(*t));
      cluster.bounding = BoundingSphere::from_points(points);
    });
  }
}

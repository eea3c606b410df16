use crate::*;

/// A cluster group rebuilt from the per cluster back references of the level files.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuntimeClusterGroup {
  /// clusters of the same level that were simplified together in this group
  pub clusters: Vec<u32>,
  /// clusters of the next (coarser) level that this group was simplified into
  pub produced_clusters: Vec<u32>,
  /// encloses the spheres of `clusters`
  pub bounding: BoundingSphere,
}

#[derive(Clone, Debug)]
pub struct RuntimeLodLevel {
  pub clusters: Vec<DiskCluster>,
  pub groups: Vec<RuntimeClusterGroup>,
  pub vertices: Vec<Vec3>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterHandle {
  pub level: u32,
  pub cluster: u32,
}

impl ClusterHandle {
  pub fn new(level: u32, cluster: u32) -> Self {
    Self { level, cluster }
  }
}

/// The immutable lod DAG used for cluster selection.
#[derive(Clone, Debug, Default)]
pub struct RuntimeLodGraph {
  /// level 0 is the full resolution mesh
  pub levels: Vec<RuntimeLodLevel>,
}

impl RuntimeLodGraph {
  pub fn load(prefix: impl AsRef<Path>) -> Result<Self, LodFileError> {
    let levels = read_levels(prefix.as_ref())?;
    let graph = Self::from_disk_levels(levels)?;
    log::info!(
      "lod graph loaded from {:?}: {} levels, {} clusters",
      prefix.as_ref(),
      graph.levels.len(),
      graph.cluster_count()
    );
    Ok(graph)
  }

  /// Rebuild the groups of every level. A cluster joins the group of its destination group index
  /// on its own level and is listed as produced by its source group on the previous level.
  pub fn from_disk_levels(levels: Vec<DiskLevel>) -> Result<Self, LodFileError> {
    let mut runtime_levels: Vec<RuntimeLodLevel> = Vec::with_capacity(levels.len());

    for (level, disk) in levels.into_iter().enumerate() {
      let group_count = disk.header.group_count;
      let mut groups = vec![RuntimeClusterGroup::default(); group_count as usize];

      for (cluster_index, cluster) in disk.clusters.iter().enumerate() {
        let cluster_index = cluster_index as u32;

        if let Some(group) = cluster.destination_group {
          groups
            .get_mut(group as usize)
            .ok_or(LodFileError::DanglingGroup {
              level,
              cluster: cluster_index,
              group,
              group_count,
            })?
            .clusters
            .push(cluster_index);
        }

        if let Some(group) = cluster.source_group {
          let previous_group_count = runtime_levels.last().map_or(0, |l| l.groups.len() as u32);
          runtime_levels
            .last_mut()
            .and_then(|l| l.groups.get_mut(group as usize))
            .ok_or(LodFileError::DanglingGroup {
              level,
              cluster: cluster_index,
              group,
              group_count: previous_group_count,
            })?
            .produced_clusters
            .push(cluster_index);
        }
      }

      for group in &mut groups {
        let members = group
          .clusters
          .iter()
          .map(|c| disk.clusters[*c as usize].bounding);
        group.bounding = BoundingSphere::from_spheres(members);
      }

      runtime_levels.push(RuntimeLodLevel {
        clusters: disk.clusters,
        groups,
        vertices: disk.vertices,
      });
    }

    Ok(Self {
      levels: runtime_levels,
    })
  }

  pub fn cluster_count(&self) -> usize {
    self.levels.iter().map(|l| l.clusters.len()).sum()
  }

  pub fn cluster(&self, handle: ClusterHandle) -> Option<&DiskCluster> {
    self
      .levels
      .get(handle.level as usize)?
      .clusters
      .get(handle.cluster as usize)
  }

  /// three positions per triangle
  pub fn cluster_vertices(&self, handle: ClusterHandle) -> Option<&[Vec3]> {
    let level = self.levels.get(handle.level as usize)?;
    let cluster = level.clusters.get(handle.cluster as usize)?;
    level.vertices.get(cluster.vertices.into_range())
  }

  pub fn top_level_clusters(&self) -> impl Iterator<Item = ClusterHandle> + '_ {
    let level = self.levels.len().saturating_sub(1) as u32;
    let count = self.levels.last().map_or(0, |l| l.clusters.len() as u32);
    (0..count).map(move |cluster| ClusterHandle::new(level, cluster))
  }
}

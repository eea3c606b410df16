use crate::*;

/// Camera state and error budget of one selection pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodDecider {
  /// world to camera space
  pub view: Mat4,
  pub projection: Mat4,
  /// in pixels
  pub viewport: Vec2,
  /// max accepted on screen size in pixels
  pub tolerance_px: f32,
}

impl LodDecider {
  /// Approximate on screen diameter of a sphere in pixels, infinite when the camera is inside.
  pub fn projected_diameter_px(&self, sphere: &BoundingSphere) -> f32 {
    let distance = self.view.transform_point3(sphere.center).length();
    if distance <= sphere.radius {
      return f32::INFINITY;
    }
    let half_height = self.viewport.y * 0.5;
    sphere.radius * 2. / distance * self.projection.y_axis.y * half_height
  }

  /// Level 0 is always acceptable, it can not be refined further. A coarser level is acceptable
  /// when its projected size scaled by the level index stays under the tolerance.
  pub fn within_tolerance(&self, sphere: &BoundingSphere, level: u32) -> bool {
    if level == 0 {
      return true;
    }
    self.projected_diameter_px(sphere) * (level as f32) < self.tolerance_px
  }
}

impl RuntimeLodGraph {
  /// false for an unknown cluster
  pub fn cluster_within_tolerance(&self, handle: ClusterHandle, decider: &LodDecider) -> bool {
    self
      .cluster(handle)
      .is_some_and(|cluster| decider.within_tolerance(&cluster.bounding, handle.level))
  }

  /// Within tolerance while none of the clusters its group was simplified into is. Clusters of
  /// the top level only need to be within tolerance.
  pub fn cluster_renderable(&self, handle: ClusterHandle, decider: &LodDecider) -> bool {
    let Some(cluster) = self.cluster(handle) else {
      return false;
    };
    if !decider.within_tolerance(&cluster.bounding, handle.level) {
      return false;
    }

    let Some(group) = cluster.destination_group else {
      return true;
    };
    let Some(group) = self.levels[handle.level as usize]
      .groups
      .get(group as usize)
    else {
      return true;
    };

    group.produced_clusters.iter().all(|produced| {
      let coarser = ClusterHandle::new(handle.level + 1, *produced);
      !self.cluster_within_tolerance(coarser, decider)
    })
  }

  /// Walk from the top level toward level 0 and collect the renderable clusters, sorted.
  ///
  /// A cluster failing the tolerance test is replaced by the clusters of the group it was
  /// simplified from. `visible` tests bounding spheres: a rejected cluster is pruned together with
  /// everything refining it, and a rejected group sphere skips all of its members at once.
  pub fn select_clusters(
    &self,
    decider: &LodDecider,
    mut visible: impl FnMut(&BoundingSphere) -> bool,
  ) -> Vec<ClusterHandle> {
    let mut selected = Vec::new();
    let mut visited_groups = FastHashSet::default();
    let mut stack: Vec<ClusterHandle> = self.top_level_clusters().collect();

    while let Some(handle) = stack.pop() {
      let Some(cluster) = self.cluster(handle) else {
        continue;
      };
      if !visible(&cluster.bounding) {
        continue;
      }

      if self.cluster_renderable(handle, decider) {
        selected.push(handle);
        continue;
      }
      if decider.within_tolerance(&cluster.bounding, handle.level) {
        continue;
      }

      let (Some(source), Some(finer)) = (cluster.source_group, handle.level.checked_sub(1)) else {
        continue;
      };
      if !visited_groups.insert((finer, source)) {
        continue;
      }
      let Some(group) = self.levels[finer as usize].groups.get(source as usize) else {
        continue;
      };
      if visible(&group.bounding) {
        stack.extend(
          group
            .clusters
            .iter()
            .map(|cluster| ClusterHandle::new(finer, *cluster)),
        );
      }
    }

    selected.sort_unstable();
    log::trace!("{} clusters selected", selected.len());
    selected
  }
}

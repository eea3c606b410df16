use crate::*;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EdgeCollapseConfig {
  /// stop once the alive triangle count is at or below this
  pub target_triangle_count: usize,
  /// collapses costing more than this are never applied
  pub target_error: f32,
  /// multiplier of the quadric keeping open border edges in place
  pub border_weight: f32,
}

impl Default for EdgeCollapseConfig {
  fn default() -> Self {
    Self {
      target_triangle_count: 0,
      target_error: f32::INFINITY,
      border_weight: 10.,
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct SimplificationResult {
  /// only the vertices referenced by `indices`, in first use order
  pub positions: Vec<Vec3>,
  pub indices: Vec<u32>,
  /// the largest quadric error among applied collapses
  pub error: f32,
  pub collapse_count: usize,
}

impl SimplificationResult {
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

/// Collapse edges, cheapest quadric error first, until the target triangle count is reached or
/// no legal collapse remains.
///
/// - vertices with bit identical positions are welded before simplification.
/// - a locked vertex keeps its position, so an edge with two locked ends is never collapsed and
///   an edge with one locked end collapses onto it.
/// - collapses that would flip a triangle or make the surface non manifold are refused.
/// - degenerate input triangles are dropped.
///
/// A mesh that can not be reduced is returned as is, this is not an error.
pub fn simplify_by_edge_collapse(
  positions: &[Vec3],
  indices: &[u32],
  vertex_lock: Option<&[bool]>,
  config: EdgeCollapseConfig,
) -> SimplificationResult {
  let mut collapser = EdgeCollapser::new(positions, indices, vertex_lock, config.border_weight);
  let input_triangle_count = collapser.alive_triangle_count;

  while collapser.alive_triangle_count > config.target_triangle_count {
    let Some(candidate) = collapser.queue.pop() else {
      break;
    };
    if !collapser.is_current(&candidate) {
      continue;
    }
    if candidate.cost > config.target_error {
      break;
    }
    if !collapser.is_legal(&candidate) {
      continue;
    }
    collapser.apply(candidate);
  }

  let result = collapser.finish();
  log::trace!(
    "edge collapse: {input_triangle_count} to {} triangles by {} collapses, error {}",
    result.triangle_count(),
    result.collapse_count,
    result.error
  );
  result
}

#[derive(Clone, Copy, Debug)]
struct CollapseCandidate {
  cost: f32,
  keep: u32,
  remove: u32,
  target: Vec3,
  keep_stamp: u32,
  remove_stamp: u32,
}

impl Ord for CollapseCandidate {
  // min heap on cost, then the smallest ids first
  fn cmp(&self, other: &Self) -> Ordering {
    other
      .cost
      .total_cmp(&self.cost)
      .then_with(|| other.keep.cmp(&self.keep))
      .then_with(|| other.remove.cmp(&self.remove))
  }
}

impl PartialOrd for CollapseCandidate {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for CollapseCandidate {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for CollapseCandidate {}

/// Working state, indexed by welded vertex id.
///
/// Every vertex carries a stamp bumped whenever its position or quadric changes. A queued
/// candidate is current only if both its stamps still match, so stale proposals are dropped when
/// popped instead of being searched and updated in the heap.
struct EdgeCollapser {
  positions: Vec<Vec3>,
  quadrics: Vec<Quadric>,
  locked: Vec<bool>,
  removed: Vec<bool>,
  stamps: Vec<u32>,
  triangles: Vec<[u32; 3]>,
  triangle_alive: Vec<bool>,
  alive_triangle_count: usize,
  vertex_triangles: Vec<Vec<u32>>,
  queue: BinaryHeap<CollapseCandidate>,
  max_error: f32,
  collapse_count: usize,
}

impl EdgeCollapser {
  fn new(
    positions: &[Vec3],
    indices: &[u32],
    vertex_lock: Option<&[bool]>,
    border_weight: f32,
  ) -> Self {
    let remap = build_position_remap(positions);

    let mut locked = vec![false; positions.len()];
    if let Some(vertex_lock) = vertex_lock {
      for (i, lock) in vertex_lock.iter().enumerate() {
        if *lock {
          locked[remap[i] as usize] = true;
        }
      }
    }

    let triangles: Vec<[u32; 3]> = indices
      .chunks_exact(3)
      .map(|t| [remap[t[0] as usize], remap[t[1] as usize], remap[t[2] as usize]])
      .filter(|[a, b, c]| a != b && b != c && c != a)
      .collect();

    let mut vertex_triangles = vec![Vec::new(); positions.len()];
    for (i, triangle) in triangles.iter().enumerate() {
      for v in triangle {
        vertex_triangles[*v as usize].push(i as u32);
      }
    }

    let mut collapser = Self {
      positions: positions.to_vec(),
      quadrics: Vec::new(),
      locked,
      removed: vec![false; positions.len()],
      stamps: vec![0; positions.len()],
      triangle_alive: vec![true; triangles.len()],
      alive_triangle_count: triangles.len(),
      triangles,
      vertex_triangles,
      queue: BinaryHeap::new(),
      max_error: 0.,
      collapse_count: 0,
    };
    collapser.fill_quadrics(border_weight);
    collapser.fill_queue();
    collapser
  }

  fn fill_quadrics(&mut self, border_weight: f32) {
    let mut quadrics = vec![Quadric::default(); self.positions.len()];
    let mut edge_use: FastHashMap<(u32, u32), u32> =
      fast_hash_map_with_capacity(self.triangles.len() * 3);

    for [a, b, c] in self.triangles.iter().copied() {
      let q = Quadric::from_triangle(
        self.positions[a as usize],
        self.positions[b as usize],
        self.positions[c as usize],
        1.0,
      );
      quadrics[a as usize] += q;
      quadrics[b as usize] += q;
      quadrics[c as usize] += q;

      for (x, y) in [(a, b), (b, c), (c, a)] {
        *edge_use.entry((x.min(y), x.max(y))).or_insert(0) += 1;
      }
    }

    // open border edges get a perpendicular plane so they prefer to slide along the border
    for [a, b, c] in self.triangles.iter().copied() {
      for (x, y, opposite) in [(a, b, c), (b, c, a), (c, a, b)] {
        if edge_use[&(x.min(y), x.max(y))] != 1 {
          continue;
        }
        let q = Quadric::from_triangle_edge(
          self.positions[x as usize],
          self.positions[y as usize],
          self.positions[opposite as usize],
          border_weight,
        );
        quadrics[x as usize] += q;
        quadrics[y as usize] += q;
      }
    }

    self.quadrics = quadrics;
  }

  fn fill_queue(&mut self) {
    let mut edges: Vec<(u32, u32)> = self
      .triangles
      .iter()
      .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
      .map(|(x, y)| (x.min(y), x.max(y)))
      .collect();
    edges.sort_unstable();
    edges.dedup();

    for (a, b) in edges {
      if let Some(candidate) = self.evaluate(a, b) {
        self.queue.push(candidate);
      }
    }
  }

  fn evaluate(&self, u: u32, v: u32) -> Option<CollapseCandidate> {
    let (lock_u, lock_v) = (self.locked[u as usize], self.locked[v as usize]);
    if lock_u && lock_v {
      return None;
    }

    let q = self.quadrics[u as usize] + self.quadrics[v as usize];
    let pu = self.positions[u as usize];
    let pv = self.positions[v as usize];

    let (keep, remove, target) = if lock_u {
      (u, v, pu)
    } else if lock_v {
      (v, u, pv)
    } else {
      let mid = (pu + pv) * 0.5;
      // a nearly singular system may produce a far away optimum, fall back to the edge then
      let reach = pu.distance(pv) * 2.;
      let target = q
        .optimal_position()
        .filter(|p| p.distance(mid) <= reach)
        .unwrap_or_else(|| {
          [pu, pv, mid]
            .into_iter()
            .min_by(|a, b| q.error(*a).total_cmp(&q.error(*b)))
            .unwrap_or(mid)
        });
      (u, v, target)
    };

    Some(CollapseCandidate {
      cost: q.error(target),
      keep,
      remove,
      target,
      keep_stamp: self.stamps[keep as usize],
      remove_stamp: self.stamps[remove as usize],
    })
  }

  fn is_current(&self, candidate: &CollapseCandidate) -> bool {
    !self.removed[candidate.keep as usize]
      && !self.removed[candidate.remove as usize]
      && self.stamps[candidate.keep as usize] == candidate.keep_stamp
      && self.stamps[candidate.remove as usize] == candidate.remove_stamp
  }

  fn alive_triangles_of(&self, vertex: u32) -> impl Iterator<Item = u32> + '_ {
    self.vertex_triangles[vertex as usize]
      .iter()
      .copied()
      .filter(|t| self.triangle_alive[*t as usize])
  }

  fn neighbors(&self, vertex: u32) -> Vec<u32> {
    let mut neighbors: Vec<u32> = self
      .alive_triangles_of(vertex)
      .flat_map(|t| self.triangles[t as usize])
      .filter(|v| *v != vertex)
      .collect();
    neighbors.sort_unstable();
    neighbors.dedup();
    neighbors
  }

  fn is_on_open_border(&self, vertex: u32) -> bool {
    let mut around: Vec<u32> = self
      .alive_triangles_of(vertex)
      .flat_map(|t| self.triangles[t as usize])
      .filter(|v| *v != vertex)
      .collect();
    around.sort_unstable();
    // an edge used by a single triangle shows up exactly once
    around
      .chunk_by(|a, b| a == b)
      .any(|run| run.len() == 1)
  }

  fn is_legal(&self, candidate: &CollapseCandidate) -> bool {
    let CollapseCandidate { keep, remove, .. } = *candidate;

    // link condition: the only vertices adjacent to both ends are the apexes of the triangles
    // sharing the edge, otherwise the collapse pinches the surface
    let shared_triangles = self
      .alive_triangles_of(keep)
      .filter(|t| self.triangles[*t as usize].contains(&remove))
      .count();
    if shared_triangles == 0 {
      return false;
    }
    let keep_neighbors = self.neighbors(keep);
    let common = self
      .neighbors(remove)
      .iter()
      .filter(|v| keep_neighbors.binary_search(v).is_ok())
      .count();
    if common != shared_triangles {
      return false;
    }
    // an inner edge between two open border vertices would pinch the border into a bow tie
    if shared_triangles > 1 && self.is_on_open_border(keep) && self.is_on_open_border(remove) {
      return false;
    }

    // no surviving triangle may flip
    for vertex in [keep, remove] {
      for t in self.alive_triangles_of(vertex) {
        let triangle = self.triangles[t as usize];
        if triangle.contains(&keep) && triangle.contains(&remove) {
          continue;
        }
        let before = triangle.map(|v| self.positions[v as usize]);
        let after = triangle.map(|v| {
          if v == keep || v == remove {
            candidate.target
          } else {
            self.positions[v as usize]
          }
        });
        let normal_before = (before[1] - before[0]).cross(before[2] - before[0]);
        let normal_after = (after[1] - after[0]).cross(after[2] - after[0]);
        if normal_before.length_squared() > 0. && normal_before.dot(normal_after) <= 0. {
          return false;
        }
      }
    }

    true
  }

  fn apply(&mut self, candidate: CollapseCandidate) {
    let CollapseCandidate { keep, remove, .. } = candidate;
    let (k, r) = (keep as usize, remove as usize);

    self.positions[k] = candidate.target;
    let removed_quadric = self.quadrics[r];
    self.quadrics[k] += removed_quadric;
    self.removed[r] = true;
    self.stamps[k] += 1;

    for t in std::mem::take(&mut self.vertex_triangles[r]) {
      if !self.triangle_alive[t as usize] {
        continue;
      }
      let triangle = &mut self.triangles[t as usize];
      if triangle.contains(&keep) {
        self.triangle_alive[t as usize] = false;
        self.alive_triangle_count -= 1;
      } else {
        triangle.iter_mut().filter(|v| **v == remove).for_each(|v| *v = keep);
        self.vertex_triangles[k].push(t);
      }
    }

    let alive = &self.triangle_alive;
    let keep_triangles = &mut self.vertex_triangles[k];
    keep_triangles.retain(|t| alive[*t as usize]);
    keep_triangles.sort_unstable();
    keep_triangles.dedup();

    self.max_error = self.max_error.max(candidate.cost);
    self.collapse_count += 1;

    for neighbor in self.neighbors(keep) {
      if let Some(candidate) = self.evaluate(keep, neighbor) {
        self.queue.push(candidate);
      }
    }
  }

  fn finish(self) -> SimplificationResult {
    let mut compact = vec![u32::MAX; self.positions.len()];
    let mut positions = Vec::new();
    let mut indices = Vec::with_capacity(self.alive_triangle_count * 3);

    for (triangle, alive) in self.triangles.iter().zip(self.triangle_alive.iter()) {
      if !alive {
        continue;
      }
      for v in triangle {
        let slot = &mut compact[*v as usize];
        if *slot == u32::MAX {
          *slot = positions.len() as u32;
          positions.push(self.positions[*v as usize]);
        }
        indices.push(*slot);
      }
    }

    SimplificationResult {
      positions,
      indices,
      error: self.max_error,
      collapse_count: self.collapse_count,
    }
  }
}

#[cfg(test)]
mod test {
  use lod_mesh_test_util::*;

  use super::*;

  fn boundary_edges(positions: &[Vec3], indices: &[u32]) -> Vec<[[u32; 3]; 2]> {
    let key = |v: u32| positions[v as usize].to_array().map(f32::to_bits);
    let mut count: FastHashMap<([u32; 3], [u32; 3]), u32> = FastHashMap::default();
    for t in indices.chunks_exact(3) {
      for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
        let (ka, kb) = (key(a), key(b));
        *count.entry((ka.min(kb), ka.max(kb))).or_insert(0) += 1;
      }
    }
    let mut edges: Vec<_> = count
      .into_iter()
      .filter(|(_, c)| *c == 1)
      .map(|((a, b), _)| [a, b])
      .collect();
    edges.sort_unstable();
    edges
  }

  fn on_grid_border(p: Vec3) -> bool {
    p.x == 0. || p.x == 1. || p.z == 0. || p.z == 1.
  }

  #[test]
  fn flat_grid_reaches_target() {
    let mesh = grid_plane(16);
    let config = EdgeCollapseConfig {
      target_triangle_count: mesh.triangle_count() / 2,
      ..Default::default()
    };
    let result = simplify_by_edge_collapse(&mesh.positions, &mesh.indices, None, config);

    assert!(result.triangle_count() <= config.target_triangle_count);
    assert!(result.triangle_count() > 0);
    assert!(result.collapse_count > 0);
    // the plane stays a plane
    assert!(result.positions.iter().all(|p| p.y.abs() < 1e-4));
  }

  #[test]
  fn locked_border_is_preserved() {
    let mesh = grid_plane(8);
    let lock: Vec<bool> = mesh.positions.iter().map(|p| on_grid_border(*p)).collect();
    let config = EdgeCollapseConfig {
      target_triangle_count: 4,
      ..Default::default()
    };
    let result = simplify_by_edge_collapse(&mesh.positions, &mesh.indices, Some(&lock), config);

    assert!(result.triangle_count() < mesh.triangle_count());
    for (p, locked) in mesh.positions.iter().zip(lock.iter()) {
      if *locked {
        assert!(result.positions.contains(p), "locked vertex {p} moved");
      }
    }
    assert_eq!(
      boundary_edges(&mesh.positions, &mesh.indices),
      boundary_edges(&result.positions, &result.indices)
    );
  }

  #[test]
  fn fully_locked_mesh_is_unchanged() {
    let mesh = quad_strip(2);
    let lock = vec![true; mesh.positions.len()];
    let config = EdgeCollapseConfig {
      target_triangle_count: 1,
      ..Default::default()
    };
    let result = simplify_by_edge_collapse(&mesh.positions, &mesh.indices, Some(&lock), config);

    assert_eq!(result.collapse_count, 0);
    assert_eq!(result.triangle_count(), mesh.triangle_count());
    let soup: Vec<Vec3> = result
      .indices
      .iter()
      .map(|i| result.positions[*i as usize])
      .collect();
    assert_eq!(soup, mesh.to_triangle_soup());
    assert_eq!(result.error, 0.);
  }

  #[test]
  fn sphere_keeps_its_shape() {
    let mesh = uv_sphere(32, 16);
    let config = EdgeCollapseConfig {
      target_triangle_count: mesh.triangle_count() / 2,
      ..Default::default()
    };
    let result = simplify_by_edge_collapse(&mesh.positions, &mesh.indices, None, config);

    assert!(result.triangle_count() <= config.target_triangle_count);
    assert!(result
      .positions
      .iter()
      .all(|p| p.length() > 0.8 && p.length() < 1.1));
    // closed input stays closed
    assert!(boundary_edges(&result.positions, &result.indices).is_empty());
  }

  #[test]
  fn error_limit_stops_collapses() {
    let mesh = uv_sphere(16, 8);
    let config = EdgeCollapseConfig {
      target_triangle_count: 0,
      target_error: 0.,
      ..Default::default()
    };
    let result = simplify_by_edge_collapse(&mesh.positions, &mesh.indices, None, config);
    assert!(result.error <= 0.);
    assert!(result.triangle_count() > 0);
  }
}

use std::f32::consts::FRAC_PI_3;

use glam::{Mat4, Vec2, Vec3};
use lod_mesh_graph::*;
use lod_mesh_test_util::*;

fn source(mesh: TestMesh) -> MeshBufferSource {
  MeshBufferSource::from_triangle_soup(&mesh.to_triangle_soup())
}

fn sphere_graph() -> LodGraph {
  let config = LodGraphBuildConfig {
    cluster_triangle_limit: 32,
    ..Default::default()
  };
  let builder = DefaultMeshLodGraphBuilder::default();
  LodGraph::build_from_mesh(&builder, source(uv_sphere(32, 24)), config).unwrap()
}

/// every undirected edge of a closed surface is used by exactly two triangles
fn assert_watertight(mesh: &MeshBufferSource, level: usize) {
  let mut edges = std::collections::HashMap::new();
  for t in 0..mesh.triangle_count() as u32 {
    let [a, b, c] = mesh.triangle(t);
    for (x, y) in [(a, b), (b, c), (c, a)] {
      *edges.entry((x.min(y), x.max(y))).or_insert(0) += 1;
    }
  }
  for (edge, count) in edges {
    assert_eq!(count, 2, "level {level} edge {edge:?} is used {count} times");
  }
}

#[test]
fn sphere_graph_invariants() {
  let graph = sphere_graph();
  graph.validate().unwrap();
  assert!(graph.levels.len() >= 3, "only {} levels", graph.levels.len());

  let first = &graph.levels[0];
  assert_eq!(first.triangle_count(), 32 * 2 + 32 * 22 * 2);
  assert!(first.clusters.iter().all(|c| c.source_group.is_none()));

  for (index, level) in graph.levels.iter().enumerate() {
    assert!(level
      .clusters
      .iter()
      .all(|c| c.triangles.len() <= graph.build_config.cluster_triangle_limit as usize));

    for cluster in &level.clusters {
      for t in &cluster.triangles {
        for p in level.mesh.triangle_positions(*t) {
          assert!(cluster.bounding.contains_point(p, 1e-4), "level {index}");
        }
      }
    }

    assert_watertight(&level.mesh, index);

    if let Some(coarser) = graph.levels.get(index + 1) {
      assert!(coarser.triangle_count() < level.triangle_count());
    }
  }

  let top = graph.top_level().unwrap();
  assert!(top.groups.is_empty());
  assert!(top.clusters.iter().all(|c| c.destination_group.is_none()));
}

#[test]
fn build_is_deterministic() {
  let a = sphere_graph();
  let b = sphere_graph();
  assert_eq!(a.levels, b.levels);
}

#[test]
fn disconnected_patches_never_share_a_cluster() {
  let builder = DefaultMeshLodGraphBuilder::default();
  let config = LodGraphBuildConfig {
    cluster_triangle_limit: 16,
    ..Default::default()
  };
  let graph = LodGraph::build_from_mesh(&builder, source(disjoint_patches(12)), config).unwrap();
  graph.validate().unwrap();

  for (index, level) in graph.levels.iter().enumerate() {
    for cluster in &level.clusters {
      let sides: Vec<bool> = cluster
        .triangles
        .iter()
        .flat_map(|t| level.mesh.triangle_positions(*t))
        .map(|p| p.x > 5.)
        .collect();
      assert!(
        sides.iter().all(|s| *s == sides[0]),
        "level {index} cluster spans both patches"
      );
    }
  }

  let top = graph.top_level().unwrap();
  assert!(top.clusters.len() >= 2);
  assert!(top.triangle_count() < graph.levels[0].triangle_count());
}

#[test]
fn degenerate_triangles_flow_through_the_build() {
  let grid = grid_plane(12);
  let mut mesh = MeshBufferSource {
    positions: grid.positions,
    indices: grid.indices,
  };
  // a point, a line sharing a grid edge and a point far from any other triangle
  mesh.positions.push(Vec3::new(4., 4., 4.));
  let far = (mesh.positions.len() - 1) as u32;
  mesh.indices.extend([5, 5, 5, 0, 0, 1, far, far, far]);

  let config = LodGraphBuildConfig {
    cluster_triangle_limit: 16,
    ..Default::default()
  };
  let builder = DefaultMeshLodGraphBuilder::default();
  let graph = LodGraph::build_from_mesh(&builder, mesh, config).unwrap();
  graph.validate().unwrap();

  assert_eq!(graph.levels[0].triangle_count(), 12 * 12 * 2 + 3);
  assert!(graph.levels.len() >= 2);
  let top = graph.top_level().unwrap();
  assert!(top.triangle_count() < graph.levels[0].triangle_count());

  let dir = tempfile::tempdir().unwrap();
  let prefix = dir.path().join("degenerate");
  graph.write_to_files(&prefix).unwrap();
  let runtime = RuntimeLodGraph::load(&prefix).unwrap();
  assert_eq!(runtime.levels.len(), graph.levels.len());
}

#[test]
fn level_files_round_trip() {
  let graph = sphere_graph();
  let dir = tempfile::tempdir().unwrap();
  let prefix = dir.path().join("sphere");

  let paths = graph.write_to_files(&prefix).unwrap();
  assert_eq!(paths.len(), graph.levels.len());
  assert!(paths.iter().all(|p| p.exists()));

  let runtime = RuntimeLodGraph::load(&prefix).unwrap();
  assert_eq!(runtime.levels.len(), graph.levels.len());

  for (index, (level, loaded)) in graph.levels.iter().zip(&runtime.levels).enumerate() {
    assert_eq!(loaded.clusters.len(), level.clusters.len());
    assert_eq!(loaded.groups.len(), level.groups.len());

    for (cluster_index, (cluster, disk)) in level.clusters.iter().zip(&loaded.clusters).enumerate() {
      assert_eq!(disk.source_group, cluster.source_group);
      assert_eq!(disk.destination_group, cluster.destination_group);
      assert_eq!(disk.bounding, cluster.bounding);
      assert_eq!(disk.vertex_count() as usize, cluster.triangles.len() * 3);

      let handle = ClusterHandle::new(index as u32, cluster_index as u32);
      let mut read: Vec<[u32; 3]> = runtime
        .cluster_vertices(handle)
        .unwrap()
        .iter()
        .map(|p| p.to_array().map(f32::to_bits))
        .collect();
      let mut written: Vec<[u32; 3]> = cluster
        .triangles
        .iter()
        .flat_map(|t| level.mesh.triangle_positions(*t))
        .map(|p| p.to_array().map(f32::to_bits))
        .collect();
      read.sort_unstable();
      written.sort_unstable();
      assert_eq!(read, written);
    }

    for (group, loaded_group) in level.groups.iter().zip(&loaded.groups) {
      assert_eq!(loaded_group.clusters, group.clusters);
      assert_eq!(loaded_group.produced_clusters, group.produced_clusters);
      for cluster in &group.clusters {
        let member = &level.clusters[*cluster as usize].bounding;
        assert!(loaded_group.bounding.contains_sphere(member, 1e-4));
      }
    }
  }
}

#[test]
fn selection_follows_tolerance() {
  let graph = sphere_graph();
  let dir = tempfile::tempdir().unwrap();
  let prefix = dir.path().join("sphere");
  graph.write_to_files(&prefix).unwrap();
  let runtime = RuntimeLodGraph::load(&prefix).unwrap();

  let decider = |tolerance_px| LodDecider {
    view: Mat4::look_at_rh(Vec3::new(0., 0., 6.), Vec3::ZERO, Vec3::Y),
    projection: Mat4::perspective_rh(FRAC_PI_3, 1., 0.1, 100.),
    viewport: Vec2::new(1024., 1024.),
    tolerance_px,
  };

  let all_visible = |_: &BoundingSphere| true;

  let finest = runtime.select_clusters(&decider(0.), all_visible);
  assert_eq!(finest.len(), graph.levels[0].clusters.len());
  assert!(finest.iter().all(|h| h.level == 0));

  let coarsest = runtime.select_clusters(&decider(f32::INFINITY), all_visible);
  assert_eq!(coarsest, runtime.top_level_clusters().collect::<Vec<_>>());

  let middle = decider(200.);
  let selected = runtime.select_clusters(&middle, all_visible);
  assert!(!selected.is_empty());
  assert!(selected
    .iter()
    .all(|h| runtime.cluster_renderable(*h, &middle)));
}

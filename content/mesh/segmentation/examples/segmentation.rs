use std::time::Instant;

use lod_mesh_segmentation::*;
use lod_mesh_test_util::*;

fn main() {
  let triangle_limit = 124;
  let group_limit = 4;

  println!("## Start segmentation test on generated meshes");
  println!("test config: triangle_limit: {triangle_limit}, group_limit: {group_limit}");

  println!();
  for (name, mesh) in [
    ("grid_plane(64)", grid_plane(64)),
    ("grid_plane(256)", grid_plane(256)),
    ("uv_sphere(128, 64)", uv_sphere(128, 64)),
    ("disjoint_patches(64)", disjoint_patches(64)),
  ] {
    test_segmentation(name, &mesh, triangle_limit, group_limit);
    println!();
  }
}

fn test_segmentation(name: &str, mesh: &TestMesh, triangle_limit: u32, group_limit: u32) {
  println!("# For input mesh:<{name}>:");
  println!("  input: face_count: {}", mesh.triangle_count());

  let start = Instant::now();
  let clusters = build_clusters(&mesh.indices, triangle_limit);
  let duration = start.elapsed();

  let full = clusters
    .iter()
    .filter(|c| c.triangles.len() == triangle_limit as usize)
    .count();
  println!(
    "  cluster result: cluster_count: {}, full clusters: {full}, time: {}",
    clusters.len(),
    duration.as_micros() as f64 / 1000.0
  );

  let start = Instant::now();
  let adjacency: Vec<_> = clusters.iter().map(|c| c.adjacency.clone()).collect();
  let groups = build_cluster_groups(&adjacency, group_limit);
  let duration = start.elapsed();

  println!(
    "  group result: group_count: {}, time: {}",
    groups.len(),
    duration.as_micros() as f64 / 1000.0
  );
}

use std::time::Instant;

use lod_mesh_simplification::*;
use lod_mesh_test_util::*;

fn main() {
  let ratio = 0.25;

  println!("## Start simplification test on generated meshes");
  println!("test config: target ratio: {ratio}");

  println!();
  for (name, mesh) in [
    ("grid_plane(128)", grid_plane(128)),
    ("uv_sphere(64, 32)", uv_sphere(64, 32)),
    ("uv_sphere(256, 128)", uv_sphere(256, 128)),
  ] {
    test_simplification(name, &mesh, ratio);
    println!();
  }
}

fn test_simplification(name: &str, mesh: &TestMesh, ratio: f32) {
  let config = EdgeCollapseConfig {
    target_triangle_count: (mesh.triangle_count() as f32 * ratio) as usize,
    ..Default::default()
  };

  println!("# For input mesh:<{name}>:");
  println!("  input: face_count: {}", mesh.triangle_count());

  let start = Instant::now();

  let result = simplify_by_edge_collapse(&mesh.positions, &mesh.indices, None, config);

  let duration = start.elapsed();

  println!(
    "  simplified result: face_count: {}, error: {}, time: {}",
    result.triangle_count(),
    result.error,
    duration.as_micros() as f64 / 1000.0
  );
}

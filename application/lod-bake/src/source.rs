use std::path::Path;

use anyhow::Context;
use glam::Vec3;
use lod_mesh_graph::MeshBufferSource;

/// All models of an obj file merged into one mesh, positions only.
pub fn load_obj_mesh(path: &Path) -> anyhow::Result<MeshBufferSource> {
  let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
    .with_context(|| format!("failed to load obj {path:?}"))?;

  let mut positions = Vec::new();
  let mut indices = Vec::new();
  for model in &models {
    let base = positions.len() as u32;
    positions.extend(
      model
        .mesh
        .positions
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2])),
    );
    indices.extend(model.mesh.indices.iter().map(|i| i + base));
  }
  log::info!(
    "loaded {} models from {path:?}: {} vertices, {} triangles",
    models.len(),
    positions.len(),
    indices.len() / 3
  );

  Ok(MeshBufferSource::new_welded(&positions, &indices))
}

/// A flat `segments` x `segments` grid over [0, 1] on the xz plane.
pub fn grid_mesh(segments: u32) -> MeshBufferSource {
  let row = segments + 1;
  let step = 1. / segments.max(1) as f32;

  let positions: Vec<Vec3> = (0..row)
    .flat_map(|z| (0..row).map(move |x| Vec3::new(x as f32 * step, 0., z as f32 * step)))
    .collect();

  let indices = (0..segments)
    .flat_map(|z| (0..segments).map(move |x| (z, x)))
    .flat_map(|(z, x)| {
      let i00 = z * row + x;
      let i01 = i00 + row;
      [i00, i01, i00 + 1, i00 + 1, i01, i01 + 1]
    })
    .collect();

  MeshBufferSource { positions, indices }
}

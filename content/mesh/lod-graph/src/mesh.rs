use crate::*;

/// Indexed triangle list, positions only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBufferSource {
  pub positions: Vec<Vec3>,
  pub indices: Vec<u32>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct PositionKey([u32; 3]);

impl From<Vec3> for PositionKey {
  fn from(value: Vec3) -> Self {
    Self(value.to_array().map(f32::to_bits))
  }
}

impl MeshBufferSource {
  /// Weld vertices with bit identical positions. Triangle order is kept, positions keep their
  /// first occurrence order.
  pub fn new_welded(positions: &[Vec3], indices: &[u32]) -> Self {
    let mut table = fast_hash_map_with_capacity(positions.len());
    let mut welded = Vec::with_capacity(positions.len());

    let remap: Vec<u32> = positions
      .iter()
      .map(|position| {
        *table.entry(PositionKey::from(*position)).or_insert_with(|| {
          welded.push(*position);
          welded.len() as u32 - 1
        })
      })
      .collect();

    Self {
      positions: welded,
      indices: indices.iter().map(|i| remap[*i as usize]).collect(),
    }
  }

  /// three positions per triangle, no index
  pub fn from_triangle_soup(positions: &[Vec3]) -> Self {
    let indices: Vec<u32> = (0..positions.len() as u32 / 3 * 3).collect();
    Self::new_welded(positions, &indices)
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  pub fn triangle(&self, triangle: u32) -> [u32; 3] {
    let i = triangle as usize * 3;
    [self.indices[i], self.indices[i + 1], self.indices[i + 2]]
  }

  pub fn triangle_positions(&self, triangle: u32) -> [Vec3; 3] {
    self.triangle(triangle).map(|v| self.positions[v as usize])
  }

  /// the first index pointing outside the position buffer, if any
  pub fn find_invalid_index(&self) -> Option<u32> {
    let count = self.positions.len() as u32;
    self.indices.iter().copied().find(|i| *i >= count)
  }

  /// Extract the given triangles as a standalone mesh.
  ///
  /// Returns the mesh and, for each of its vertices, the vertex index in `self`.
  pub fn extract_triangles(&self, triangles: impl IntoIterator<Item = u32>) -> (Self, Vec<u32>) {
    let mut local_of_global = FastHashMap::default();
    let mut global_of_local = Vec::new();
    let mut positions = Vec::new();
    let mut indices = Vec::new();

    for triangle in triangles {
      for v in self.triangle(triangle) {
        let local = *local_of_global.entry(v).or_insert_with(|| {
          global_of_local.push(v);
          positions.push(self.positions[v as usize]);
          positions.len() as u32 - 1
        });
        indices.push(local);
      }
    }

    (Self { positions, indices }, global_of_local)
  }
}

#[cfg(test)]
mod test {
  use lod_mesh_test_util::*;

  use super::*;

  #[test]
  fn triangle_soup_is_welded() {
    let mesh = grid_plane(4);
    let welded = MeshBufferSource::from_triangle_soup(&mesh.to_triangle_soup());

    assert_eq!(welded.positions.len(), mesh.positions.len());
    assert_eq!(welded.triangle_count(), mesh.triangle_count());
    for t in 0..mesh.triangle_count() as u32 {
      let i = t as usize * 3;
      let expected = [0, 1, 2].map(|k| mesh.positions[mesh.indices[i + k] as usize]);
      assert_eq!(welded.triangle_positions(t), expected);
    }
  }

  #[test]
  fn welding_keeps_distinct_positions() {
    let positions = [Vec3::ZERO, Vec3::X, Vec3::ZERO, Vec3::Y];
    let mesh = MeshBufferSource::new_welded(&positions, &[0, 1, 3, 2, 3, 1]);
    assert_eq!(mesh.positions, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 1]);
  }

  #[test]
  fn extracted_triangles_map_back() {
    let mesh = grid_plane(3);
    let source = MeshBufferSource {
      positions: mesh.positions.clone(),
      indices: mesh.indices.clone(),
    };
    let (part, global) = source.extract_triangles([4, 7]);
    assert_eq!(part.triangle_count(), 2);
    for (local, position) in part.positions.iter().enumerate() {
      assert_eq!(*position, source.positions[global[local] as usize]);
    }
    assert_eq!(part.triangle_positions(1), source.triangle_positions(7));
  }
}

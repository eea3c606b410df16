use crate::*;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct VertexPosition([u32; 3]);

impl From<Vec3> for VertexPosition {
  fn from(value: Vec3) -> Self {
    Self([value.x.to_bits(), value.y.to_bits(), value.z.to_bits()])
  }
}

/// For each vertex, the first vertex with a bit identical position.
///
/// for example we have positions
/// [a, a, b, c, c, d, c]
/// we have remap:
/// [0, 0, 2, 3, 3, 5, 3]
pub fn build_position_remap(positions: &[Vec3]) -> Vec<u32> {
  let mut table = fast_hash_map_with_capacity(positions.len());

  positions
    .iter()
    .enumerate()
    .map(|(i, position)| {
      *table
        .entry(VertexPosition::from(*position))
        .or_insert(i as u32)
    })
    .collect()
}

//! Procedural meshes shared by the lod mesh test suites.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

#[derive(Clone, Debug, Default)]
pub struct TestMesh {
  pub positions: Vec<Vec3>,
  pub indices: Vec<u32>,
}

impl TestMesh {
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// expand into a non indexed position list, three positions per triangle
  pub fn to_triangle_soup(&self) -> Vec<Vec3> {
    self
      .indices
      .iter()
      .map(|i| self.positions[*i as usize])
      .collect()
  }

  /// append another mesh, the two meshes share no vertex
  pub fn merge(mut self, other: &TestMesh) -> Self {
    let base = self.positions.len() as u32;
    self.positions.extend_from_slice(&other.positions);
    self.indices.extend(other.indices.iter().map(|i| i + base));
    self
  }

  pub fn translated(mut self, offset: Vec3) -> Self {
    self.positions.iter_mut().for_each(|p| *p += offset);
    self
  }
}

/// A row of `quad_count` unit quads on the xy plane, two triangles per quad.
///
/// Triangles are emitted in strip order, so triangle `i` shares exactly one edge with triangle
/// `i + 1` and none with any other.
pub fn quad_strip(quad_count: u32) -> TestMesh {
  let mut positions = Vec::with_capacity((quad_count as usize + 1) * 2);
  for i in 0..=quad_count {
    positions.push(Vec3::new(i as f32, 0., 0.));
    positions.push(Vec3::new(i as f32, 1., 0.));
  }

  let mut indices = Vec::with_capacity(quad_count as usize * 6);
  for i in 0..quad_count {
    let b0 = i * 2;
    let t0 = b0 + 1;
    let b1 = b0 + 2;
    let t1 = b0 + 3;
    indices.extend_from_slice(&[b0, b1, t0]);
    indices.extend_from_slice(&[t0, b1, t1]);
  }

  TestMesh { positions, indices }
}

/// A `segments` x `segments` grid of quads covering [0, 1] on the xz plane.
pub fn grid_plane(segments: u32) -> TestMesh {
  let row = segments + 1;
  let step = 1. / segments as f32;

  let mut positions = Vec::with_capacity((row * row) as usize);
  for z in 0..row {
    for x in 0..row {
      positions.push(Vec3::new(x as f32 * step, 0., z as f32 * step));
    }
  }

  let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
  for z in 0..segments {
    for x in 0..segments {
      let i00 = z * row + x;
      let i10 = i00 + 1;
      let i01 = i00 + row;
      let i11 = i01 + 1;
      indices.extend_from_slice(&[i00, i01, i10]);
      indices.extend_from_slice(&[i10, i01, i11]);
    }
  }

  TestMesh { positions, indices }
}

/// A closed unit sphere with shared pole vertices.
pub fn uv_sphere(segments: u32, rings: u32) -> TestMesh {
  assert!(segments >= 3 && rings >= 2);

  let mut positions = vec![Vec3::Y];
  for r in 1..rings {
    let phi = PI * r as f32 / rings as f32;
    for s in 0..segments {
      let theta = TAU * s as f32 / segments as f32;
      positions.push(Vec3::new(
        phi.sin() * theta.cos(),
        phi.cos(),
        phi.sin() * theta.sin(),
      ));
    }
  }
  positions.push(Vec3::NEG_Y);

  let south = positions.len() as u32 - 1;
  let ring_start = |r: u32| 1 + (r - 1) * segments;
  let mut indices = Vec::new();

  for s in 0..segments {
    let next = (s + 1) % segments;
    indices.extend_from_slice(&[0, ring_start(1) + next, ring_start(1) + s]);
  }

  for r in 1..rings - 1 {
    for s in 0..segments {
      let next = (s + 1) % segments;
      let a = ring_start(r) + s;
      let b = ring_start(r) + next;
      let c = ring_start(r + 1) + s;
      let d = ring_start(r + 1) + next;
      indices.extend_from_slice(&[a, b, c]);
      indices.extend_from_slice(&[b, d, c]);
    }
  }

  let last = ring_start(rings - 1);
  for s in 0..segments {
    let next = (s + 1) % segments;
    indices.extend_from_slice(&[south, last + s, last + next]);
  }

  TestMesh { positions, indices }
}

/// Two grids placed far enough apart that they share no edge.
pub fn disjoint_patches(segments: u32) -> TestMesh {
  grid_plane(segments).merge(&grid_plane(segments).translated(Vec3::new(10., 0., 0.)))
}

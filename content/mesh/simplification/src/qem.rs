use crate::*;

/// ```txt
/// [a00, a10, a20, b0]
/// [   , a11, a21, b1]
/// [   ,    , a22, b2]
/// [   ,    ,    , c ]
///
/// a00*x^2 + a11*y^2 + a22*z^2 + 2*a10*xy + 2*a20*xz + 2*a21*yz + 2*b0*x + 2*b1*y + 2*b2*z + c
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Quadric {
  a00: f32,
  a11: f32,
  a22: f32,
  a10: f32,
  a20: f32,
  a21: f32,
  b0: f32,
  b1: f32,
  b2: f32,
  c: f32,
  /// weight, linearly apply on all matrix element
  w: f32,
}

impl Add for Quadric {
  type Output = Self;
  fn add(mut self, other: Self) -> Self {
    self += other;
    self
  }
}

impl AddAssign for Quadric {
  fn add_assign(&mut self, other: Self) {
    self.a00 += other.a00;
    self.a11 += other.a11;
    self.a22 += other.a22;
    self.a10 += other.a10;
    self.a20 += other.a20;
    self.a21 += other.a21;
    self.b0 += other.b0;
    self.b1 += other.b1;
    self.b2 += other.b2;
    self.c += other.c;
    self.w += other.w;
  }
}

#[inline(always)]
pub(crate) fn inverse_or_zeroed(value: f32) -> f32 {
  if value != 0.0 {
    1.0 / value
  } else {
    0.0
  }
}

impl Quadric {
  /// plane `ax + by + cz + d = 0` with unit normal `(a, b, c)`
  pub fn from_plane(normal: Vec3, d: f32, w: f32) -> Self {
    let Vec3 { x: a, y: b, z: c } = normal;
    let aw = a * w;
    let bw = b * w;
    let cw = c * w;
    let dw = d * w;

    Self {
      a00: a * aw,
      a11: b * bw,
      a22: c * cw,
      a10: a * bw,
      a20: a * cw,
      a21: b * cw,
      b0: a * dw,
      b1: b * dw,
      b2: c * dw,
      c: d * dw,
      w,
    }
  }

  pub fn from_triangle(p0: Vec3, p1: Vec3, p2: Vec3, weight: f32) -> Self {
    let normal = (p1 - p0).cross(p2 - p0);
    let area = normal.length();
    let normal = normal * inverse_or_zeroed(area);

    let distance = normal.dot(p0);

    // we use sqrt(area) so that the error is scaled linearly; this tends to improve silhouettes
    Self::from_plane(normal, -distance, area.sqrt() * weight)
  }

  /// the plane is passing p0-p1, perpendicular to the triangle, with normal that point to p2
  pub fn from_triangle_edge(p0: Vec3, p1: Vec3, p2: Vec3, weight: f32) -> Self {
    let p10 = p1 - p0;

    // edge length; keep squared length around for projection correction
    let length_sq = p10.length_squared();
    let length = length_sq.sqrt();

    // p20p = length of projection of p2-p0 onto p1-p0; note that p10 is unnormalized so we need to correct it later
    let p20 = p2 - p0;
    let p20p = p20.dot(p10);

    let normal = (p20 * length_sq - p10 * p20p).normalize_or_zero();

    let distance = normal.dot(p0);

    // the weight is scaled linearly with edge length; this has to match the triangle weight
    Self::from_plane(normal, -distance, length * weight)
  }

  pub fn weight(&self) -> f32 {
    self.w
  }

  pub fn error(&self, v: Vec3) -> f32 {
    let mut rx = self.b0;
    let mut ry = self.b1;
    let mut rz = self.b2;

    rx += self.a10 * v.y;
    ry += self.a21 * v.z;
    rz += self.a20 * v.x;

    rx *= 2.0;
    ry *= 2.0;
    rz *= 2.0;

    rx += self.a00 * v.x;
    ry += self.a11 * v.y;
    rz += self.a22 * v.z;

    let mut r = self.c;
    r += rx * v.x;
    r += ry * v.y;
    r += rz * v.z;

    let s = inverse_or_zeroed(self.w);

    r.abs() * s
  }

  /// The point minimizing the error, `None` when the quadric is (near) singular, e.g. when all
  /// accumulated planes are parallel.
  pub fn optimal_position(&self) -> Option<Vec3> {
    let a = Mat3::from_cols(
      Vec3::new(self.a00, self.a10, self.a20),
      Vec3::new(self.a10, self.a11, self.a21),
      Vec3::new(self.a20, self.a21, self.a22),
    );
    let scale = self.a00 + self.a11 + self.a22;
    if scale <= 0.0 {
      return None;
    }

    let det = a.determinant();
    if det.abs() <= 1e-5 * scale * scale * scale {
      return None;
    }

    let position = a.inverse() * -Vec3::new(self.b0, self.b1, self.b2);
    position.is_finite().then_some(position)
  }
}

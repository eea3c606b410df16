use crate::*;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
  pub center: Vec3,
  pub radius: f32,
}

impl BoundingSphere {
  pub fn new(center: Vec3, radius: f32) -> Self {
    Self { center, radius }
  }

  pub fn from_array([x, y, z, radius]: [f32; 4]) -> Self {
    Self::new(Vec3::new(x, y, z), radius)
  }

  pub fn to_array(self) -> [f32; 4] {
    [self.center.x, self.center.y, self.center.z, self.radius]
  }

  pub fn contains_point(&self, point: Vec3, epsilon: f32) -> bool {
    point.distance(self.center) <= self.radius + epsilon
  }

  pub fn contains_sphere(&self, other: &Self, epsilon: f32) -> bool {
    other.center.distance(self.center) + other.radius <= self.radius + epsilon
  }

  /// Approximate minimal enclosing sphere, by extremal points.
  ///
  /// Starting at any point, the farthest point `a` from it and then the farthest point `b` from
  /// `a` fix an initial sphere on the diameter `ab`. Every point still outside grows the sphere
  /// just enough to reach it. The result encloses all points but is not exactly minimal.
  /// No point gives a zero sphere at the origin, a single point gives a zero radius sphere on it.
  // we cant impl from iter trait because it need iter several times
  pub fn from_points<I>(points: I) -> Self
  where
    I: IntoIterator<Item = Vec3> + Clone,
  {
    let Some(start) = points.clone().into_iter().next() else {
      return Self::default();
    };

    let farthest_from = |from: Vec3| {
      points
        .clone()
        .into_iter()
        .max_by(|a, b| a.distance_squared(from).total_cmp(&b.distance_squared(from)))
        .unwrap_or(from)
    };

    let a = farthest_from(start);
    let b = farthest_from(a);

    let mut center = (a + b) * 0.5;
    let mut radius = a.distance(b) * 0.5;

    for point in points.clone() {
      let distance = point.distance(center);
      if distance > radius {
        let new_radius = (radius + distance) * 0.5;
        center += (point - center) * ((new_radius - radius) / distance);
        radius = new_radius;
      }
    }

    // absorb the rounding of the incremental updates
    let radius = points
      .into_iter()
      .fold(radius, |r, point| r.max(point.distance(center)));

    Self::new(center, radius)
  }

  /// Approximate enclosing sphere of spheres, with the same extremal expansion as
  /// [`BoundingSphere::from_points`]. A single sphere is returned as is.
  pub fn from_spheres<I>(spheres: I) -> Self
  where
    I: IntoIterator<Item = Self> + Clone,
  {
    let Some(start) = spheres.clone().into_iter().next() else {
      return Self::default();
    };

    // the sphere whose far side is the farthest away from `from`
    let farthest_from = |from: Vec3| {
      spheres
        .clone()
        .into_iter()
        .max_by(|a, b| {
          let da = a.center.distance(from) + a.radius;
          let db = b.center.distance(from) + b.radius;
          da.total_cmp(&db)
        })
        .unwrap_or(start)
    };

    let a = farthest_from(start.center);
    let b = farthest_from(a.center);

    let mut result = a.merge(&b);
    for sphere in spheres.clone() {
      result = result.merge(&sphere);
    }

    let radius = spheres.into_iter().fold(result.radius, |r, sphere| {
      r.max(sphere.center.distance(result.center) + sphere.radius)
    });

    Self::new(result.center, radius)
  }

  /// the smallest sphere enclosing both
  pub fn merge(&self, other: &Self) -> Self {
    let offset = other.center - self.center;
    let distance = offset.length();

    if distance + other.radius <= self.radius {
      return *self;
    }
    if distance + self.radius <= other.radius {
      return *other;
    }

    let radius = (self.radius + distance + other.radius) * 0.5;
    let center = self.center + offset * ((radius - self.radius) / distance);
    Self::new(center, radius)
  }
}

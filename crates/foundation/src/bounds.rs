use crate::math::Vec3;

/// Axis-aligned bounding box.
///
/// An empty box has `min > max` on every axis so that extending it with the
/// first point yields a zero-sized box at that point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb3 { min, max }
    }

    pub fn empty() -> Self {
        Aabb3 {
            min: Vec3::splat(f64::INFINITY),
            max: Vec3::splat(f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut b = Self::empty();
        for p in points {
            b.extend(p);
        }
        b
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb3) -> Aabb3 {
        Aabb3 {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths; zero for an empty box.
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn max_dimension(&self) -> f64 {
        self.size().max_element()
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb3;
    use crate::math::Vec3;

    #[test]
    fn empty_box_has_no_size() {
        let b = Aabb3::empty();
        assert!(b.is_empty());
        assert_eq!(b.size(), Vec3::ZERO);
    }

    #[test]
    fn from_points_spans_all_points() {
        let b = Aabb3::from_points([
            Vec3::new(4.0, 4.0, 4.0),
            Vec3::new(6.0, 5.0, 6.0),
            Vec3::new(5.0, 6.0, 5.0),
        ]);
        assert_eq!(b.min, Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(b.max, Vec3::new(6.0, 6.0, 6.0));
        assert_eq!(b.center(), Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(b.max_dimension(), 2.0);
        assert!(b.contains(Vec3::new(5.0, 5.0, 5.0)));
        assert!(!b.contains(Vec3::new(7.0, 5.0, 5.0)));
    }

    #[test]
    fn union_with_empty_is_identity() {
        let b = Aabb3::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.union(&Aabb3::empty()), b);
    }
}

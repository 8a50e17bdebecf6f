use foundation::bounds::Aabb3;
use foundation::math::Vec3;

/// Translation plus uniform scale.
///
/// Rotations from imported assets are baked into mesh vertices, so nodes only
/// ever need to move and uniformly resize their subtree.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: f64,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 0.0),
            scale: 1.0,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            scale: 1.0,
        }
    }

    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        self.position + p * self.scale
    }

    /// `self` applied after `child`: the transform of a child expressed in
    /// this transform's parent space.
    pub fn then(&self, child: &Transform) -> Transform {
        Transform {
            position: self.apply_point(child.position),
            scale: self.scale * child.scale,
        }
    }

    pub fn apply_bounds(&self, b: &Aabb3) -> Aabb3 {
        if b.is_empty() {
            return *b;
        }
        Aabb3::from_points([self.apply_point(b.min), self.apply_point(b.max)])
    }

    /// Column-major 4x4 matrix.
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        let s = self.scale as f32;
        let p = self.position.to_f32();
        [
            [s, 0.0, 0.0, 0.0],
            [0.0, s, 0.0, 0.0],
            [0.0, 0.0, s, 0.0],
            [p[0], p[1], p[2], 1.0],
        ]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::Transform;
    use foundation::bounds::Aabb3;
    use foundation::math::Vec3;

    #[test]
    fn identity_is_origin() {
        let transform = Transform::identity();
        assert_eq!(transform.position, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(transform.scale, 1.0);
    }

    #[test]
    fn composition_scales_child_offsets() {
        let parent = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            scale: 2.0,
        };
        let child = Transform::translate(Vec3::new(0.0, 3.0, 0.0));
        let world = parent.then(&child);
        assert_eq!(world.position, Vec3::new(1.0, 6.0, 0.0));
        assert_eq!(world.scale, 2.0);
    }

    #[test]
    fn bounds_follow_scale_and_translation() {
        let t = Transform {
            position: Vec3::new(0.0, -1.0, 0.0),
            scale: 0.5,
        };
        let b = t.apply_bounds(&Aabb3::new(Vec3::splat(-2.0), Vec3::splat(2.0)));
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -1.0));
        assert_eq!(b.max, Vec3::new(1.0, 0.0, 1.0));
    }
}

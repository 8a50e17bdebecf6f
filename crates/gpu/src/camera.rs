use foundation::math::Vec3;
use glam::{DMat4, DVec3};

/// Orthographic camera with an explicit look-at target.
///
/// The frustum extents are in view space; `right - left` and `top - bottom`
/// are the visible width and height in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrthographicCamera {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub near: f64,
    pub far: f64,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl OrthographicCamera {
    /// Symmetric frustum of the given half extents, looking down -Z from +Z.
    pub fn symmetric(half_width: f64, half_height: f64, near: f64, far: f64) -> Self {
        Self {
            left: -half_width,
            right: half_width,
            top: half_height,
            bottom: -half_height,
            near,
            far,
            position: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }

    pub fn set_extents(&mut self, half_width: f64, half_height: f64) {
        self.left = -half_width;
        self.right = half_width;
        self.top = half_height;
        self.bottom = -half_height;
    }

    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn view_matrix(&self) -> DMat4 {
        DMat4::look_at_rh(dvec(self.position), dvec(self.target), dvec(self.up))
    }

    /// Right-handed projection with a `[0, 1]` depth range.
    pub fn projection_matrix(&self) -> DMat4 {
        DMat4::orthographic_rh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }

    /// Column-major view-projection, ready for a uniform buffer.
    pub fn view_proj(&self) -> [[f32; 4]; 4] {
        (self.projection_matrix() * self.view_matrix())
            .as_mat4()
            .to_cols_array_2d()
    }
}

fn dvec(v: Vec3) -> DVec3 {
    DVec3::new(v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::OrthographicCamera;
    use foundation::math::Vec3;
    use glam::{DVec3, DVec4};

    #[test]
    fn extents_define_width_and_height() {
        let mut cam = OrthographicCamera::symmetric(3.0, 2.0, 0.1, 100.0);
        assert_eq!(cam.width(), 6.0);
        assert_eq!(cam.height(), 4.0);
        cam.set_extents(1.0, 0.5);
        assert_eq!(cam.width(), 2.0);
        assert_eq!(cam.height(), 1.0);
    }

    #[test]
    fn target_projects_to_clip_center() {
        let mut cam = OrthographicCamera::symmetric(2.0, 2.0, 0.1, 100.0);
        cam.look_at(Vec3::new(10.0, 5.0, 10.0), Vec3::new(0.0, -0.4, 0.0));
        let m = cam.projection_matrix() * cam.view_matrix();
        let clip = m * DVec4::new(0.0, -0.4, 0.0, 1.0);
        assert!(clip.x.abs() < 1e-9);
        assert!(clip.y.abs() < 1e-9);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn frustum_edge_maps_to_ndc_edge() {
        let mut cam = OrthographicCamera::symmetric(2.0, 1.0, 0.1, 100.0);
        cam.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        let m = cam.projection_matrix() * cam.view_matrix();
        let p = m.project_point3(DVec3::new(2.0, 1.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-9);
        assert!((p.y - 1.0).abs() < 1e-9);
    }
}

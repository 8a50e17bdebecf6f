use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use glam::{DMat4, DVec3};

/// Orthographic view from the sun, fitted around everything that casts or
/// receives a shadow.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShadowView {
    pub view_proj: DMat4,
}

impl ShadowView {
    /// Fit a light frustum to `region` for a sun shining along `sun_dir`.
    ///
    /// Returns `None` for an empty region or a zero direction.
    pub fn fit(sun_dir: Vec3, region: &Aabb3) -> Option<Self> {
        let dir = sun_dir.normalize_or_zero();
        if dir == Vec3::ZERO || region.is_empty() {
            return None;
        }
        let center = region.center();
        let radius = (region.size().length() * 0.5).max(1e-3);

        let eye = center - dir * (radius * 2.0);
        let up = if dir.y.abs() > 0.99 { DVec3::Z } else { DVec3::Y };
        let view = DMat4::look_at_rh(dvec(eye), dvec(center), up);
        let proj = DMat4::orthographic_rh(-radius, radius, -radius, radius, 0.0, radius * 4.0);
        Some(Self {
            view_proj: proj * view,
        })
    }

    /// Light-space NDC of a world point: `x`/`y` in `[-1, 1]`, depth in
    /// `[0, 1]` inside the frustum.
    pub fn project(&self, p: Vec3) -> Vec3 {
        let ndc = self.view_proj.project_point3(dvec(p));
        Vec3::new(ndc.x, ndc.y, ndc.z)
    }

    /// Column-major matrix, ready for a uniform buffer.
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.view_proj.as_mat4().to_cols_array_2d()
    }
}

fn dvec(v: Vec3) -> DVec3 {
    DVec3::new(v.x, v.y, v.z)
}

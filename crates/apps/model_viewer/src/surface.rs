use foundation::math::Vec3;
use gpu::camera::OrthographicCamera;

use crate::config::ProjectionConfig;

/// CSS size of the drawing surface plus the pixel ratio of its backing store.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl SurfaceSize {
    /// Degenerate sizes are clamped to one pixel so the aspect stays finite.
    pub fn new(width: f64, height: f64, pixel_ratio: f64) -> Self {
        let px = |v: f64| if v.is_finite() { v.round().max(1.0) as u32 } else { 1 };
        Self {
            width: px(width),
            height: px(height),
            pixel_ratio: if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
                pixel_ratio
            } else {
                1.0
            },
        }
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn backing_width(&self) -> u32 {
        ((self.width as f64 * self.pixel_ratio).round() as u32).max(1)
    }

    pub fn backing_height(&self) -> u32 {
        ((self.height as f64 * self.pixel_ratio).round() as u32).max(1)
    }
}

/// Vertical half extent of the orthographic frustum for a surface `height`
/// CSS pixels tall.
pub fn half_extent(height: u32, config: &ProjectionConfig) -> f64 {
    height as f64 * config.half_extent_per_px + config.half_extent_base
}

pub fn create_camera(width: u32, height: u32, config: &ProjectionConfig) -> (OrthographicCamera, f64) {
    let size = SurfaceSize::new(width as f64, height as f64, 1.0);
    let half = half_extent(size.height, config);
    let mut camera =
        OrthographicCamera::symmetric(half * size.aspect(), half, config.near, config.far);
    camera.look_at(
        Vec3::new(0.0, 0.0, config.camera_radius),
        Vec3::from(config.look_at),
    );
    (camera, half)
}

/// Point on the orbit sphere around the origin. `elevation` is measured up
/// from the XZ plane; `angle` turns around +Y starting at +Z.
pub fn orbit_position(angle: f64, elevation: f64, radius: f64) -> Vec3 {
    let flat = radius * elevation.cos();
    Vec3::new(flat * angle.sin(), radius * elevation.sin(), flat * angle.cos())
}

/// Owns the camera and the display-surface geometry.
#[derive(Debug, Clone)]
pub struct SurfaceManager {
    config: ProjectionConfig,
    camera: OrthographicCamera,
    half_extent: f64,
    size: SurfaceSize,
    revealed: bool,
}

impl SurfaceManager {
    pub fn new(size: SurfaceSize, config: ProjectionConfig) -> Self {
        let (camera, half_extent) = create_camera(size.width, size.height, &config);
        Self {
            config,
            camera,
            half_extent,
            size,
            revealed: false,
        }
    }

    pub fn camera(&self) -> &OrthographicCamera {
        &self.camera
    }

    pub fn half_extent(&self) -> f64 {
        self.half_extent
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Reproject for a new surface size.
    pub fn on_resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.half_extent = half_extent(size.height, &self.config);
        self.camera
            .set_extents(self.half_extent * size.aspect(), self.half_extent);
    }

    pub fn update_camera_position(&mut self, angle: f64, elevation: f64) {
        let position = orbit_position(angle, elevation, self.config.camera_radius);
        self.camera
            .look_at(position, Vec3::from(self.config.look_at));
    }

    /// Returns `true` only on the first call.
    pub fn reveal(&mut self) -> bool {
        !std::mem::replace(&mut self.revealed, true)
    }
}

#[cfg(test)]
mod tests {
    use super::{SurfaceManager, SurfaceSize, create_camera, orbit_position};
    use crate::config::ProjectionConfig;
    use foundation::math::Vec3;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn camera_extents_follow_height_and_aspect() {
        let config = ProjectionConfig::default();
        let (camera, half) = create_camera(400, 300, &config);
        assert!(close(half, 300.0 * 0.004 + 1.6));
        assert!(close(camera.height(), 2.0 * half));
        assert!(close(camera.width(), 2.0 * half * (400.0 / 300.0)));
        assert_eq!(camera.target, Vec3::new(0.0, -0.4, 0.0));
    }

    #[test]
    fn resize_reprojects() {
        let mut surface =
            SurfaceManager::new(SurfaceSize::new(400.0, 300.0, 1.0), ProjectionConfig::default());
        for (w, h) in [(1280.0, 720.0), (320.0, 640.0), (1.0, 1.0)] {
            surface.on_resize(SurfaceSize::new(w, h, 2.0));
            let half = surface.half_extent();
            let camera = surface.camera();
            assert!(close(camera.right - camera.left, 2.0 * half * (w / h)));
            assert!(close(camera.top - camera.bottom, 2.0 * half));
        }
    }

    #[test]
    fn degenerate_sizes_clamp_to_one_pixel() {
        let size = SurfaceSize::new(0.0, 0.0, 2.0);
        assert_eq!((size.width, size.height), (1, 1));
        assert_eq!(size.aspect(), 1.0);
        assert_eq!((size.backing_width(), size.backing_height()), (2, 2));

        let mut surface = SurfaceManager::new(size, ProjectionConfig::default());
        surface.on_resize(SurfaceSize::new(800.0, 0.0, 1.0));
        assert!(surface.camera().width().is_finite());
    }

    #[test]
    fn backing_size_applies_pixel_ratio() {
        let size = SurfaceSize::new(401.0, 300.0, 1.5);
        assert_eq!(size.backing_width(), 602);
        assert_eq!(size.backing_height(), 450);
    }

    #[test]
    fn camera_rides_the_orbit_sphere() {
        let config = ProjectionConfig::default();
        let mut surface = SurfaceManager::new(SurfaceSize::new(400.0, 300.0, 1.0), config);
        surface.update_camera_position(0.7, 0.45);
        let camera = surface.camera();
        assert!(close(camera.position.length(), 20.0));
        assert!(close(camera.position.y, 20.0 * 0.45_f64.sin()));
        assert_eq!(camera.target, Vec3::new(0.0, -0.4, 0.0));

        let p = orbit_position(0.0, 0.0, 5.0);
        assert!(close(p.x, 0.0) && close(p.y, 0.0) && close(p.z, 5.0));
    }

    #[test]
    fn reveal_happens_once() {
        let mut surface =
            SurfaceManager::new(SurfaceSize::new(400.0, 300.0, 1.0), ProjectionConfig::default());
        assert!(!surface.is_revealed());
        assert!(surface.reveal());
        assert!(!surface.reveal());
        assert!(surface.is_revealed());
    }
}

use foundation::math::Vec3;

/// Light sources understood by the renderer.
///
/// Positional data comes from the owning node's world transform; directional
/// lights shine from their node position toward the origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    Directional {
        color: [f32; 3],
        intensity: f32,
        casts_shadow: bool,
    },
    Hemisphere {
        sky: [f32; 3],
        ground: [f32; 3],
        intensity: f32,
    },
    Point {
        color: [f32; 3],
        intensity: f32,
        /// Distance at which the contribution reaches zero; `0` means unbounded.
        range: f32,
    },
}

/// Direction a directional light placed at `position` shines in.
pub fn directional_light_dir(position: Vec3) -> Vec3 {
    (-position).normalize_or_zero()
}

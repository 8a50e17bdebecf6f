use scene::World;
use scene::components::{Light, directional_light_dir};

/// Flattened light set for a single-pass forward shader.
///
/// Ambient contributions are summed; the first directional, hemisphere and
/// point light found are used, the rest ignored.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneLighting {
    pub ambient: [f32; 3],
    /// Direction the sun shines in (unit length, world space).
    pub sun_dir: [f32; 3],
    pub sun_color: [f32; 3],
    pub sun_casts_shadow: bool,
    pub sky_color: [f32; 3],
    pub ground_color: [f32; 3],
    pub point_position: [f32; 3],
    pub point_color: [f32; 3],
    pub point_range: f32,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            ambient: [0.0; 3],
            sun_dir: [0.0, -1.0, 0.0],
            sun_color: [0.0; 3],
            sun_casts_shadow: false,
            sky_color: [0.0; 3],
            ground_color: [0.0; 3],
            point_position: [0.0; 3],
            point_color: [0.0; 3],
            point_range: 0.0,
        }
    }
}

fn scaled(color: [f32; 3], intensity: f32) -> [f32; 3] {
    color.map(|c| c * intensity)
}

impl SceneLighting {
    pub fn from_world(world: &World) -> Self {
        let mut out = Self::default();
        let mut have_sun = false;
        let mut have_hemisphere = false;
        let mut have_point = false;

        for (_, transform, light) in world.lights() {
            match light {
                Light::Ambient { color, intensity } => {
                    let c = scaled(color, intensity);
                    for (acc, c) in out.ambient.iter_mut().zip(c) {
                        *acc += c;
                    }
                }
                Light::Directional {
                    color,
                    intensity,
                    casts_shadow,
                } if !have_sun => {
                    have_sun = true;
                    out.sun_dir = directional_light_dir(transform.position).to_f32();
                    out.sun_color = scaled(color, intensity);
                    out.sun_casts_shadow = casts_shadow;
                }
                Light::Hemisphere {
                    sky,
                    ground,
                    intensity,
                } if !have_hemisphere => {
                    have_hemisphere = true;
                    out.sky_color = scaled(sky, intensity);
                    out.ground_color = scaled(ground, intensity);
                }
                Light::Point {
                    color,
                    intensity,
                    range,
                } if !have_point => {
                    have_point = true;
                    out.point_position = transform.position.to_f32();
                    out.point_color = scaled(color, intensity);
                    // Range follows the node's scale so the glow stays proportional.
                    out.point_range = range * transform.scale as f32;
                }
                _ => {}
            }
        }
        out
    }
}

/// How a surface is shaded.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MaterialKind {
    /// Lit by the scene lights.
    Standard,
    /// Drawn at full emissive color, ignoring lights.
    Emissive,
    /// Invisible except where it darkens: a translucent ground for the
    /// subject's shadow.
    ShadowCatcher { opacity: f32 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    /// Linear RGBA.
    pub base_color: [f32; 4],
    /// Linear RGB added on top of lighting.
    pub emissive: [f32; 3],
}

impl Material {
    pub fn standard(base_color: [f32; 4]) -> Self {
        Self {
            kind: MaterialKind::Standard,
            base_color,
            emissive: [0.0, 0.0, 0.0],
        }
    }

    pub fn emissive(color: [f32; 3]) -> Self {
        Self {
            kind: MaterialKind::Emissive,
            base_color: [color[0], color[1], color[2], 1.0],
            emissive: color,
        }
    }

    pub fn shadow_catcher(opacity: f32) -> Self {
        Self {
            kind: MaterialKind::ShadowCatcher {
                opacity: opacity.clamp(0.0, 1.0),
            },
            base_color: [0.0, 0.0, 0.0, opacity.clamp(0.0, 1.0)],
            emissive: [0.0, 0.0, 0.0],
        }
    }

    pub fn is_translucent(&self) -> bool {
        self.base_color[3] < 1.0 || matches!(self.kind, MaterialKind::ShadowCatcher { .. })
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::standard([0.8, 0.8, 0.8, 1.0])
    }
}

/// `0xRRGGBB` to linear RGB.
pub fn rgb_hex(hex: u32) -> [f32; 3] {
    let srgb = [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ];
    srgb.map(srgb_to_linear)
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::{Material, MaterialKind, rgb_hex};

    #[test]
    fn shadow_catcher_clamps_opacity() {
        let m = Material::shadow_catcher(3.0);
        assert_eq!(m.kind, MaterialKind::ShadowCatcher { opacity: 1.0 });
        assert!(m.is_translucent());
    }

    #[test]
    fn hex_colors_convert_to_linear() {
        assert_eq!(rgb_hex(0xffffff), [1.0, 1.0, 1.0]);
        assert_eq!(rgb_hex(0x000000), [0.0, 0.0, 0.0]);
        let mid = rgb_hex(0x808080)[0];
        assert!(mid > 0.2 && mid < 0.25);
    }
}

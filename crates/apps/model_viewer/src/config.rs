use std::f64::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid viewer config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid viewer config: `{field}` {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Orthographic framing and the orbit sphere the camera rides on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionConfig {
    /// World units of vertical half extent added per CSS pixel of height.
    pub half_extent_per_px: f64,
    pub half_extent_base: f64,
    pub camera_radius: f64,
    pub near: f64,
    pub far: f64,
    pub look_at: [f64; 3],
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            half_extent_per_px: 0.004,
            half_extent_base: 1.6,
            camera_radius: 20.0,
            near: 0.1,
            far: 100.0,
            look_at: [0.0, -0.4, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrbitConfig {
    pub initial_angle: f64,
    pub initial_elevation: f64,
    pub min_elevation: f64,
    pub max_elevation: f64,
    /// Radians of yaw per pixel of horizontal drag.
    pub yaw_sensitivity: f64,
    /// Radians of pitch per pixel of vertical drag.
    pub pitch_sensitivity: f64,
    /// Fraction of the remaining distance still left after one second.
    pub smoothing_base: f64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            initial_angle: FRAC_PI_4,
            initial_elevation: 0.45,
            min_elevation: 0.05,
            max_elevation: 1.2,
            yaw_sensitivity: 0.008,
            pitch_sensitivity: 0.005,
            smoothing_base: 1e-5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpinInConfig {
    pub duration_ms: f64,
    /// rad/s at the start of the intro.
    pub start_speed: f64,
    /// rad/s at the end of the intro, and the steady auto-rotation speed.
    pub end_speed: f64,
}

impl Default for SpinInConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2200.0,
            start_speed: 6.0,
            end_speed: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetConfig {
    pub url: String,
    /// Largest model dimension after normalization, before the device factor.
    pub target_diagonal: f64,
    /// Glow marker position relative to the model center, in normalized units.
    pub glow_offset: [f64; 3],
    pub glow_color: [f32; 3],
    pub glow_intensity: f32,
    pub glow_range: f32,
    pub glow_marker_radius: f32,
    pub ground_radius: f32,
    pub ground_opacity: f32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            url: "/models/model.glb".to_string(),
            target_diagonal: 4.0,
            glow_offset: [0.0, 0.35, 0.0],
            glow_color: [1.0, 0.72, 0.35],
            glow_intensity: 1.2,
            glow_range: 2.5,
            glow_marker_radius: 0.04,
            ground_radius: 3.0,
            ground_opacity: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    pub max_pixel_ratio: f64,
    pub mobile_max_pixel_ratio: f64,
    /// Viewports narrower than this many CSS pixels count as mobile.
    pub mobile_breakpoint_px: f64,
    pub desktop_model_scale: f64,
    pub mobile_model_scale: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
            mobile_max_pixel_ratio: 1.5,
            mobile_breakpoint_px: 768.0,
            desktop_model_scale: 1.0,
            mobile_model_scale: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    pub max_frame_delta_s: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_delta_s: 0.1,
        }
    }
}

/// Every tunable of the viewer. Missing fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub projection: ProjectionConfig,
    pub orbit: OrbitConfig,
    pub spin_in: SpinInConfig,
    pub asset: AssetConfig,
    pub device: DeviceConfig,
    pub frame: FrameConfig,
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be a positive number",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must not be negative",
        })
    }
}

fn finite(field: &'static str, values: &[f64]) -> Result<(), ConfigError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be a finite number",
        })
    }
}

fn fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must lie between 0 and 1",
        })
    }
}

impl ViewerConfig {
    /// Parse a (possibly partial) JSON object and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.projection;
        positive("projection.camera_radius", p.camera_radius)?;
        positive("projection.near", p.near)?;
        positive("projection.far", p.far)?;
        if p.far <= p.near {
            return Err(ConfigError::Invalid {
                field: "projection.far",
                reason: "must be greater than projection.near",
            });
        }
        non_negative("projection.half_extent_per_px", p.half_extent_per_px)?;
        positive("projection.half_extent_base", p.half_extent_base)?;
        finite("projection.look_at", &p.look_at)?;

        let o = &self.orbit;
        finite(
            "orbit.initial_angle",
            &[o.initial_angle, o.initial_elevation],
        )?;
        finite("orbit.min_elevation", &[o.min_elevation, o.max_elevation])?;
        if !(o.min_elevation <= o.max_elevation) {
            return Err(ConfigError::Invalid {
                field: "orbit.min_elevation",
                reason: "must not exceed orbit.max_elevation",
            });
        }
        if !(o.smoothing_base > 0.0 && o.smoothing_base < 1.0) {
            return Err(ConfigError::Invalid {
                field: "orbit.smoothing_base",
                reason: "must lie strictly between 0 and 1",
            });
        }

        positive("orbit.yaw_sensitivity", o.yaw_sensitivity)?;
        positive("orbit.pitch_sensitivity", o.pitch_sensitivity)?;

        positive("spin_in.duration_ms", self.spin_in.duration_ms)?;
        non_negative("spin_in.start_speed", self.spin_in.start_speed)?;
        non_negative("spin_in.end_speed", self.spin_in.end_speed)?;

        let a = &self.asset;
        positive("asset.target_diagonal", a.target_diagonal)?;
        if a.url.is_empty() {
            return Err(ConfigError::Invalid {
                field: "asset.url",
                reason: "must not be empty",
            });
        }
        finite("asset.glow_offset", &a.glow_offset)?;
        for c in a.glow_color {
            non_negative("asset.glow_color", c as f64)?;
        }
        non_negative("asset.glow_intensity", a.glow_intensity as f64)?;
        // Zero range means the glow light is unbounded.
        non_negative("asset.glow_range", a.glow_range as f64)?;
        positive("asset.glow_marker_radius", a.glow_marker_radius as f64)?;
        positive("asset.ground_radius", a.ground_radius as f64)?;
        fraction("asset.ground_opacity", a.ground_opacity as f64)?;

        let d = &self.device;
        positive("device.max_pixel_ratio", d.max_pixel_ratio)?;
        positive("device.mobile_max_pixel_ratio", d.mobile_max_pixel_ratio)?;
        non_negative("device.mobile_breakpoint_px", d.mobile_breakpoint_px)?;
        positive("device.desktop_model_scale", d.desktop_model_scale)?;
        positive("device.mobile_model_scale", d.mobile_model_scale)?;

        positive("frame.max_frame_delta_s", self.frame.max_frame_delta_s)?;
        Ok(())
    }
}

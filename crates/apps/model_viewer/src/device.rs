use crate::config::DeviceConfig;

/// What the host tells us about the display the viewer runs on.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DeviceProfile {
    pub device_pixel_ratio: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Primary pointer is a finger rather than a mouse.
    pub coarse_pointer: bool,
}

impl DeviceProfile {
    pub fn desktop(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            device_pixel_ratio: 1.0,
            viewport_width,
            viewport_height,
            coarse_pointer: false,
        }
    }

    pub fn is_mobile(&self, config: &DeviceConfig) -> bool {
        self.coarse_pointer || self.viewport_width < config.mobile_breakpoint_px
    }

    /// Device pixel ratio capped for the device class. Bogus host values fall
    /// back to 1.
    pub fn pixel_ratio(&self, config: &DeviceConfig) -> f64 {
        let cap = if self.is_mobile(config) {
            config.mobile_max_pixel_ratio
        } else {
            config.max_pixel_ratio
        };
        let dpr = if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        };
        dpr.min(cap)
    }

    /// Multiplier applied on top of the model's normalization scale.
    pub fn model_scale(&self, config: &DeviceConfig) -> f64 {
        if self.is_mobile(config) {
            config.mobile_model_scale
        } else {
            config.desktop_model_scale
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_window(window: &web_sys::Window) -> Self {
        let read = |v: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| {
            v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        let coarse_pointer = window
            .match_media("(pointer: coarse)")
            .ok()
            .flatten()
            .is_some_and(|query| query.matches());
        Self {
            device_pixel_ratio: window.device_pixel_ratio(),
            viewport_width: read(window.inner_width()),
            viewport_height: read(window.inner_height()),
            coarse_pointer,
        }
    }
}

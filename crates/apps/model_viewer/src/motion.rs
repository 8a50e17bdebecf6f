use foundation::math::{clamp, damp_factor, ease_out_cubic, lerp};

use crate::config::{OrbitConfig, SpinInConfig};

/// Orbit angles in radians. Targets are written by input and auto-rotation;
/// the current values chase them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitState {
    pub current_angle: f64,
    pub target_angle: f64,
    pub current_elevation: f64,
    pub target_elevation: f64,
}

impl OrbitState {
    pub fn new(config: &OrbitConfig) -> Self {
        let elevation = clamp(
            config.initial_elevation,
            config.min_elevation,
            config.max_elevation,
        );
        Self {
            current_angle: config.initial_angle,
            target_angle: config.initial_angle,
            current_elevation: elevation,
            target_elevation: elevation,
        }
    }

    /// Move the current values `factor` of the way toward their targets.
    pub fn smooth(&mut self, factor: f64) {
        self.current_angle += (self.target_angle - self.current_angle) * factor;
        self.current_elevation += (self.target_elevation - self.current_elevation) * factor;
    }
}

/// Eased intro speed: `start` at `t = 0`, `end` at `t = 1`.
pub fn spin_in_speed(t: f64, start: f64, end: f64) -> f64 {
    lerp(start, end, ease_out_cubic(t))
}

/// One-shot fast spin that decays into the steady auto-rotation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpinIn {
    start_ms: Option<f64>,
    finished: bool,
    duration_ms: f64,
    start_speed: f64,
    end_speed: f64,
}

impl SpinIn {
    pub fn new(config: &SpinInConfig) -> Self {
        Self {
            start_ms: None,
            finished: false,
            duration_ms: config.duration_ms,
            start_speed: config.start_speed,
            end_speed: config.end_speed,
        }
    }

    /// Start the intro at `now_ms`. Only the first call has any effect.
    pub fn arm(&mut self, now_ms: f64) -> bool {
        if self.start_ms.is_some() || self.finished {
            return false;
        }
        self.start_ms = Some(now_ms);
        true
    }

    pub fn is_active(&self) -> bool {
        self.start_ms.is_some() && !self.finished
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn steady_speed(&self) -> f64 {
        self.end_speed
    }

    /// Angular speed at `now_ms` in rad/s. Ends the intro once its duration
    /// has elapsed.
    pub fn speed(&mut self, now_ms: f64) -> f64 {
        let Some(start_ms) = self.start_ms.filter(|_| !self.finished) else {
            return self.end_speed;
        };
        let t = clamp((now_ms - start_ms) / self.duration_ms, 0.0, 1.0);
        if t >= 1.0 {
            self.finished = true;
            log::debug!("spin-in finished");
            return self.end_speed;
        }
        spin_in_speed(t, self.start_speed, self.end_speed)
    }
}

/// Merges the intro, auto-rotation and user targets into the per-frame orbit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MotionBlender {
    pub orbit: OrbitState,
    pub spin_in: SpinIn,
    smoothing_base: f64,
}

impl MotionBlender {
    pub fn new(orbit: &OrbitConfig, spin_in: &SpinInConfig) -> Self {
        Self {
            orbit: OrbitState::new(orbit),
            spin_in: SpinIn::new(spin_in),
            smoothing_base: orbit.smoothing_base,
        }
    }

    pub fn step(&mut self, now_ms: f64, dt_s: f64, dragging: bool) {
        let speed = self.spin_in.speed(now_ms);
        if !dragging {
            self.orbit.target_angle += speed * dt_s;
        }
        self.orbit.smooth(damp_factor(self.smoothing_base, dt_s));
    }
}

//! Scalar helpers shared by animation and camera code.

/// Clamp that tolerates an inverted range by preferring `lo`.
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.min(hi).max(lo)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Ease-out cubic: `1 - (1 - t)^3`, with `t` clamped to `[0, 1]`.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = clamp(t, 0.0, 1.0);
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Fraction of the remaining distance to cover in `dt_s` seconds so that
/// `base` of it is left after one second, independent of the frame rate.
pub fn damp_factor(base: f64, dt_s: f64) -> f64 {
    1.0 - base.powf(dt_s.max(0.0))
}

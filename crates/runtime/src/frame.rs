/// Nominal delta used for the very first frame, before any timestamp is known.
pub const NOMINAL_FRAME_DT_S: f64 = 1.0 / 60.0;

/// Per-frame timing metadata.
///
/// Produced by [`FrameClock`] from the host's display-refresh timestamps. The
/// host decides when frames happen; this only turns timestamps into deltas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame.
    pub dt_s: f64,
    /// Host timestamp of this frame (milliseconds).
    pub timestamp_ms: f64,
}

/// Turns a stream of millisecond timestamps into frame deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameClock {
    last_timestamp_ms: Option<f64>,
    next_index: u64,
    max_dt_s: f64,
}

impl FrameClock {
    pub fn new(max_dt_s: f64) -> Self {
        Self {
            last_timestamp_ms: None,
            next_index: 0,
            max_dt_s: max_dt_s.max(NOMINAL_FRAME_DT_S),
        }
    }

    /// Advance to the frame at `timestamp_ms`.
    ///
    /// The first frame assumes [`NOMINAL_FRAME_DT_S`]. Later deltas are
    /// clamped to `[0, max_dt_s]`; timestamps going backwards yield zero.
    pub fn tick(&mut self, timestamp_ms: f64) -> Frame {
        let dt_s = match self.last_timestamp_ms {
            None => NOMINAL_FRAME_DT_S,
            Some(last) => ((timestamp_ms - last) / 1000.0).clamp(0.0, self.max_dt_s),
        };
        self.last_timestamp_ms = Some(timestamp_ms);

        let frame = Frame {
            index: self.next_index,
            dt_s,
            timestamp_ms,
        };
        self.next_index = self.next_index.wrapping_add(1);
        frame
    }

    pub fn last_timestamp_ms(&self) -> Option<f64> {
        self.last_timestamp_ms
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(0.1)
    }
}

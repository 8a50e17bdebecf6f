use crate::frame::{Frame, FrameClock};

/// A scheduled-but-not-yet-fired frame callback.
///
/// Implementations cancel the host's pending callback; cancelling a handle
/// whose callback already fired must be harmless.
pub trait FrameHandle {
    fn cancel(self);
}

impl FrameHandle for () {
    fn cancel(self) {}
}

/// Lifecycle of a self-rescheduling frame loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Running,
    /// Terminal.
    Disposed,
}

/// Frame loop state machine: `Idle -> Running -> Disposed`.
///
/// Holds at most one pending frame handle so disposal can cancel the chain
/// deterministically.
#[derive(Debug)]
pub struct FrameLoop<H: FrameHandle> {
    phase: LoopPhase,
    clock: FrameClock,
    pending: Option<H>,
}

impl<H: FrameHandle> FrameLoop<H> {
    pub fn new(clock: FrameClock) -> Self {
        Self {
            phase: LoopPhase::Idle,
            clock,
            pending: None,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == LoopPhase::Running
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// `Idle -> Running`. Any other phase is left unchanged.
    pub fn start(&mut self) -> bool {
        if self.phase != LoopPhase::Idle {
            return false;
        }
        self.phase = LoopPhase::Running;
        true
    }

    /// Store the handle of the next scheduled frame.
    ///
    /// Outside `Running` the handle is cancelled immediately, so a callback
    /// scheduled by a frame that raced with disposal never fires.
    pub fn set_pending(&mut self, handle: H) -> bool {
        if self.phase != LoopPhase::Running {
            handle.cancel();
            return false;
        }
        if let Some(previous) = self.pending.replace(handle) {
            previous.cancel();
        }
        true
    }

    /// Enter a frame. Returns `None` unless the loop is running.
    ///
    /// The pending handle is the one that just fired, so it is released here.
    pub fn begin_frame(&mut self, timestamp_ms: f64) -> Option<Frame> {
        if self.phase != LoopPhase::Running {
            return None;
        }
        drop(self.pending.take());
        Some(self.clock.tick(timestamp_ms))
    }

    /// Move to `Disposed`, cancelling any pending frame. Idempotent.
    pub fn dispose(&mut self) -> bool {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
        if self.phase == LoopPhase::Disposed {
            return false;
        }
        log::debug!("frame loop disposed from {:?}", self.phase);
        self.phase = LoopPhase::Disposed;
        true
    }
}

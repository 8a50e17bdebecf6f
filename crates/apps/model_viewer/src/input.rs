use foundation::math::clamp;

use crate::config::OrbitConfig;
use crate::motion::OrbitState;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct DragState {
    pub is_dragging: bool,
    pub last_pointer_x: f64,
    pub last_pointer_y: f64,
}

/// Turns pointer and single-finger drags into orbit target deltas.
///
/// Only the drag state and the orbit targets are touched; the camera follows
/// on the next frame.
#[derive(Debug, Clone)]
pub struct InputController {
    drag: DragState,
    yaw_sensitivity: f64,
    pitch_sensitivity: f64,
    min_elevation: f64,
    max_elevation: f64,
}

impl InputController {
    pub fn new(config: &OrbitConfig) -> Self {
        Self {
            drag: DragState::default(),
            yaw_sensitivity: config.yaw_sensitivity,
            pitch_sensitivity: config.pitch_sensitivity,
            min_elevation: config.min_elevation,
            max_elevation: config.max_elevation,
        }
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.drag = DragState {
            is_dragging: true,
            last_pointer_x: x,
            last_pointer_y: y,
        };
    }

    /// Apply the drag delta since the last position. Returns `false` when no
    /// drag is in progress.
    pub fn pointer_move(&mut self, x: f64, y: f64, orbit: &mut OrbitState) -> bool {
        if !self.drag.is_dragging {
            return false;
        }
        let dx = x - self.drag.last_pointer_x;
        let dy = y - self.drag.last_pointer_y;

        // Dragging right turns the model right, as if grabbing it.
        orbit.target_angle -= dx * self.yaw_sensitivity;
        orbit.target_elevation = clamp(
            orbit.target_elevation + dy * self.pitch_sensitivity,
            self.min_elevation,
            self.max_elevation,
        );

        self.drag.last_pointer_x = x;
        self.drag.last_pointer_y = y;
        true
    }

    pub fn pointer_up(&mut self) {
        self.drag = DragState::default();
    }

    /// Touches are `(client_x, client_y)` pairs; anything but exactly one
    /// touch is ignored.
    pub fn touch_start(&mut self, touches: &[(f64, f64)]) {
        if let [(x, y)] = touches {
            self.pointer_down(*x, *y);
        }
    }

    /// Returns `true` when the host must suppress the default scroll.
    pub fn touch_move(&mut self, touches: &[(f64, f64)], orbit: &mut OrbitState) -> bool {
        match touches {
            [(x, y)] => self.pointer_move(*x, *y, orbit),
            _ => false,
        }
    }

    pub fn touch_end(&mut self) {
        self.pointer_up();
    }
}

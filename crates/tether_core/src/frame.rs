//! Per-frame records exchanged with the host
//!
//! Everything here is `#[repr(C)]` and `Copy`: the host hands us a pointer,
//! we copy the whole record into [`SharedFrame`] and never keep the pointer.

use glam::{Mat4, Quat, Vec3};
use std::cell::Cell;
use std::rc::Rc;

/// Number of eyes the host renders
pub const EYE_COUNT: usize = 2;

/// Number of tracked controllers
pub const CONTROLLER_COUNT: usize = 2;

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Eye selector for draw calls
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

impl TryFrom<i32> for Eye {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Eye::Left),
            1 => Ok(Eye::Right),
            other => Err(other),
        }
    }
}

/// Position plus orientation quaternion (x, y, z, w)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pose {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

impl Pose {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_array(self.orientation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Controller state as reported by the headset runtime
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ControllerState {
    pub pose: Pose,
    /// Bitmask of pressed buttons
    pub buttons: u32,
    /// Bitmask of touched buttons
    pub touches: u32,
    pub trigger: f32,
    pub grip: f32,
    pub trackpad: [f32; 2],
    /// Non-zero when the controller is tracked
    pub connected: u32,
}

impl ControllerState {
    pub fn is_connected(&self) -> bool {
        self.connected != 0
    }
}

/// Per-frame input snapshot supplied on every update tick
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameUpdateData {
    /// Predicted display time in seconds
    pub display_time: f64,
    pub head_pose: Pose,
    /// Column-major view matrix per eye
    pub eye_view_matrix: [[f32; 16]; EYE_COUNT],
    /// Column-major projection matrix per eye
    pub projection_matrix: [[f32; 16]; EYE_COUNT],
    pub controllers: [ControllerState; CONTROLLER_COUNT],
}

impl FrameUpdateData {
    pub fn view_matrix(&self, eye: Eye) -> Mat4 {
        Mat4::from_cols_array(&self.eye_view_matrix[eye.index()])
    }

    pub fn projection(&self, eye: Eye) -> Mat4 {
        Mat4::from_cols_array(&self.projection_matrix[eye.index()])
    }
}

impl Default for FrameUpdateData {
    fn default() -> Self {
        Self {
            display_time: 0.0,
            head_pose: Pose::default(),
            eye_view_matrix: [IDENTITY; EYE_COUNT],
            projection_matrix: [IDENTITY; EYE_COUNT],
            controllers: [ControllerState::default(); CONTROLLER_COUNT],
        }
    }
}

/// Draw request supplied on every draw tick
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameDrawData {
    /// Host render target handle
    pub framebuffer: u32,
    pub eye: i32,
}

/// Suggested per-eye texture size, captured once at init
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DisplayDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayDimensions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

/// Everything the native renderer needs to draw one eye
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeDrawRequest {
    pub framebuffer: u32,
    pub eye: Eye,
    pub dimensions: DisplayDimensions,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Native per-eye render callback
pub trait EyeRenderer {
    fn draw_eye(&mut self, request: &EyeDrawRequest);
}

impl<F> EyeRenderer for F
where
    F: FnMut(&EyeDrawRequest),
{
    fn draw_eye(&mut self, request: &EyeDrawRequest) {
        self(request)
    }
}

/// The process-wide "current frame" record.
///
/// One writer (the update tick) and one reader (script code running inside
/// that tick), never overlapping, so a `Cell` is enough.
#[derive(Debug, Clone, Default)]
pub struct SharedFrame(Rc<Cell<FrameUpdateData>>);

impl SharedFrame {
    pub fn new(initial: FrameUpdateData) -> Self {
        Self(Rc::new(Cell::new(initial)))
    }

    pub fn store(&self, data: FrameUpdateData) {
        self.0.set(data);
    }

    pub fn load(&self) -> FrameUpdateData {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_from_index() {
        assert_eq!(Eye::try_from(0), Ok(Eye::Left));
        assert_eq!(Eye::try_from(1), Ok(Eye::Right));
        assert_eq!(Eye::try_from(2), Err(2));
        assert_eq!(Eye::try_from(-1), Err(-1));
    }

    #[test]
    fn shared_frame_is_overwritten_wholesale() {
        let frame = SharedFrame::default();
        let reader = frame.clone();

        let mut data = FrameUpdateData::default();
        data.display_time = 4.5;
        data.controllers[1].buttons = 0b101;
        frame.store(data);

        assert_eq!(reader.load(), data);

        frame.store(FrameUpdateData::default());
        assert_eq!(reader.load().display_time, 0.0);
        assert_eq!(reader.load().controllers[1].buttons, 0);
    }

    #[test]
    fn matrices_are_column_major() {
        let mut data = FrameUpdateData::default();
        let view = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        data.eye_view_matrix[1] = view.to_cols_array();

        assert_eq!(data.view_matrix(Eye::Right), view);
        assert_eq!(data.view_matrix(Eye::Left), Mat4::IDENTITY);
        assert_eq!(data.projection(Eye::Left), Mat4::IDENTITY);
    }
}

//! Per-frame driver
//!
//! Copies each update's input into the shared frame record and resumes the
//! application task. A task that stops yielding halts the bridge for good.

use crate::task::{CooperativeTask, Resume};
use crate::FrameError;
use tether_core::frame::{
    DisplayDimensions, Eye, EyeDrawRequest, EyeRenderer, FrameDrawData, FrameUpdateData,
    SharedFrame,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BridgeState {
    /// Entry task not started yet
    Bootstrapped,
    Running,
    /// The task completed or failed; no further resumes
    Halted,
}

pub struct FrameBridge<T: CooperativeTask> {
    task: T,
    state: BridgeState,
    frame: SharedFrame,
    display: DisplayDimensions,
    renderer: Box<dyn EyeRenderer>,
    frames: u64,
}

impl<T: CooperativeTask> FrameBridge<T> {
    pub fn new(
        task: T,
        frame: SharedFrame,
        display: DisplayDimensions,
        renderer: Box<dyn EyeRenderer>,
    ) -> Self {
        Self {
            task,
            state: BridgeState::Bootstrapped,
            frame,
            display,
            renderer,
            frames: 0,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Update ticks the task has yielded back from
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    /// Run one update tick.
    ///
    /// The first tick starts the entry task. Any tick where the task does not
    /// yield returns its error once; later ticks return [`FrameError::Halted`].
    pub fn update(&mut self, data: &FrameUpdateData) -> Result<(), FrameError> {
        if self.state == BridgeState::Halted {
            return Err(FrameError::Halted);
        }

        self.frame.store(*data);

        if self.state == BridgeState::Bootstrapped {
            self.state = BridgeState::Running;
            if let Err(err) = self.task.start() {
                return Err(self.halt(FrameError::Failed {
                    message: err.to_string(),
                }));
            }
        }

        match self.task.resume() {
            Resume::Yielded => {
                self.frames += 1;
                Ok(())
            }
            Resume::Completed => Err(self.halt(FrameError::Finished {
                frames: self.frames,
            })),
            Resume::Errored(message) => Err(self.halt(FrameError::Failed { message })),
        }
    }

    /// Forward the latest frame's matrices for `data.eye` to the renderer.
    pub fn draw(&mut self, data: &FrameDrawData) -> Result<(), FrameError> {
        let eye = Eye::try_from(data.eye).map_err(|eye| FrameError::InvalidEye { eye })?;
        let frame = self.frame.load();

        self.renderer.draw_eye(&EyeDrawRequest {
            framebuffer: data.framebuffer,
            eye,
            dimensions: self.display,
            view: frame.view_matrix(eye),
            projection: frame.projection(eye),
        });
        Ok(())
    }

    fn halt(&mut self, error: FrameError) -> FrameError {
        tracing::error!(frames = self.frames, %error, "Application task stopped");
        self.state = BridgeState::Halted;
        error
    }
}

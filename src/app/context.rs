//! Resources one perception cycle needs, bundled for the command loop.
//!
//! The session is either fully set up or permanently not ready.  A
//! not-ready session never exposes tensor storage and the loop never
//! touches the camera on its behalf.

use crate::error::{CycleError, SetupError};
use crate::sensors::camera::Camera;

use super::ports::{CameraPort, InferencePort};

/// Outcome of session setup.
pub enum SessionState<S> {
    Ready(S),
    NotReady(SetupError),
}

impl<S> SessionState<S> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Setup error that left the session unusable, if any.
    pub fn setup_error(&self) -> Option<SetupError> {
        match self {
            Self::Ready(_) => None,
            Self::NotReady(e) => Some(*e),
        }
    }

    pub fn session(&self) -> Result<&S, CycleError> {
        match self {
            Self::Ready(s) => Ok(s),
            Self::NotReady(_) => Err(CycleError::SessionNotReady),
        }
    }

    pub fn session_mut(&mut self) -> Result<&mut S, CycleError> {
        match self {
            Self::Ready(s) => Ok(s),
            Self::NotReady(_) => Err(CycleError::SessionNotReady),
        }
    }
}

/// Camera plus inference session.
pub struct PipelineContext<C: CameraPort, S: InferencePort> {
    pub camera: Camera<C>,
    pub session: SessionState<S>,
}

impl<C: CameraPort, S: InferencePort> PipelineContext<C, S> {
    pub fn new(camera: Camera<C>, session: SessionState<S>) -> Self {
        Self { camera, session }
    }
}

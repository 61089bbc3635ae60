//! Sensor subsystem.
//!
//! The board carries a single sensor, the DVP camera.  [`camera::Camera`]
//! wraps whatever [`CameraPort`](crate::app::ports::CameraPort) the
//! platform provides with the start-on-first-use lifecycle.

pub mod camera;

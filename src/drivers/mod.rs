//! Peripheral drivers.

pub mod camera;
pub mod watchdog;

//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the command loop for PetVision: decode a
//! control byte, run one capture → classify cycle, pick the report line.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod context;
pub mod events;
pub mod ports;
pub mod service;

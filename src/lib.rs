//! PetVision firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod link;
pub mod vision;

mod pins;

// Hardware-facing modules; host builds get their simulation backends.
pub mod adapters;
pub mod drivers;
pub mod sensors;
